//! Enums shared by the entity models and the execution tree
//!
//! All enums serialize as `SCREAMING_SNAKE_CASE` database constants, matching
//! the values the flow runner writes.

use serde::{Deserialize, Serialize};

/// Kind of flow stored in the chat flow table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowType {
    Chatflow,
    /// Agent flow (v2 canvas)
    Agentflow,
    /// Multi-agent flow (v1 agent canvas)
    Multiagent,
    Assistant,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::Chatflow => "CHATFLOW",
            FlowType::Agentflow => "AGENTFLOW",
            FlowType::Multiagent => "MULTIAGENT",
            FlowType::Assistant => "ASSISTANT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssistantType {
    Custom,
    Openai,
    Azure,
}

impl AssistantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistantType::Custom => "CUSTOM",
            AssistantType::Openai => "OPENAI",
            AssistantType::Azure => "AZURE",
        }
    }
}

/// Where a chat message was produced. Only `Internal` messages are listed in
/// the tenant's own chat history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatType {
    #[default]
    Internal,
    External,
}

/// Status of a node execution or of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Finished,
    Error,
    Timeout,
    Terminated,
    Stopped,
    Inprogress,
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionState::Finished => "FINISHED",
            ExecutionState::Error => "ERROR",
            ExecutionState::Timeout => "TIMEOUT",
            ExecutionState::Terminated => "TERMINATED",
            ExecutionState::Stopped => "STOPPED",
            ExecutionState::Inprogress => "INPROGRESS",
        };
        write!(f, "{}", s)
    }
}
