//! Stored agent flow run

use super::entity::{StoreTable, impl_entity};
use super::enums::ExecutionState;
use crate::execution::ExecutionEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One run of an agent flow. `execution_data` holds the serialized event log
/// consumed by the execution tree builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: String,
    #[serde(default)]
    pub execution_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ExecutionState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agentflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_entity!(Execution, StoreTable::Execution);

impl Execution {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            execution_data: "[]".to_string(),
            state: None,
            agentflow_id: None,
            session_id: None,
            user_id: None,
            organization_id: None,
            created_date: None,
            extra: Map::new(),
        }
    }

    /// Parse the stored event log.
    pub fn events(&self) -> Result<Vec<ExecutionEvent>, serde_json::Error> {
        if self.execution_data.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&self.execution_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_parse_stored_log() {
        let mut execution = Execution::new("e1");
        execution.execution_data = r#"[
            {"nodeId": "start_0", "nodeLabel": "Start", "previousNodeIds": [], "status": "FINISHED", "data": {}},
            {"nodeId": "llm_0", "nodeLabel": "LLM", "previousNodeIds": ["start_0"], "status": "ERROR", "data": {}}
        ]"#
        .to_string();

        let events = execution.events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].node_id.as_deref(), Some("llm_0"));
        assert_eq!(events[1].status, Some(ExecutionState::Error));
    }

    #[test]
    fn test_events_empty_data() {
        let mut execution = Execution::new("e1");
        execution.execution_data = String::new();
        assert!(execution.events().unwrap().is_empty());
    }
}
