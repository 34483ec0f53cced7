//! Export bundle: one array per entity category

use crate::database::config::DEFAULT_EXPORT_FILE_NAME;
use crate::models::{
    Assistant, Chat, ChatFlow, ChatMessage, ChatMessageFeedback, CustomTemplate, DocumentStore,
    DocumentStoreFileChunk, Execution, Tool, Variable,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rows per bundle category, keyed by the category's wire name
pub type BundleCounts = BTreeMap<String, usize>;

/// Entity rows grouped by category.
///
/// Serializes with PascalCase category keys. Missing categories deserialize
/// as empty, so partial bundles are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExportBundle {
    #[serde(default = "default_file_name")]
    pub file_default_name: String,
    #[serde(default)]
    pub agent_flow: Vec<ChatFlow>,
    #[serde(rename = "AgentFlowV2", default)]
    pub agent_flow_v2: Vec<ChatFlow>,
    #[serde(default)]
    pub assistant_custom: Vec<Assistant>,
    #[serde(rename = "AssistantOpenAI", default)]
    pub assistant_openai: Vec<Assistant>,
    #[serde(default)]
    pub assistant_azure: Vec<Assistant>,
    #[serde(default)]
    pub assistant_flow: Vec<ChatFlow>,
    #[serde(default)]
    pub chat_flow: Vec<ChatFlow>,
    #[serde(default)]
    pub chat: Vec<Chat>,
    #[serde(default)]
    pub chat_message: Vec<ChatMessage>,
    #[serde(default)]
    pub chat_message_feedback: Vec<ChatMessageFeedback>,
    #[serde(default)]
    pub custom_template: Vec<CustomTemplate>,
    #[serde(default)]
    pub document_store: Vec<DocumentStore>,
    #[serde(default)]
    pub document_store_file_chunk: Vec<DocumentStoreFileChunk>,
    #[serde(default)]
    pub execution: Vec<Execution>,
    #[serde(default)]
    pub tool: Vec<Tool>,
    #[serde(default)]
    pub variable: Vec<Variable>,
}

fn default_file_name() -> String {
    DEFAULT_EXPORT_FILE_NAME.to_string()
}

impl Default for ExportBundle {
    fn default() -> Self {
        Self::with_file_name(DEFAULT_EXPORT_FILE_NAME)
    }
}

impl ExportBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty bundle carrying a custom default file name
    pub fn with_file_name(file_name: impl Into<String>) -> Self {
        Self {
            file_default_name: file_name.into(),
            agent_flow: Vec::new(),
            agent_flow_v2: Vec::new(),
            assistant_custom: Vec::new(),
            assistant_openai: Vec::new(),
            assistant_azure: Vec::new(),
            assistant_flow: Vec::new(),
            chat_flow: Vec::new(),
            chat: Vec::new(),
            chat_message: Vec::new(),
            chat_message_feedback: Vec::new(),
            custom_template: Vec::new(),
            document_store: Vec::new(),
            document_store_file_chunk: Vec::new(),
            execution: Vec::new(),
            tool: Vec::new(),
            variable: Vec::new(),
        }
    }

    /// Every flow row across the four flow categories
    pub fn flows(&self) -> impl Iterator<Item = &ChatFlow> {
        self.agent_flow
            .iter()
            .chain(&self.agent_flow_v2)
            .chain(&self.assistant_flow)
            .chain(&self.chat_flow)
    }

    pub fn flows_mut(&mut self) -> impl Iterator<Item = &mut ChatFlow> {
        self.agent_flow
            .iter_mut()
            .chain(self.agent_flow_v2.iter_mut())
            .chain(self.assistant_flow.iter_mut())
            .chain(self.chat_flow.iter_mut())
    }

    /// Every assistant row across the three assistant categories
    pub fn assistants(&self) -> impl Iterator<Item = &Assistant> {
        self.assistant_custom
            .iter()
            .chain(&self.assistant_openai)
            .chain(&self.assistant_azure)
    }

    pub fn assistants_mut(&mut self) -> impl Iterator<Item = &mut Assistant> {
        self.assistant_custom
            .iter_mut()
            .chain(self.assistant_openai.iter_mut())
            .chain(self.assistant_azure.iter_mut())
    }

    /// Row count per category
    pub fn counts(&self) -> BundleCounts {
        [
            ("AgentFlow", self.agent_flow.len()),
            ("AgentFlowV2", self.agent_flow_v2.len()),
            ("AssistantCustom", self.assistant_custom.len()),
            ("AssistantOpenAI", self.assistant_openai.len()),
            ("AssistantAzure", self.assistant_azure.len()),
            ("AssistantFlow", self.assistant_flow.len()),
            ("ChatFlow", self.chat_flow.len()),
            ("Chat", self.chat.len()),
            ("ChatMessage", self.chat_message.len()),
            ("ChatMessageFeedback", self.chat_message_feedback.len()),
            ("CustomTemplate", self.custom_template.len()),
            ("DocumentStore", self.document_store.len()),
            ("DocumentStoreFileChunk", self.document_store_file_chunk.len()),
            ("Execution", self.execution.len()),
            ("Tool", self.tool.len()),
            ("Variable", self.variable.len()),
        ]
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect()
    }

    pub fn total_rows(&self) -> usize {
        self.counts().values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }
}
