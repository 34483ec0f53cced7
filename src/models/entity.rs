//! Entity trait and physical table identifiers

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Physical table an entity row lives in.
///
/// Several bundle categories can share one table (all flow kinds live in
/// `ChatFlow`, all assistant kinds in `Assistant`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StoreTable {
    ChatFlow,
    Chat,
    ChatMessage,
    ChatMessageFeedback,
    Assistant,
    CustomTemplate,
    DocumentStore,
    DocumentStoreFileChunk,
    Tool,
    Variable,
    Execution,
}

impl StoreTable {
    /// Every table, in save order
    pub const ALL: [StoreTable; 11] = [
        StoreTable::ChatFlow,
        StoreTable::Chat,
        StoreTable::ChatMessage,
        StoreTable::ChatMessageFeedback,
        StoreTable::Assistant,
        StoreTable::CustomTemplate,
        StoreTable::DocumentStore,
        StoreTable::DocumentStoreFileChunk,
        StoreTable::Tool,
        StoreTable::Execution,
        StoreTable::Variable,
    ];

    /// SQL table name
    pub fn table_name(&self) -> &'static str {
        match self {
            StoreTable::ChatFlow => "chat_flow",
            StoreTable::Chat => "chat",
            StoreTable::ChatMessage => "chat_message",
            StoreTable::ChatMessageFeedback => "chat_message_feedback",
            StoreTable::Assistant => "assistant",
            StoreTable::CustomTemplate => "custom_template",
            StoreTable::DocumentStore => "document_store",
            StoreTable::DocumentStoreFileChunk => "document_store_file_chunk",
            StoreTable::Tool => "tool",
            StoreTable::Variable => "variable",
            StoreTable::Execution => "execution",
        }
    }
}

impl std::fmt::Display for StoreTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

/// A persisted row with an opaque string id and tenant ownership columns.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const TABLE: StoreTable;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Overwrite the owning user and organization
    fn stamp_tenant(&mut self, user_id: &str, organization_id: &str);
}

/// Implements [`Entity`] for a struct with `id`, `user_id` and
/// `organization_id` fields.
macro_rules! impl_entity {
    ($ty:ty, $table:expr) => {
        impl $crate::models::entity::Entity for $ty {
            const TABLE: $crate::models::entity::StoreTable = $table;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn stamp_tenant(&mut self, user_id: &str, organization_id: &str) {
                self.user_id = Some(user_id.to_string());
                self.organization_id = Some(organization_id.to_string());
            }
        }
    };
}

pub(crate) use impl_entity;
