//! Document store and file chunk models

use super::entity::{StoreTable, impl_entity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStore {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_entity!(DocumentStore, StoreTable::DocumentStore);

impl DocumentStore {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: None,
            user_id: None,
            organization_id: None,
            extra: Map::new(),
        }
    }
}

/// A chunk of a loaded document. `store_id` references the owning
/// [`DocumentStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStoreFileChunk {
    pub id: String,
    pub store_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub chunk_no: i64,
    #[serde(default)]
    pub page_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_entity!(DocumentStoreFileChunk, StoreTable::DocumentStoreFileChunk);

impl DocumentStoreFileChunk {
    pub fn new(
        id: impl Into<String>,
        store_id: impl Into<String>,
        chunk_no: i64,
        page_content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            store_id: store_id.into(),
            doc_id: None,
            chunk_no,
            page_content: page_content.into(),
            user_id: None,
            organization_id: None,
            extra: Map::new(),
        }
    }
}
