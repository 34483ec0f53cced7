//! Assistant model (custom, OpenAI and Azure variants share one table)

use super::entity::{StoreTable, impl_entity};
use super::enums::AssistantType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assistant {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub assistant_type: Option<AssistantType>,
    /// Serialized assistant configuration; may embed tool and document store ids
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_entity!(Assistant, StoreTable::Assistant);

impl Assistant {
    pub fn new(id: impl Into<String>, assistant_type: AssistantType) -> Self {
        Self {
            id: id.into(),
            assistant_type: Some(assistant_type),
            details: "{}".to_string(),
            credential: None,
            user_id: None,
            organization_id: None,
            extra: Map::new(),
        }
    }
}
