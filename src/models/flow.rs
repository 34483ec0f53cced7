//! Chat flow model
//!
//! Every canvas kind (chatflow, agent flow v1/v2, assistant flow) is stored as
//! a `ChatFlow` row distinguished by [`FlowType`].

use super::entity::{StoreTable, impl_entity};
use super::enums::FlowType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFlow {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Serialized flow definition (nodes and edges)
    #[serde(default)]
    pub flow_data: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub flow_type: Option<FlowType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<DateTime<Utc>>,
    /// Columns this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_entity!(ChatFlow, StoreTable::ChatFlow);

impl ChatFlow {
    pub fn new(id: impl Into<String>, name: impl Into<String>, flow_type: FlowType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            flow_data: r#"{"nodes":[],"edges":[]}"#.to_string(),
            flow_type: Some(flow_type),
            user_id: None,
            organization_id: None,
            created_date: None,
            updated_date: None,
            extra: Map::new(),
        }
    }

    /// Re-serialize `flow_data` in compact form so formatting-only
    /// differences disappear.
    pub fn normalize_flow_data(&mut self) -> Result<(), serde_json::Error> {
        let parsed: Value = serde_json::from_str(&self.flow_data)?;
        self.flow_data = serde_json::to_string(&parsed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_flow_data() {
        let mut flow = ChatFlow::new("f1", "Flow", FlowType::Chatflow);
        flow.flow_data = "{\n  \"nodes\": [ ],\n  \"edges\": []\n}".to_string();
        flow.normalize_flow_data().unwrap();
        assert_eq!(flow.flow_data, r#"{"edges":[],"nodes":[]}"#);
    }

    #[test]
    fn test_normalize_rejects_invalid_flow_data() {
        let mut flow = ChatFlow::new("f1", "Flow", FlowType::Chatflow);
        flow.flow_data = "{nodes".to_string();
        assert!(flow.normalize_flow_data().is_err());
    }

    #[test]
    fn test_unknown_columns_round_trip() {
        let json = serde_json::json!({
            "id": "f1",
            "name": "Support bot",
            "flowData": "{}",
            "type": "AGENTFLOW",
            "deployed": true,
            "category": "support"
        });
        let flow: ChatFlow = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(flow.flow_type, Some(FlowType::Agentflow));
        assert_eq!(flow.extra.get("deployed"), Some(&Value::Bool(true)));
        assert_eq!(serde_json::to_value(&flow).unwrap(), json);
    }
}
