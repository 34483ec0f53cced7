//! Reusable building blocks: custom templates, tools and variables

use super::entity::{StoreTable, impl_entity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTemplate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_data: Option<String>,
    /// Use-case tags. Stored as an array, carried as a JSON string in bundles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usecases: Option<Value>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub template_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_entity!(CustomTemplate, StoreTable::CustomTemplate);

impl CustomTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            flow_data: None,
            usecases: None,
            template_type: None,
            user_id: None,
            organization_id: None,
            extra: Map::new(),
        }
    }

    /// Convert structured `usecases` into its string wire form.
    pub fn usecases_to_wire(&mut self) {
        if let Some(value) = &self.usecases
            && !value.is_string()
        {
            self.usecases = Some(Value::String(value.to_string()));
        }
    }

    /// Parse a string `usecases` back into structured form. Strings that are
    /// not JSON are kept as they are.
    pub fn usecases_from_wire(&mut self) {
        if let Some(Value::String(text)) = &self.usecases
            && let Ok(parsed) = serde_json::from_str::<Value>(text)
        {
            self.usecases = Some(parsed);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_entity!(Tool, StoreTable::Tool);

impl Tool {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            user_id: None,
            organization_id: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub variable_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_entity!(Variable, StoreTable::Variable);

impl Variable {
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value: value.into(),
            variable_type: None,
            user_id: None,
            organization_id: None,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_usecases_wire_round_trip() {
        let mut template = CustomTemplate::new("t1", "Template");
        template.usecases = Some(json!(["Customer Support", "RAG"]));

        template.usecases_to_wire();
        assert_eq!(
            template.usecases,
            Some(Value::String(r#"["Customer Support","RAG"]"#.to_string()))
        );

        template.usecases_from_wire();
        assert_eq!(template.usecases, Some(json!(["Customer Support", "RAG"])));
    }

    #[test]
    fn test_usecases_plain_string_kept() {
        let mut template = CustomTemplate::new("t1", "Template");
        template.usecases = Some(Value::String("support".to_string()));
        template.usecases_from_wire();
        assert_eq!(template.usecases, Some(Value::String("support".to_string())));
    }
}
