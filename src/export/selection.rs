//! Category flags for an export request

use crate::validation::{ValidationError, ValidationResult, validate_flag};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which entity categories to export. Absent flags are false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSelection {
    pub agentflow: bool,
    pub agentflowv2: bool,
    #[serde(rename = "assistantCustom")]
    pub assistant_custom: bool,
    #[serde(rename = "assistantOpenAI")]
    pub assistant_openai: bool,
    #[serde(rename = "assistantAzure")]
    pub assistant_azure: bool,
    #[serde(rename = "assistantFlow")]
    pub assistant_flow: bool,
    pub chatflow: bool,
    pub chat: bool,
    pub chat_message: bool,
    pub chat_feedback: bool,
    pub custom_template: bool,
    pub document_store: bool,
    pub document_store_file_chunk: bool,
    pub execution: bool,
    pub tool: bool,
    pub variable: bool,
}

/// Wire names of every flag, in bundle order
pub const SELECTION_KEYS: [&str; 16] = [
    "agentflow",
    "agentflowv2",
    "assistantCustom",
    "assistantOpenAI",
    "assistantAzure",
    "assistantFlow",
    "chatflow",
    "chat",
    "chat_message",
    "chat_feedback",
    "custom_template",
    "document_store",
    "document_store_file_chunk",
    "execution",
    "tool",
    "variable",
];

impl ExportSelection {
    /// Every category selected
    pub fn all() -> Self {
        Self {
            agentflow: true,
            agentflowv2: true,
            assistant_custom: true,
            assistant_openai: true,
            assistant_azure: true,
            assistant_flow: true,
            chatflow: true,
            chat: true,
            chat_message: true,
            chat_feedback: true,
            custom_template: true,
            document_store: true,
            document_store_file_chunk: true,
            execution: true,
            tool: true,
            variable: true,
        }
    }

    /// Parse a flag map strictly.
    ///
    /// Every present key must hold a boolean, so `null` is rejected. Keys
    /// outside the sixteen category names are rejected as well. Errors name
    /// the offending field.
    pub fn from_value(value: &Value) -> ValidationResult<Self> {
        let Value::Object(map) = value else {
            return Err(ValidationError::InvalidFormat(
                "selection".to_string(),
                "expected an object of boolean flags".to_string(),
            ));
        };

        let mut selection = Self::default();
        for (key, flag) in map {
            let enabled = validate_flag(key, flag)?;
            let slot = selection
                .flag_mut(key)
                .ok_or_else(|| ValidationError::UnknownField(key.clone()))?;
            *slot = enabled;
        }
        Ok(selection)
    }

    fn flag_mut(&mut self, key: &str) -> Option<&mut bool> {
        Some(match key {
            "agentflow" => &mut self.agentflow,
            "agentflowv2" => &mut self.agentflowv2,
            "assistantCustom" => &mut self.assistant_custom,
            "assistantOpenAI" => &mut self.assistant_openai,
            "assistantAzure" => &mut self.assistant_azure,
            "assistantFlow" => &mut self.assistant_flow,
            "chatflow" => &mut self.chatflow,
            "chat" => &mut self.chat,
            "chat_message" => &mut self.chat_message,
            "chat_feedback" => &mut self.chat_feedback,
            "custom_template" => &mut self.custom_template,
            "document_store" => &mut self.document_store,
            "document_store_file_chunk" => &mut self.document_store_file_chunk,
            "execution" => &mut self.execution,
            "tool" => &mut self.tool,
            "variable" => &mut self.variable,
            _ => return None,
        })
    }

    fn flags(&self) -> [bool; 16] {
        [
            self.agentflow,
            self.agentflowv2,
            self.assistant_custom,
            self.assistant_openai,
            self.assistant_azure,
            self.assistant_flow,
            self.chatflow,
            self.chat,
            self.chat_message,
            self.chat_feedback,
            self.custom_template,
            self.document_store,
            self.document_store_file_chunk,
            self.execution,
            self.tool,
            self.variable,
        ]
    }

    /// Wire names of the selected categories
    pub fn selected(&self) -> Vec<&'static str> {
        SELECTION_KEYS
            .iter()
            .zip(self.flags())
            .filter(|(_, on)| *on)
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        !self.flags().contains(&true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_reads_flags() {
        let selection =
            ExportSelection::from_value(&json!({"chatflow": true, "assistantOpenAI": true, "tool": false}))
                .unwrap();
        assert!(selection.chatflow);
        assert!(selection.assistant_openai);
        assert!(!selection.tool);
        assert_eq!(selection.selected(), vec!["assistantOpenAI", "chatflow"]);
    }

    #[test]
    fn test_from_value_rejects_non_boolean() {
        let err = ExportSelection::from_value(&json!({"chat_message": "yes"})).unwrap_err();
        assert!(err.to_string().contains("chat_message"));
    }

    #[test]
    fn test_from_value_rejects_null_flag() {
        let err = ExportSelection::from_value(&json!({"tool": null})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotBoolean {
                field: "tool".to_string(),
                actual: "null".to_string(),
            }
        );
    }

    #[test]
    fn test_from_value_rejects_unknown_key() {
        let err = ExportSelection::from_value(&json!({"chatflows": true})).unwrap_err();
        assert_eq!(err, ValidationError::UnknownField("chatflows".to_string()));
    }

    #[test]
    fn test_all_and_default() {
        assert_eq!(ExportSelection::all().selected().len(), SELECTION_KEYS.len());
        assert!(ExportSelection::default().is_empty());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let value = serde_json::to_value(ExportSelection::all()).unwrap();
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        for key in SELECTION_KEYS {
            assert!(map.contains_key(key), "missing {}", key);
        }
    }
}
