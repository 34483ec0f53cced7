//! Execution event records produced by the flow runner

use crate::models::ExecutionState;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// One node execution, in log order.
///
/// `node_id` is the logical node id and recurs when a node runs more than
/// once (loops, retries).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEvent {
    #[serde(
        default,
        deserialize_with = "lenient_node_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_label: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub previous_node_ids: Vec<String>,
    /// Unknown or non-string statuses read as `None`
    #[serde(
        default,
        deserialize_with = "lenient_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<ExecutionState>,
    /// Node payload. Loop members carry `parentNodeId`, `iterationIndex` and
    /// `iterationContext`.
    #[serde(default)]
    pub data: Value,
}

/// Identifies one pass of a loop: the loop node plus the pass number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationKey {
    pub parent_node_id: String,
    pub iteration_index: u64,
}

impl ExecutionEvent {
    pub fn new(
        node_id: impl Into<String>,
        node_label: impl Into<String>,
        previous_node_ids: &[&str],
        status: ExecutionState,
    ) -> Self {
        Self {
            node_id: Some(node_id.into()),
            node_label: Some(node_label.into()),
            previous_node_ids: previous_node_ids.iter().map(|s| s.to_string()).collect(),
            status: Some(status),
            data: Value::Object(Default::default()),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Mark this event as a member of loop pass `iteration_index` of
    /// `parent_node_id`.
    pub fn in_iteration(mut self, parent_node_id: &str, iteration_index: u64) -> Self {
        if !self.data.is_object() {
            self.data = Value::Object(Default::default());
        }
        if let Value::Object(map) = &mut self.data {
            map.insert("parentNodeId".into(), Value::String(parent_node_id.to_string()));
            map.insert("iterationIndex".into(), Value::from(iteration_index));
        }
        self
    }

    /// Loop pass this event belongs to. Requires both `parentNodeId` and a
    /// non-negative integer `iterationIndex` in the payload.
    pub fn iteration_key(&self) -> Option<IterationKey> {
        let parent_node_id = self.data.get("parentNodeId")?.as_str()?;
        if parent_node_id.is_empty() {
            return None;
        }
        let iteration_index = match self.data.get("iterationIndex")? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))?,
            Value::String(s) => s.parse().ok()?,
            _ => return None,
        };
        Some(IterationKey {
            parent_node_id: parent_node_id.to_string(),
            iteration_index,
        })
    }

    pub fn iteration_context(&self) -> Value {
        self.data
            .get("iterationContext")
            .cloned()
            .unwrap_or(Value::Null)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_node_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(id) => Some(id),
        Value::Null => None,
        other => {
            warn!(node_id = %other, "non-string nodeId in execution event, ignoring it");
            None
        }
    })
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<ExecutionState>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value::<ExecutionState>(value.clone()) {
        Ok(state) => Ok(Some(state)),
        Err(_) => {
            warn!(status = %value, "unrecognized execution status, leaving it undecided");
            Ok(None)
        }
    }
}
