//! Output tree types

use super::event::IterationKey;
use crate::models::ExecutionState;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node of the reconstructed execution tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TreeNode {
    /// A node execution taken from the event log
    Execution(ExecutionNode),
    /// A synthesized container for one loop pass
    Iteration(IterationNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionNode {
    /// Logical node id plus log position, unique within the forest
    pub id: String,
    pub label: String,
    /// Logical node id
    pub logical_name: String,
    pub status: Option<ExecutionState>,
    pub data: Value,
    pub execution_index: usize,
    /// Set when the event ran inside a loop pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<IterationKey>,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationNode {
    pub id: String,
    pub label: String,
    /// Logical id of the loop node this pass belongs to
    pub logical_name: String,
    pub iteration_index: u64,
    pub iteration_context: Value,
    /// Derived from the pass members, `None` when it cannot be decided
    pub status: Option<ExecutionState>,
    /// Log position of the first member
    pub execution_index: usize,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn id(&self) -> &str {
        match self {
            TreeNode::Execution(node) => &node.id,
            TreeNode::Iteration(node) => &node.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TreeNode::Execution(node) => &node.label,
            TreeNode::Iteration(node) => &node.label,
        }
    }

    pub fn logical_name(&self) -> &str {
        match self {
            TreeNode::Execution(node) => &node.logical_name,
            TreeNode::Iteration(node) => &node.logical_name,
        }
    }

    pub fn status(&self) -> Option<ExecutionState> {
        match self {
            TreeNode::Execution(node) => node.status,
            TreeNode::Iteration(node) => node.status,
        }
    }

    pub fn execution_index(&self) -> usize {
        match self {
            TreeNode::Execution(node) => node.execution_index,
            TreeNode::Iteration(node) => node.execution_index,
        }
    }

    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Execution(node) => &node.children,
            TreeNode::Iteration(node) => &node.children,
        }
    }

    /// Loop containers and loop members sort ahead of their siblings
    pub fn is_iteration(&self) -> bool {
        match self {
            TreeNode::Execution(node) => node.iteration.is_some(),
            TreeNode::Iteration(_) => true,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, TreeNode::Iteration(_))
    }

    /// Pre-order traversal
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a TreeNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}
