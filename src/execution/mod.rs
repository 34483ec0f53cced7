//! Execution tree reconstruction
//!
//! Turns the flat, ordered event log of one agent flow run into a forest of
//! [`TreeNode`]s, grouping loop passes under synthesized iteration nodes.

pub mod builder;
pub mod event;
pub mod query;
pub mod tree;

pub use builder::{DEFAULT_CREDENTIAL_KEY, ExecutionTreeBuilder, build_execution_tree};
pub use event::{ExecutionEvent, IterationKey};
pub use query::{
    aggregate_status, collect_statuses, count_nodes, derive_iteration_status, find_node,
    run_status,
};
pub use tree::{ExecutionNode, IterationNode, TreeNode};
