//! Lookups and status roll-ups over a built forest

use super::tree::TreeNode;
use crate::models::ExecutionState;

/// Depth-first search for a node by its synthesized id.
pub fn find_node<'a>(forest: &'a [TreeNode], id: &str) -> Option<&'a TreeNode> {
    forest.iter().find_map(|node| {
        if node.id() == id {
            return Some(node);
        }
        find_node(node.children(), id)
    })
}

/// Every node's status in pre-order, virtual nodes included.
pub fn collect_statuses(forest: &[TreeNode]) -> Vec<Option<ExecutionState>> {
    let mut statuses = Vec::new();
    for root in forest {
        root.walk(&mut |node| statuses.push(node.status()));
    }
    statuses
}

pub fn count_nodes(forest: &[TreeNode]) -> usize {
    let mut count = 0;
    for root in forest {
        root.walk(&mut |_| count += 1);
    }
    count
}

/// Run-level status: `ERROR` > `INPROGRESS` > `STOPPED` > all `FINISHED`.
/// Anything else, including an empty list, is undecided.
pub fn aggregate_status<I>(statuses: I) -> Option<ExecutionState>
where
    I: IntoIterator<Item = Option<ExecutionState>>,
{
    let statuses: Vec<_> = statuses.into_iter().collect();
    if statuses.contains(&Some(ExecutionState::Error)) {
        Some(ExecutionState::Error)
    } else if statuses.contains(&Some(ExecutionState::Inprogress)) {
        Some(ExecutionState::Inprogress)
    } else if statuses.contains(&Some(ExecutionState::Stopped)) {
        Some(ExecutionState::Stopped)
    } else if all_finished(&statuses) {
        Some(ExecutionState::Finished)
    } else {
        None
    }
}

/// Loop pass status: `ERROR` > `INPROGRESS` > all `FINISHED`. A stopped pass
/// without errors is undecided.
pub fn derive_iteration_status<I>(statuses: I) -> Option<ExecutionState>
where
    I: IntoIterator<Item = Option<ExecutionState>>,
{
    let statuses: Vec<_> = statuses.into_iter().collect();
    if statuses.contains(&Some(ExecutionState::Error)) {
        Some(ExecutionState::Error)
    } else if statuses.contains(&Some(ExecutionState::Inprogress)) {
        Some(ExecutionState::Inprogress)
    } else if all_finished(&statuses) {
        Some(ExecutionState::Finished)
    } else {
        None
    }
}

/// Aggregate status of a whole forest
pub fn run_status(forest: &[TreeNode]) -> Option<ExecutionState> {
    aggregate_status(collect_statuses(forest))
}

fn all_finished(statuses: &[Option<ExecutionState>]) -> bool {
    !statuses.is_empty()
        && statuses
            .iter()
            .all(|status| *status == Some(ExecutionState::Finished))
}
