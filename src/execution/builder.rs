//! Execution tree reconstruction
//!
//! Rebuilds the parent/child structure of a run from its flat event log:
//!
//! 1. Every event gets a slot keyed by its log position, so recurring logical
//!    ids stay distinct.
//! 2. Events whose payload carries both `parentNodeId` and `iterationIndex`
//!    are grouped per loop pass; everything else is linked directly.
//! 3. An ordinary event attaches under the latest earlier event whose logical
//!    id is listed in its `previousNodeIds`. No match makes it a root.
//! 4. Each loop pass becomes a virtual [`IterationNode`] under the
//!    last-occurring ordinary execution of its loop node. A loop node that
//!    only runs inside another pass anchors on its nearest run there.
//! 5. Pass members link to each other with the same rule, restricted to the
//!    pass. Members without a predecessor hang off the virtual node.
//! 6. Children are ordered loop content first, then by log position.
//! 7. The credential sentinel key is stripped from every payload.
//!
//! All bookkeeping lives in a per-call arena and is dropped on return.

use super::event::{ExecutionEvent, IterationKey};
use super::query::derive_iteration_status;
use super::tree::{ExecutionNode, IterationNode, TreeNode};
use crate::json::strip_key;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Payload key holding a credential handle
pub const DEFAULT_CREDENTIAL_KEY: &str = "FLOWISE_CREDENTIAL_ID";

/// Builds execution trees from event logs.
#[derive(Debug, Clone)]
pub struct ExecutionTreeBuilder {
    credential_key: String,
}

impl Default for ExecutionTreeBuilder {
    fn default() -> Self {
        Self {
            credential_key: DEFAULT_CREDENTIAL_KEY.to_string(),
        }
    }
}

/// Build a tree with the default credential sentinel.
pub fn build_execution_tree(events: &[ExecutionEvent]) -> Vec<TreeNode> {
    ExecutionTreeBuilder::new().build(events)
}

struct IterationGroup {
    key: IterationKey,
    members: Vec<usize>,
}

/// Per-call arena. Slots `0..events.len()` are events, the rest are loop
/// passes in order of first appearance.
struct Arena<'a> {
    events: &'a [ExecutionEvent],
    groups: Vec<IterationGroup>,
    membership: Vec<Option<usize>>,
    parent: Vec<Option<usize>>,
}

impl<'a> Arena<'a> {
    fn new(events: &'a [ExecutionEvent]) -> Self {
        let mut groups: Vec<IterationGroup> = Vec::new();
        let mut group_index: HashMap<IterationKey, usize> = HashMap::new();
        let mut membership = vec![None; events.len()];

        for (index, event) in events.iter().enumerate() {
            if event.node_id.is_none() {
                warn!(index, "execution event without nodeId, treating it as a root");
                continue;
            }
            if let Some(key) = event.iteration_key() {
                let group = *group_index.entry(key.clone()).or_insert_with(|| {
                    groups.push(IterationGroup {
                        key,
                        members: Vec::new(),
                    });
                    groups.len() - 1
                });
                groups[group].members.push(index);
                membership[index] = Some(group);
            }
        }

        let slots = events.len() + groups.len();
        Self {
            events,
            groups,
            membership,
            parent: vec![None; slots],
        }
    }

    fn slot_count(&self) -> usize {
        self.parent.len()
    }

    fn virtual_slot(&self, group: usize) -> usize {
        self.events.len() + group
    }

    /// Latest event before `index` whose logical id is one of its
    /// predecessors and that passes `filter`.
    fn latest_predecessor(&self, index: usize, filter: impl Fn(usize) -> bool) -> Option<usize> {
        let previous = &self.events[index].previous_node_ids;
        if previous.is_empty() {
            return None;
        }
        (0..index).rev().find(|&candidate| {
            filter(candidate)
                && self.events[candidate]
                    .node_id
                    .as_ref()
                    .is_some_and(|id| previous.contains(id))
        })
    }

    /// Last-occurring ordinary execution of `node_id` anywhere in the log
    fn last_ordinary_execution_of(&self, node_id: &str) -> Option<usize> {
        (0..self.events.len()).rev().find(|&candidate| {
            self.membership[candidate].is_none()
                && self.events[candidate].node_id.as_deref() == Some(node_id)
        })
    }

    /// Latest execution of `node_id` passing `filter`, preferring one that
    /// ran before `before`. Used for loops nested inside another pass.
    fn latest_execution_of(
        &self,
        node_id: &str,
        before: usize,
        filter: impl Fn(usize) -> bool,
    ) -> Option<usize> {
        let matches = |candidate: &usize| {
            filter(*candidate) && self.events[*candidate].node_id.as_deref() == Some(node_id)
        };
        (0..before)
            .rev()
            .find(matches)
            .or_else(|| (before..self.events.len()).rev().find(matches))
    }

    fn link(&mut self) {
        for index in 0..self.events.len() {
            if self.membership[index].is_some() || self.events[index].node_id.is_none() {
                continue;
            }
            self.parent[index] = self.latest_predecessor(index, |_| true);
        }

        for group in 0..self.groups.len() {
            let first_member = self.groups[group].members[0];
            let loop_node = self.groups[group].key.parent_node_id.clone();

            let anchor = self
                .last_ordinary_execution_of(&loop_node)
                .or_else(|| {
                    self.latest_execution_of(&loop_node, first_member, |c| {
                        self.membership[c].is_some_and(|g| g != group)
                    })
                });
            if anchor.is_none() {
                debug!(loop_node = %loop_node, "no execution of loop node, iteration becomes a root");
            }
            let slot = self.virtual_slot(group);
            self.parent[slot] = anchor;

            for position in 0..self.groups[group].members.len() {
                let member = self.groups[group].members[position];
                let predecessor =
                    self.latest_predecessor(member, |c| self.membership[c] == Some(group));
                self.parent[member] = Some(predecessor.unwrap_or(slot));
            }
        }
    }

    /// Loop content first, then log position
    fn sort_key(&self, slot: usize) -> (bool, usize) {
        if slot < self.events.len() {
            (self.membership[slot].is_none(), slot)
        } else {
            let group = &self.groups[slot - self.events.len()];
            (false, group.members[0])
        }
    }

    fn execution_position(&self, slot: usize) -> usize {
        self.sort_key(slot).1
    }

    /// Child lists plus the root set. A slot unreachable from any root can
    /// only come from a cycle in loop anchoring; the earliest such slot is
    /// detached and promoted to a root until everything is reachable.
    fn layout(&mut self) -> (Vec<Vec<usize>>, Vec<usize>) {
        let slots = self.slot_count();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); slots];
        let mut roots = Vec::new();
        for slot in 0..slots {
            match self.parent[slot] {
                Some(parent) => children[parent].push(slot),
                None => roots.push(slot),
            }
        }

        let mut visited = vec![false; slots];
        let mut stack: Vec<usize> = roots.clone();
        loop {
            while let Some(slot) = stack.pop() {
                if visited[slot] {
                    continue;
                }
                visited[slot] = true;
                stack.extend(children[slot].iter().copied());
            }

            let Some(orphan) = (0..slots)
                .filter(|slot| !visited[*slot])
                .min_by_key(|slot| self.execution_position(*slot))
            else {
                break;
            };
            warn!(slot = orphan, "cyclic loop anchoring in execution log, promoting node to root");
            if let Some(parent) = self.parent[orphan].take() {
                children[parent].retain(|child| *child != orphan);
            }
            roots.push(orphan);
            stack.push(orphan);
        }

        for list in children.iter_mut() {
            list.sort_by_key(|slot| self.sort_key(*slot));
        }
        roots.sort_by_key(|slot| self.execution_position(*slot));
        (children, roots)
    }
}

impl ExecutionTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different credential sentinel key
    pub fn with_credential_key(mut self, key: impl Into<String>) -> Self {
        self.credential_key = key.into();
        self
    }

    pub fn credential_key(&self) -> &str {
        &self.credential_key
    }

    /// Reconstruct the execution forest for one run.
    ///
    /// Never fails: malformed events degrade to roots.
    pub fn build(&self, events: &[ExecutionEvent]) -> Vec<TreeNode> {
        if events.is_empty() {
            return Vec::new();
        }

        let mut arena = Arena::new(events);
        arena.link();
        let (children, roots) = arena.layout();

        let mut used_ids = HashSet::new();
        roots
            .iter()
            .map(|root| self.materialize(&arena, &children, *root, &mut used_ids))
            .collect()
    }

    fn materialize(
        &self,
        arena: &Arena<'_>,
        children: &[Vec<usize>],
        slot: usize,
        used_ids: &mut HashSet<String>,
    ) -> TreeNode {
        let nodes: Vec<TreeNode> = children[slot]
            .iter()
            .map(|child| self.materialize(arena, children, *child, used_ids))
            .collect();

        if slot < arena.events.len() {
            let event = &arena.events[slot];
            let logical_name = event.node_id.clone().unwrap_or_default();
            let label = match (&event.node_label, &event.node_id) {
                (Some(label), _) => label.clone(),
                (None, Some(id)) => id.clone(),
                (None, None) => String::new(),
            };
            let mut data = event.data.clone();
            strip_key(&mut data, &self.credential_key);

            TreeNode::Execution(ExecutionNode {
                id: unique_id(format!("{}_{}", logical_name, slot), used_ids),
                label,
                logical_name,
                status: event.status,
                data,
                execution_index: slot,
                iteration: arena.membership[slot].map(|g| arena.groups[g].key.clone()),
                children: nodes,
            })
        } else {
            let group = &arena.groups[slot - arena.events.len()];
            let first = &arena.events[group.members[0]];
            let mut iteration_context = first.iteration_context();
            strip_key(&mut iteration_context, &self.credential_key);
            let status = derive_iteration_status(
                group.members.iter().map(|member| arena.events[*member].status),
            );

            TreeNode::Iteration(IterationNode {
                id: unique_id(
                    format!(
                        "{}_iteration_{}",
                        group.key.parent_node_id, group.key.iteration_index
                    ),
                    used_ids,
                ),
                label: format!("Iteration #{}", group.key.iteration_index),
                logical_name: group.key.parent_node_id.clone(),
                iteration_index: group.key.iteration_index,
                iteration_context,
                status,
                execution_index: group.members[0],
                children: nodes,
            })
        }
    }
}

fn unique_id(candidate: String, used_ids: &mut HashSet<String>) -> String {
    if used_ids.insert(candidate.clone()) {
        return candidate;
    }
    let mut suffix = 1;
    loop {
        let id = format!("{}#{}", candidate, suffix);
        if used_ids.insert(id.clone()) {
            return id;
        }
        suffix += 1;
    }
}
