//! Execution tree reconstruction tests

use agentflow_sdk::ExecutionState::{self, *};
use agentflow_sdk::execution::{
    ExecutionEvent, ExecutionTreeBuilder, TreeNode, build_execution_tree, count_nodes,
    derive_iteration_status, find_node, run_status,
};
use serde_json::json;

fn event(id: &str, prev: &[&str]) -> ExecutionEvent {
    ExecutionEvent::new(id, id.to_uppercase(), prev, Finished)
}

fn event_with_status(id: &str, prev: &[&str], status: ExecutionState) -> ExecutionEvent {
    ExecutionEvent::new(id, id.to_uppercase(), prev, status)
}

/// Log positions of every ordinary node in the forest, sorted
fn event_positions(forest: &[TreeNode]) -> Vec<usize> {
    let mut positions = Vec::new();
    for root in forest {
        root.walk(&mut |node| {
            if let TreeNode::Execution(execution) = node {
                positions.push(execution.execution_index);
            }
        });
    }
    positions.sort_unstable();
    positions
}

fn assert_loop_content_first(nodes: &[TreeNode]) {
    for node in nodes {
        let children = node.children();
        if let Some(first_plain) = children.iter().position(|c| !c.is_iteration()) {
            assert!(
                children[first_plain..].iter().all(|c| !c.is_iteration()),
                "loop content after ordinary children under {}",
                node.id()
            );
        }
        assert_loop_content_first(children);
    }
}

/// start -> loop -> (a -> b) x2 -> end
fn loop_run() -> Vec<ExecutionEvent> {
    vec![
        event("start", &[]),
        event("loop", &["start"]),
        event("a", &["loop"])
            .in_iteration("loop", 0)
            .with_data(json!({
                "parentNodeId": "loop",
                "iterationIndex": 0,
                "iterationContext": {"item": "first", "FLOWISE_CREDENTIAL_ID": "cred"}
            })),
        event("b", &["a"]).in_iteration("loop", 0),
        event("a", &["loop"]).in_iteration("loop", 1),
        event("b", &["a"]).in_iteration("loop", 1),
        event("end", &["loop"]),
    ]
}

mod structure_tests {
    use super::*;

    #[test]
    fn test_loop_run_shape() {
        let forest = build_execution_tree(&loop_run());
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id(), "start_0");

        let loop_node = &forest[0].children()[0];
        assert_eq!(loop_node.id(), "loop_1");
        let ids: Vec<&str> = loop_node.children().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["loop_iteration_0", "loop_iteration_1", "end_6"]);

        let first_pass = &loop_node.children()[0];
        assert_eq!(first_pass.label(), "Iteration #0");
        assert_eq!(first_pass.logical_name(), "loop");
        assert_eq!(first_pass.children()[0].id(), "a_2");
        assert_eq!(first_pass.children()[0].children()[0].id(), "b_3");

        let second_pass = &loop_node.children()[1];
        assert_eq!(second_pass.children()[0].id(), "a_4");
        assert_eq!(second_pass.children()[0].children()[0].id(), "b_5");
    }

    #[test]
    fn test_iteration_context_is_scrubbed() {
        let forest = build_execution_tree(&loop_run());
        let Some(TreeNode::Iteration(pass)) = find_node(&forest, "loop_iteration_0") else {
            panic!("expected iteration node");
        };
        assert_eq!(pass.iteration_context, json!({"item": "first"}));
        assert_eq!(pass.iteration_index, 0);
        assert_eq!(pass.execution_index, 2);
    }

    #[test]
    fn test_iteration_anchors_on_latest_loop_execution() {
        let events = vec![
            event("b", &[]),
            event("b", &["b"]),
            event("m", &["b"]).in_iteration("b", 0),
            event("b", &["b"]),
        ];
        let forest = build_execution_tree(&events);

        let earlier = find_node(&forest, "b_1").unwrap();
        let ids: Vec<&str> = earlier.children().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["b_3"]);

        let anchor = find_node(&forest, "b_3").unwrap();
        let ids: Vec<&str> = anchor.children().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["b_iteration_0"]);
        assert_eq!(anchor.children()[0].children()[0].id(), "m_2");
    }

    #[test]
    fn test_unrecognized_status_still_builds_tree() {
        let events: Vec<ExecutionEvent> = serde_json::from_value(json!([
            {"nodeId": "a", "status": "FINISHED"},
            {"nodeId": "b", "previousNodeIds": ["a"], "status": "UNKNOWN"},
            {"nodeId": 42, "previousNodeIds": ["b"], "status": 3}
        ]))
        .unwrap();
        let forest = build_execution_tree(&events);

        assert_eq!(event_positions(&forest), vec![0, 1, 2]);
        let b = find_node(&forest, "b_1").unwrap();
        assert_eq!(b.status(), None);
        assert_eq!(forest[0].children()[0].id(), "b_1");
    }

    #[test]
    fn test_parent_node_id_without_index_is_ordinary() {
        let events = vec![
            event("a", &[]),
            event("b", &["a"]),
            event("b", &["a"]).with_data(json!({"parentNodeId": "b"})),
        ];
        let forest = build_execution_tree(&events);

        assert_eq!(count_nodes(&forest), 3);
        let ids: Vec<&str> = forest[0].children().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["b_1", "b_2"]);
        assert!(!forest[0].children()[1].is_iteration());
    }

    #[test]
    fn test_nested_loops() {
        let events = vec![
            event("outer", &[]),
            event("inner", &["outer"]).in_iteration("outer", 0),
            event("x", &["inner"]).in_iteration("inner", 0),
            event("x", &["inner"]).in_iteration("inner", 1),
        ];
        let forest = build_execution_tree(&events);

        let outer_pass = find_node(&forest, "outer_iteration_0").unwrap();
        assert_eq!(outer_pass.children()[0].id(), "inner_1");

        let inner = &outer_pass.children()[0];
        let ids: Vec<&str> = inner.children().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["inner_iteration_0", "inner_iteration_1"]);
        assert_eq!(inner.children()[1].children()[0].id(), "x_3");
    }

    #[test]
    fn test_iteration_without_loop_node_is_root() {
        let events = vec![
            event("a", &[]).in_iteration("ghost", 0),
            event("b", &["a"]).in_iteration("ghost", 0),
        ];
        let forest = build_execution_tree(&events);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id(), "ghost_iteration_0");
        assert!(forest[0].is_virtual());
    }

    #[test]
    fn test_colliding_synthesized_ids_are_suffixed() {
        let events = vec![
            event("p_iteration", &[]),
            event("m", &[]).in_iteration("p", 0),
        ];
        let forest = build_execution_tree(&events);
        assert_eq!(forest[0].id(), "p_iteration_0");
        assert_eq!(forest[1].id(), "p_iteration_0#1");
    }

    #[test]
    fn test_serialized_shape() {
        let forest = build_execution_tree(&loop_run());
        let value = serde_json::to_value(&forest).unwrap();
        let pass = &value[0]["children"][0]["children"][0];
        assert_eq!(pass["kind"], "iteration");
        assert_eq!(pass["label"], "Iteration #0");
        assert_eq!(pass["children"][0]["kind"], "execution");
        assert_eq!(pass["children"][0]["iteration"]["parentNodeId"], "loop");
    }
}

mod completeness_tests {
    use super::*;

    #[test]
    fn test_every_event_appears_once() {
        let malformed = ExecutionEvent {
            previous_node_ids: vec!["a".to_string()],
            ..Default::default()
        };
        let logs = vec![
            loop_run(),
            vec![event("a", &[]), event("a", &["a"]), event("a", &["a"])],
            vec![event("a", &["missing"]), malformed, event("b", &["a"])],
            vec![
                event("q", &[]).in_iteration("p", 0),
                event("p", &["q"]).in_iteration("q", 0),
            ],
            vec![
                event("outer", &[]),
                event("inner", &["outer"]).in_iteration("outer", 0),
                event("x", &["inner"]).in_iteration("inner", 0),
                event("inner", &["outer"]).in_iteration("outer", 1),
                event("x", &["inner"]).in_iteration("inner", 1),
            ],
        ];

        for events in logs {
            let forest = build_execution_tree(&events);
            let expected: Vec<usize> = (0..events.len()).collect();
            assert_eq!(event_positions(&forest), expected);
        }
    }

    #[test]
    fn test_iteration_children_precede_others() {
        let mut events = loop_run();
        events.push(event("loop", &["end"]));
        events.push(event("c", &["loop"]).in_iteration("loop", 2));
        events.push(event("tail", &["loop"]));

        let forest = build_execution_tree(&events);
        assert_loop_content_first(&forest);
    }

    #[test]
    fn test_node_count_includes_virtual_nodes() {
        let forest = build_execution_tree(&loop_run());
        assert_eq!(count_nodes(&forest), 9);
    }
}

mod status_tests {
    use super::*;

    fn pass_status(statuses: [ExecutionState; 2]) -> Option<ExecutionState> {
        let events = vec![
            event("loop", &[]),
            event_with_status("a", &["loop"], statuses[0]).in_iteration("loop", 0),
            event_with_status("b", &["a"], statuses[1]).in_iteration("loop", 0),
        ];
        let forest = build_execution_tree(&events);
        find_node(&forest, "loop_iteration_0").unwrap().status()
    }

    #[test]
    fn test_iteration_status_derivation() {
        assert_eq!(pass_status([Finished, Finished]), Some(Finished));
        assert_eq!(pass_status([Finished, Error]), Some(Error));
        assert_eq!(pass_status([Finished, Inprogress]), Some(Inprogress));
        assert_eq!(pass_status([Finished, Stopped]), None);
    }

    #[test]
    fn test_iteration_status_of_empty_pass_is_undecided() {
        assert_eq!(derive_iteration_status(Vec::new()), None);
        assert_eq!(derive_iteration_status([None, Some(Finished)]), None);
    }

    #[test]
    fn test_run_status() {
        let forest = build_execution_tree(&loop_run());
        assert_eq!(run_status(&forest), Some(Finished));

        let stopped = build_execution_tree(&[
            event("a", &[]),
            event_with_status("b", &["a"], Stopped),
        ]);
        assert_eq!(run_status(&stopped), Some(Stopped));

        let failed = build_execution_tree(&[
            event_with_status("a", &[], Error),
            event_with_status("b", &["a"], Inprogress),
        ]);
        assert_eq!(run_status(&failed), Some(Error));
    }

    #[test]
    fn test_custom_credential_key_in_payloads() {
        let events = vec![event("a", &[]).with_data(json!({
            "apiKeyRef": "secret",
            "output": {"text": "ok", "apiKeyRef": "nested"}
        }))];
        let forest = ExecutionTreeBuilder::new()
            .with_credential_key("apiKeyRef")
            .build(&events);
        let TreeNode::Execution(node) = &forest[0] else {
            panic!("expected execution node");
        };
        assert_eq!(node.data, json!({"output": {"text": "ok"}}));
    }
}
