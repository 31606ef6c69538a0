//! Property-based tests for the machine engine and the node tree.
//!
//! These use proptest to verify structural properties across many randomly
//! generated inputs: report shape, exit-set algebra, lifecycle determinism,
//! replay semantics, and deep-snapshot flattening.

use proptest::prelude::*;
use serde_json::json;
use treestate::tree::StatusGate;
use treestate::{Exits, Machine, Node, NodeStatus, Relay, StateSel, TransitionError};

prop_compose! {
    fn state_names()(raw in prop::collection::vec("[a-z]{1,6}", 1..6)) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in raw {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

prop_compose! {
    fn arbitrary_status()(variant in 0..4u8) -> NodeStatus {
        match variant {
            0 => NodeStatus::New,
            1 => NodeStatus::Active,
            2 => NodeStatus::Transacting,
            _ => NodeStatus::Closed,
        }
    }
}

proptest! {
    #[test]
    fn fresh_machines_report_a_square_all_true_matrix(names in state_names()) {
        let machine = Machine::new("m", names.clone(), &names[0]).unwrap();
        let report = machine.report();

        prop_assert_eq!(&report.states, &names);
        prop_assert_eq!(report.matrix.len(), names.len());
        for row in &report.matrix {
            prop_assert_eq!(row.len(), names.len());
            prop_assert!(row.iter().all(|reachable| *reachable));
        }
    }

    #[test]
    fn blocking_everything_clears_the_report(names in state_names()) {
        let machine = Machine::new("m", names.clone(), &names[0]).unwrap();
        machine.block(StateSel::All, StateSel::All).unwrap();

        let report = machine.report();
        for row in &report.matrix {
            prop_assert!(row.iter().all(|reachable| !*reachable));
        }
    }

    #[test]
    fn allowing_one_target_yields_exactly_one_true_column(names in state_names()) {
        let target = names[names.len() - 1].clone();
        let machine = Machine::new("m", names.clone(), &names[0]).unwrap();
        machine.block(StateSel::All, StateSel::All).unwrap();
        machine.allow(StateSel::All, target.as_str()).unwrap();

        let report = machine.report();
        for from in &names {
            for to in &names {
                prop_assert_eq!(report.can(from, to), Some(*to == target));
            }
        }
    }

    #[test]
    fn go_only_succeeds_into_declared_states(names in state_names(), probe in "[a-z]{1,6}") {
        let machine = Machine::new("m", names.clone(), &names[0]).unwrap();
        let outcome = machine.go(&probe);

        if names.contains(&probe) {
            prop_assert!(outcome.is_ok());
            prop_assert_eq!(machine.state(), probe);
        } else {
            prop_assert_eq!(outcome.unwrap_err(), TransitionError::UnknownState {
                name: "m".to_string(),
                state: probe,
            });
            prop_assert_eq!(machine.state(), names[0].clone());
        }
    }

    #[test]
    fn exit_sets_contain_what_they_allow(name in "[a-z]{1,6}", other in "[A-Z]{1,6}") {
        let mut exits: Exits<String> = Exits::none();
        exits.allow(name.clone());

        prop_assert!(exits.contains(&name));
        prop_assert!(!exits.contains(&other));

        exits.block(&name, &[name.clone()]);
        prop_assert!(!exits.contains(&name));
    }

    #[test]
    fn status_gate_checks_are_deterministic(target in arbitrary_status()) {
        let gate = StatusGate::new();
        prop_assert_eq!(gate.can_go(target), gate.can_go(target));
    }

    #[test]
    fn closed_gates_permit_nothing(target in arbitrary_status()) {
        let mut gate = StatusGate::new();
        gate.go(NodeStatus::Closed).unwrap();
        prop_assert!(!gate.can_go(target));
    }

    #[test]
    fn relays_replay_exactly_the_last_emission(values in prop::collection::vec(any::<i64>(), 1..10)) {
        let relay: Relay<i64, String> = Relay::new();
        for value in &values {
            relay.emit(*value);
        }

        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);
        let _sub = relay.subscribe(move |v: &i64| sink.lock().unwrap().push(*v));

        prop_assert_eq!(&*seen.lock().unwrap(), &vec![values[values.len() - 1]]);
    }

    #[test]
    fn leaf_sets_are_observable_in_order(values in prop::collection::vec(any::<i64>(), 1..8)) {
        let node = Node::leaf("n", json!(values[0])).unwrap();
        for value in &values[1..] {
            node.set(json!(value)).unwrap();
        }
        prop_assert_eq!(node.value(), Some(json!(values[values.len() - 1])));
    }

    #[test]
    fn branch_snapshots_cover_every_child(names in state_names()) {
        let node = Node::new("root").unwrap();
        for (index, name) in names.iter().enumerate() {
            node.add_child(name, json!(index)).unwrap();
        }

        let snapshot = node.values();
        let object = snapshot.as_object().unwrap();
        prop_assert_eq!(object.len(), names.len());
        for (index, name) in names.iter().enumerate() {
            prop_assert_eq!(object.get(name), Some(&json!(index)));
        }
    }
}
