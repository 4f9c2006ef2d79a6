//! Property tests for call list reconciliation
//!
//! Runs random call lists through a CS controller and checks that the table
//! always mirrors the last list, that only calls leaving the list are
//! disconnected, and that repeating a list changes nothing.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use cellular_call_core::prelude::*;
use cellular_call_core::{CallController, CallbackRegistry};
use common::{RecordingTransport, SwitchableCapability};

fn controller() -> CallController<RecordingTransport> {
    CallController::new(
        0,
        RecordingTransport::new(CallType::Cs),
        SwitchableCapability::cs_only(),
        Arc::new(CallbackRegistry::new()),
        6,
    )
}

fn call_state() -> impl Strategy<Value = TelCallState> {
    prop_oneof![
        Just(TelCallState::Active),
        Just(TelCallState::Holding),
        Just(TelCallState::Dialing),
        Just(TelCallState::Alerting),
        Just(TelCallState::Incoming),
        Just(TelCallState::Waiting),
    ]
}

/// Up to six calls with distinct indices in any order. Numbers come from a
/// small pool so calls share numbers, and some carry none.
fn call_list() -> impl Strategy<Value = Vec<ReportedCall>> {
    let number = prop::sample::select(vec!["", "100", "200"]);
    prop::collection::btree_map(1..10i32, (number, call_state()), 0..=6)
        .prop_map(|calls| {
            calls
                .into_iter()
                .map(|(index, (number, state))| ReportedCall::new(index, number, state))
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

/// A list followed by some of its calls, unchanged, in another order
fn list_and_survivors() -> impl Strategy<Value = (Vec<ReportedCall>, Vec<ReportedCall>)> {
    call_list().prop_flat_map(|first| {
        let len = first.len();
        let survivors = prop::sample::subsequence(first.clone(), 0..=len).prop_shuffle();
        (Just(first), survivors)
    })
}

fn indices(calls: &[ReportedCall]) -> BTreeSet<i32> {
    calls.iter().map(|call| call.index).collect()
}

fn tracked(controller: &CallController<RecordingTransport>) -> BTreeSet<i32> {
    controller.table().snapshot().iter().map(|c| c.index).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn table_mirrors_last_list(first in call_list(), second in call_list()) {
        tokio_test::block_on(async {
            let mut controller = controller();

            controller.report_calls_data(&first).await;
            prop_assert_eq!(tracked(&controller), indices(&first));

            let before = controller.table().len();
            let summary = controller.report_calls_data(&second).await;
            prop_assert_eq!(tracked(&controller), indices(&second));
            prop_assert_eq!(controller.table().len(), second.len());
            prop_assert!(controller.table().len() <= 6);

            // every tracked record is either carried over or swept
            prop_assert_eq!(summary.disconnected, before + summary.created - second.len());
            if second.is_empty() {
                prop_assert_eq!(summary.disconnected, before);
            }
            for record in controller.table().iter().map(|(_, record)| record) {
                prop_assert!(!record.seen_in_last_report());
            }
            Ok(())
        })?;
    }

    #[test]
    fn dropped_calls_are_the_only_disconnects((first, survivors) in list_and_survivors()) {
        tokio_test::block_on(async {
            let mut controller = controller();

            controller.report_calls_data(&first).await;
            let summary = controller.report_calls_data(&survivors).await;

            prop_assert_eq!(summary.created, 0, "summary: {:?}", summary);
            prop_assert_eq!(summary.state_changes, 0, "summary: {:?}", summary);
            prop_assert_eq!(summary.disconnected, first.len() - survivors.len());
            prop_assert_eq!(tracked(&controller), indices(&survivors));

            for call in &survivors {
                let record = controller.table().find_by_index(call.index);
                prop_assert_eq!(record.map(|r| r.phone_number()), Some(call.number.as_str()));
                prop_assert_eq!(record.map(|r| r.state()), call.state);
            }
            Ok(())
        })?;
    }

    #[test]
    fn repeating_a_list_is_a_noop(calls in call_list()) {
        tokio_test::block_on(async {
            let mut controller = controller();

            controller.report_calls_data(&calls).await;
            let snapshot = controller.table().snapshot();

            let summary = controller.report_calls_data(&calls).await;
            prop_assert!(summary.is_noop(), "second pass changed the table: {:?}", summary);
            prop_assert_eq!(controller.table().snapshot(), snapshot);
            Ok(())
        })?;
    }
}
