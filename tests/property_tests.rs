//! Property-based tests using proptest
//!
//! Verdicts must follow the final cancellation state of the event, listeners
//! must run in priority order, and every packet gets the next sequence number.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use packet_intercept::prelude::*;
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

struct Noop;

impl TransportAdapter<u8> for Noop {
    fn name(&self) -> &str {
        "noop"
    }

    fn attach(&self, _connection: &u8) -> packet_intercept::Result<()> {
        Ok(())
    }

    fn detach(&self, _connection: &u8) -> packet_intercept::Result<()> {
        Ok(())
    }
}

fn interceptor() -> Interceptor<u8, Vec<u8>> {
    Interceptor::builder(ActiveTransport::select(TransportMode::Modern, Noop, Noop))
        .build()
        .unwrap()
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Nothing,
    Cancel,
    Uncancel,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Nothing),
        Just(Action::Cancel),
        Just(Action::Uncancel),
    ]
}

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Lowest),
        Just(Priority::Low),
        Just(Priority::Normal),
        Just(Priority::High),
        Just(Priority::Highest),
        Just(Priority::Monitor),
    ]
}

// Property: the packet comes back untouched unless the last word was a cancel
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_verdict_follows_final_cancel_state(
        payload in prop::collection::vec(any::<u8>(), 0..512),
        actions in prop::collection::vec(action(), 0..6),
    ) {
        let interceptor = interceptor();
        for &act in &actions {
            interceptor
                .register_listener(
                    on_send(move |e: &mut PacketSendEvent<u8, Vec<u8>>| {
                        match act {
                            Action::Nothing => {}
                            Action::Cancel => e.set_cancelled(true),
                            Action::Uncancel => e.set_cancelled(false),
                        }
                        Ok(())
                    }),
                    Priority::Normal,
                )
                .unwrap();
        }

        let cancelled = actions.iter().fold(false, |state, act| match act {
            Action::Nothing => state,
            Action::Cancel => true,
            Action::Uncancel => false,
        });

        let verdict = interceptor.write(&0, payload.clone());
        if cancelled {
            prop_assert!(verdict.is_drop());
        } else {
            prop_assert_eq!(verdict, Verdict::Forward(payload));
        }
    }
}

// Property: delivery order is by priority, then by registration
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_listeners_run_in_priority_order(priorities in prop::collection::vec(priority(), 1..12)) {
        let interceptor = interceptor();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (idx, &prio) in priorities.iter().enumerate() {
            let order = Arc::clone(&order);
            interceptor
                .register_listener(
                    on_receive(move |_e: &mut PacketReceiveEvent<u8, Vec<u8>>| {
                        order.lock().unwrap().push(idx);
                        Ok(())
                    }),
                    prio,
                )
                .unwrap();
        }

        prop_assert!(interceptor.read(&0, vec![1]).is_forward());

        let mut expected: Vec<usize> = (0..priorities.len()).collect();
        expected.sort_by_key(|&i| priorities[i]);
        prop_assert_eq!(order.lock().unwrap().clone(), expected);
    }
}

// Property: every packet event gets the next sequence number
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_sequence_numbers_are_dense(directions in prop::collection::vec(any::<bool>(), 1..64)) {
        let interceptor = interceptor();
        let seen = Arc::new(Mutex::new(Vec::new()));

        {
            let seen = Arc::clone(&seen);
            interceptor
                .register_listener(
                    on_send(move |e: &mut PacketSendEvent<u8, Vec<u8>>| {
                        seen.lock().unwrap().push(e.sequence());
                        Ok(())
                    }),
                    Priority::Normal,
                )
                .unwrap();
        }
        {
            let seen = Arc::clone(&seen);
            interceptor
                .register_listener(
                    on_receive(move |e: &mut PacketReceiveEvent<u8, Vec<u8>>| {
                        seen.lock().unwrap().push(e.sequence());
                        Ok(())
                    }),
                    Priority::Normal,
                )
                .unwrap();
        }

        for &outbound in &directions {
            let verdict = if outbound {
                interceptor.write(&0, Vec::new())
            } else {
                interceptor.read(&0, Vec::new())
            };
            prop_assert!(verdict.is_forward());
        }

        let expected: Vec<u64> = (0..directions.len() as u64).collect();
        prop_assert_eq!(seen.lock().unwrap().clone(), expected);
    }
}

// Property: ignore_cancelled listeners never see a cancelled event
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_ignore_cancelled_skips_cancelled(cancel_first in any::<bool>()) {
        let interceptor = interceptor();
        let reached = Arc::new(Mutex::new(false));

        interceptor
            .register_listener(
                on_inject(move |e: &mut InjectEvent<u8>| {
                    e.set_cancelled(cancel_first);
                    Ok(())
                }),
                Priority::Low,
            )
            .unwrap();
        {
            let reached = Arc::clone(&reached);
            interceptor
                .register_listener(
                    on_inject(move |_e: &mut InjectEvent<u8>| {
                        *reached.lock().unwrap() = true;
                        Ok(())
                    }),
                    ListenerOptions::new(Priority::High).ignore_cancelled(),
                )
                .unwrap();
        }

        let outcome = interceptor.inject_player(&3);
        prop_assert_eq!(outcome.is_cancelled(), cancel_first);
        prop_assert_eq!(*reached.lock().unwrap(), !cancel_first);
    }
}
