//! Chaos tests
//!
//! Listeners that randomly cancel, fail, panic or stall, and adapters that
//! randomly fail. The interceptor must keep answering every hook call.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use packet_intercept::config::InterceptorConfig;
use packet_intercept::core::FaultPolicy;
use packet_intercept::error::InterceptError;
use packet_intercept::prelude::*;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Adapter that fails a fraction of attach / detach calls
struct FlakyAdapter {
    failure_rate: f32,
    calls: AtomicU64,
}

impl TransportAdapter<u64> for FlakyAdapter {
    fn name(&self) -> &str {
        "flaky"
    }

    fn attach(&self, _connection: &u64) -> packet_intercept::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if rand::rng().random::<f32>() < self.failure_rate {
            return Err(InterceptError::AdapterFailed {
                adapter: "flaky".into(),
                message: "pipeline already closed".into(),
            });
        }
        Ok(())
    }

    fn detach(&self, _connection: &u64) -> packet_intercept::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if rand::rng().random::<f32>() < self.failure_rate {
            panic!("detach on a dead channel");
        }
        Ok(())
    }
}

fn flaky(failure_rate: f32) -> FlakyAdapter {
    FlakyAdapter {
        failure_rate,
        calls: AtomicU64::new(0),
    }
}

/// What a chaotic listener decided for a packet, encoded in the packet itself
fn fate(packet: u64) -> u64 {
    packet % 4
}

const PASS: u64 = 0;
const CANCEL: u64 = 1;
const FAIL: u64 = 2;
const PANIC: u64 = 3;

fn chaotic_interceptor(policy: FaultPolicy) -> Interceptor<u64, u64> {
    let config = InterceptorConfig::default_with_overrides(|c| {
        c.worker.fault_policy = policy;
    });
    let interceptor = Interceptor::builder(ActiveTransport::select(
        TransportMode::Modern,
        flaky(0.0),
        flaky(0.0),
    ))
    .config(config)
    .build()
    .unwrap();

    interceptor
        .register_listener(
            on_receive(|e: &mut PacketReceiveEvent<u64, u64>| match fate(*e.packet()) {
                CANCEL => {
                    e.cancel();
                    Ok(())
                }
                FAIL => Err(InterceptError::Custom("rejected".into())),
                PANIC => panic!("listener blew up on {}", e.packet()),
                _ => Ok(()),
            }),
            Priority::Normal,
        )
        .unwrap();

    interceptor
}

#[test]
#[serial_test::serial]
fn test_random_listener_faults_drop_policy() {
    let interceptor = chaotic_interceptor(FaultPolicy::Drop);
    let mut rng = rand::rng();

    let mut expected_faults = 0;
    for _ in 0..2_000 {
        let packet: u64 = rng.random();
        let verdict = interceptor.read(&7, packet);

        match fate(packet) {
            PASS => assert_eq!(verdict, Verdict::Forward(packet)),
            CANCEL => assert!(verdict.is_drop()),
            FAIL | PANIC => {
                expected_faults += 1;
                assert!(verdict.is_drop());
            }
            _ => unreachable!(),
        }
    }

    assert_eq!(interceptor.metrics().listener_faults, expected_faults);
    // Worker is still alive
    assert_eq!(interceptor.read(&7, 4), Verdict::Forward(4));
}

#[test]
#[serial_test::serial]
fn test_random_listener_faults_forward_policy() {
    let interceptor = chaotic_interceptor(FaultPolicy::Forward);
    let mut rng = rand::rng();

    for _ in 0..2_000 {
        let packet: u64 = rng.random();
        let verdict = interceptor.read(&7, packet);

        if fate(packet) == CANCEL {
            assert!(verdict.is_drop());
        } else {
            assert_eq!(verdict, Verdict::Forward(packet));
        }
    }
}

#[test]
#[serial_test::serial]
fn test_flaky_adapter_never_escapes() {
    let adapter = Arc::new(flaky(0.5));

    struct Shared(Arc<FlakyAdapter>);

    impl TransportAdapter<u64> for Shared {
        fn name(&self) -> &str {
            self.0.name()
        }

        fn attach(&self, connection: &u64) -> packet_intercept::Result<()> {
            self.0.attach(connection)
        }

        fn detach(&self, connection: &u64) -> packet_intercept::Result<()> {
            self.0.detach(connection)
        }
    }

    let interceptor: Interceptor<u64, u64> = Interceptor::builder(ActiveTransport::select(
        TransportMode::Legacy,
        Shared(Arc::clone(&adapter)),
        flaky(0.0),
    ))
    .build()
    .unwrap();

    let mut failed = 0;
    for c in 0..200u64 {
        for outcome in [interceptor.inject_player(&c), interceptor.eject_player(&c)] {
            match outcome {
                LifecycleOutcome::Applied => {}
                LifecycleOutcome::Failed(err) => {
                    assert!(err.is_adapter_fault(), "unexpected error: {err}");
                    failed += 1;
                }
                LifecycleOutcome::Cancelled => panic!("nothing cancels here"),
            }
        }
    }

    assert_eq!(adapter.calls.load(Ordering::SeqCst), 400);
    let snap = interceptor.metrics();
    assert_eq!(snap.injections_failed + snap.ejections_failed, failed);
    assert!(failed > 0);
}

#[test]
#[serial_test::serial]
fn test_stalled_listener_times_out_then_recovers() {
    let config = InterceptorConfig::default_with_overrides(|c| {
        c.worker.verdict_timeout = Duration::from_millis(50);
    });
    let interceptor: Interceptor<u64, u64> = Interceptor::builder(ActiveTransport::select(
        TransportMode::Modern,
        flaky(0.0),
        flaky(0.0),
    ))
    .config(config)
    .build()
    .unwrap();

    interceptor
        .register_listener(
            on_send(|e: &mut PacketSendEvent<u64, u64>| {
                if *e.packet() == 0 {
                    thread::sleep(Duration::from_millis(300));
                }
                Ok(())
            }),
            Priority::Normal,
        )
        .unwrap();

    assert!(interceptor.write(&1, 0).is_drop());
    assert_eq!(interceptor.metrics().verdict_timeouts, 1);

    // Let the stalled event drain before checking recovery
    thread::sleep(Duration::from_millis(400));
    assert_eq!(interceptor.write(&1, 5), Verdict::Forward(5));

    let snap = interceptor.metrics();
    assert_eq!(snap.packets_dropped, 1);
    assert_eq!(snap.packets_forwarded, 1);
}

#[test]
#[serial_test::serial]
fn test_burst_behind_slow_listener_is_not_dropped() {
    let config = InterceptorConfig::default_with_overrides(|c| {
        c.worker.verdict_timeout = Duration::from_millis(100);
    });
    let interceptor: Interceptor<u64, u64> = Interceptor::builder(ActiveTransport::select(
        TransportMode::Modern,
        flaky(0.0),
        flaky(0.0),
    ))
    .config(config)
    .build()
    .unwrap();

    interceptor
        .register_listener(
            on_send(|_e: &mut PacketSendEvent<u64, u64>| {
                thread::sleep(Duration::from_millis(30));
                Ok(())
            }),
            Priority::Normal,
        )
        .unwrap();

    // Each packet is well inside the timeout, the whole burst is not
    let handles: Vec<_> = (0..10u64)
        .map(|conn| {
            let interceptor = interceptor.clone();
            thread::spawn(move || interceptor.write(&conn, conn))
        })
        .collect();

    for (conn, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Verdict::Forward(conn as u64));
    }

    let snap = interceptor.metrics();
    assert_eq!(snap.verdict_timeouts, 0);
    assert_eq!(snap.packets_forwarded, 10);
    assert_eq!(snap.packets_dropped, 0);
}
