use criterion::{black_box, criterion_group, criterion_main, Criterion};
use packet_intercept::prelude::*;
use std::sync::Arc;

struct Noop;

impl TransportAdapter<u32> for Noop {
    fn name(&self) -> &str {
        "noop"
    }

    fn attach(&self, _connection: &u32) -> packet_intercept::Result<()> {
        Ok(())
    }

    fn detach(&self, _connection: &u32) -> packet_intercept::Result<()> {
        Ok(())
    }
}

#[allow(clippy::unwrap_used)]
fn bench_listener_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("listener_chain");

    for &count in &[1usize, 8, 64] {
        let dispatcher: Arc<EventDispatcher<u32, u64>> = Arc::new(EventDispatcher::new());
        for i in 0..count {
            let priority = match i % 3 {
                0 => Priority::Low,
                1 => Priority::Normal,
                _ => Priority::High,
            };
            dispatcher
                .register(
                    on_inject(|e: &mut InjectEvent<u32>| {
                        black_box(e.connection());
                        Ok(())
                    }),
                    priority,
                )
                .unwrap();
        }

        let interceptor: Interceptor<u32, u64> =
            Interceptor::builder(ActiveTransport::select(TransportMode::Modern, Noop, Noop))
                .dispatcher(dispatcher)
                .build()
                .unwrap();

        group.bench_function(format!("inject_{count}_listeners"), |b| {
            b.iter(|| interceptor.inject_player(black_box(&3)))
        });
    }

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_register_unregister(c: &mut Criterion) {
    let dispatcher: EventDispatcher<u32, u64> = EventDispatcher::new();
    for _ in 0..32 {
        dispatcher
            .register(
                on_send(|_e: &mut PacketSendEvent<u32, u64>| Ok(())),
                Priority::Normal,
            )
            .unwrap();
    }

    c.bench_function("register_unregister_32", |b| {
        b.iter(|| {
            let id = dispatcher
                .register(
                    on_receive(|_e: &mut PacketReceiveEvent<u32, u64>| Ok(())),
                    Priority::Monitor,
                )
                .unwrap();
            dispatcher.unregister(id).unwrap()
        })
    });
}

criterion_group!(benches, bench_listener_chain, bench_register_unregister);
criterion_main!(benches);
