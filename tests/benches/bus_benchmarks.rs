//! # Module Gateway Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Envelope | encode / decode of typical messages |
//! | Bus | publish fan-out to N modules |
//! | Bus | publish to delivery, end to end |

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gateway_bus::{BusConfig, MessageBus};
use gateway_types::{envelope, Message, Module, ModuleHandle, Properties};

/// Counts deliveries and nothing else.
#[derive(Default)]
struct Counter {
    received: AtomicU64,
}

#[async_trait]
impl Module for Counter {
    async fn receive(&self, _message: Arc<Message>) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }
}

fn sample_message(content_len: usize, properties: usize) -> Message {
    let mut props = Properties::new();
    for i in 0..properties {
        props.insert(format!("key-{i}"), format!("value-{i}"));
    }
    Message::new(vec![b'x'; content_len], props)
}

// ============================================================================
// Envelope
// ============================================================================

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");

    for content_len in [16usize, 1024, 64 * 1024] {
        let message = sample_message(content_len, 8);
        let bytes = envelope::encode(&message).expect("encodable");

        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", content_len), &message, |b, m| {
            b.iter(|| black_box(envelope::encode(m).expect("encodable")))
        });
        group.bench_with_input(BenchmarkId::new("decode", content_len), &bytes, |b, raw| {
            b.iter(|| black_box(envelope::decode(raw).expect("decodable")))
        });
    }

    group.finish();
}

// ============================================================================
// Bus
// ============================================================================

fn bench_publish_fanout(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("bus-publish");
    group.measurement_time(Duration::from_secs(5));

    for modules in [1usize, 4, 16] {
        let bus = MessageBus::with_config(BusConfig {
            queue_capacity: 1 << 16,
            ..Default::default()
        });
        {
            let _guard = runtime.enter();
            for _ in 0..modules {
                bus.add_module(ModuleHandle::new(), Arc::new(Counter::default()))
                    .expect("attach");
            }
        }
        let message = Arc::new(sample_message(256, 4));
        let source = ModuleHandle::new();

        group.throughput(Throughput::Elements(modules as u64));
        group.bench_with_input(BenchmarkId::new("fanout", modules), &modules, |b, _| {
            b.iter(|| black_box(bus.publish_shared(source, Arc::clone(&message))))
        });

        runtime.block_on(bus.shutdown());
    }

    group.finish();
}

fn bench_publish_to_delivery(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("bus-delivery");

    let bus = MessageBus::new();
    let counter = Arc::new(Counter::default());
    {
        let _guard = runtime.enter();
        bus.add_module(ModuleHandle::new(), counter.clone())
            .expect("attach");
    }
    let source = ModuleHandle::new();

    group.bench_function("round_trip_single", |b| {
        b.to_async(&runtime).iter(|| {
            let bus = bus.clone();
            let counter = Arc::clone(&counter);
            async move {
                let target = counter.received.load(Ordering::Relaxed) + 1;
                bus.publish(source, Message::from_text("ping", Properties::new()))
                    .expect("publish");
                while counter.received.load(Ordering::Relaxed) < target {
                    tokio::task::yield_now().await;
                }
            }
        })
    });

    runtime.block_on(bus.shutdown());
    group.finish();
}

criterion_group!(
    benches,
    bench_envelope,
    bench_publish_fanout,
    bench_publish_to_delivery
);
criterion_main!(benches);
