//! Criterion benchmarks for http_input_logger

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use http_input_logger::prelude::*;
use http_input_logger::{BatchBuffer, MemoryTransport};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn listener(count: usize) -> HttpInputListener {
    HttpInputListener::builder()
        .uri("http://localhost:8088")
        .token("TOKEN")
        .max_batch_count(count)
        .max_batch_interval(Duration::from_millis(100))
        .max_queue_size(0)
        .index("main")
        .transport(MemoryTransport::new())
        .build()
        .unwrap()
}

// ============================================================================
// Send Path Benchmarks
// ============================================================================

fn bench_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("send");
    group.throughput(Throughput::Elements(1));

    let batched = listener(100);
    group.bench_function("batched", |b| {
        b.iter(|| batched.send(black_box(Severity::Error), black_box(123), black_box("Test error")));
    });

    let immediate = listener(1);
    group.bench_function("immediate", |b| {
        b.iter(|| immediate.send(black_box(Severity::Error), black_box(123), black_box("Test error")));
    });

    group.bench_function("with_fields", |b| {
        b.iter(|| {
            let event = Event::new(Severity::Information, "login", "user logged in")
                .with_field("user", "alice")
                .with_field("attempt", 3)
                .with_field("latency_ms", 12.5);
            batched.send_event(black_box(event));
        });
    });

    group.finish();
}

fn bench_concurrent_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_send");
    group.throughput(Throughput::Elements(400));

    let shared = Arc::new(listener(100));
    group.bench_function("threads_4", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let listener = Arc::clone(&shared);
                    thread::spawn(move || {
                        for n in 0..100 {
                            listener.send(Severity::Verbose, t * 100 + n, "concurrent");
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    });

    group.finish();
}

// ============================================================================
// Batching Benchmarks
// ============================================================================

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");
    group.throughput(Throughput::Elements(1));

    let tags = MetadataTags::new()
        .with_index("main")
        .with_source("localhost")
        .with_sourcetype("log");
    let event = Event::new(Severity::Error, 123, "Test error").with_field("user", "alice");

    group.bench_function("record", |b| {
        b.iter(|| http_input_logger::core::serialize(black_box(&event), black_box(&tags)));
    });

    group.finish();
}

fn bench_batch_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_buffer");
    group.throughput(Throughput::Elements(1000));

    let record = br#"{"time":"1700000000","event":{"id":"1","severity":"Information","message":"x"}}"#;
    group.bench_function("push_1000", |b| {
        b.iter_batched(
            || BatchBuffer::new(BatchConfig::default()),
            |mut buffer| {
                let mut sealed = 0;
                for _ in 0..1000 {
                    sealed += buffer.push(record.to_vec()).len();
                }
                black_box(sealed)
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_send,
    bench_concurrent_send,
    bench_serialize,
    bench_batch_buffer
);

criterion_main!(benches);
