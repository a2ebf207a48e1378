//! Stress tests for concurrent shipping and queue overflow
//!
//! These tests verify:
//! - Every event from many concurrent senders is shipped exactly once
//! - Overflow under a slow endpoint drops instead of blocking
//! - Overflow callbacks see the running drop count

use http_input_logger::prelude::*;
use http_input_logger::MemoryTransport;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const THREADS: usize = 8;
const EVENTS_PER_THREAD: usize = 500;

/// Every event sent from many threads arrives exactly once
#[test]
fn test_concurrent_senders_lose_nothing() {
    let transport = Arc::new(MemoryTransport::new());
    let listener = Arc::new(
        HttpInputListener::builder()
            .uri("http://localhost:8088")
            .token("TOKEN")
            .max_batch_count(64)
            .max_batch_interval(Duration::from_millis(20))
            .max_queue_size(0)
            .transport(Arc::clone(&transport))
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let listener = Arc::clone(&listener);
            thread::spawn(move || {
                for n in 0..EVENTS_PER_THREAD {
                    let event = Event::new(Severity::Verbose, n as i64, "stress")
                        .with_field("thread", t as i64);
                    listener.send_event(event);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut listener = Arc::try_unwrap(listener).ok().unwrap();
    assert!(listener.shutdown(Duration::from_secs(10)));

    let records = transport.records();
    assert_eq!(records.len(), THREADS * EVENTS_PER_THREAD);
    assert_eq!(listener.metrics().events_dropped(), 0);

    let mut seen: HashMap<i64, Vec<i64>> = HashMap::new();
    for record in &records {
        let thread = record["event"]["thread"].as_i64().unwrap();
        let id: i64 = record["event"]["id"].as_str().unwrap().parse().unwrap();
        seen.entry(thread).or_default().push(id);
    }
    assert_eq!(seen.len(), THREADS);
    for ids in seen.values_mut() {
        ids.sort_unstable();
        assert_eq!(*ids, (0..EVENTS_PER_THREAD as i64).collect::<Vec<_>>());
    }
}

/// A slow endpoint causes drops, never blocked callers
#[test]
fn test_slow_endpoint_sheds_oldest() {
    let transport = Arc::new(MemoryTransport::new().with_latency(Duration::from_millis(50)));
    let notified = Arc::new(AtomicU64::new(0));
    let notified_clone = Arc::clone(&notified);

    let mut listener = HttpInputListener::builder()
        .uri("http://localhost:8088")
        .token("TOKEN")
        .max_batch_count(10)
        .max_batch_interval(Duration::from_secs(60))
        .max_queue_size(2)
        .overflow_policy(OverflowPolicy::DropOldest)
        .on_overflow(Arc::new(move |dropped| {
            notified_clone.store(dropped, Ordering::SeqCst);
        }))
        .transport(Arc::clone(&transport))
        .build()
        .unwrap();

    let start = Instant::now();
    for n in 0..2_000 {
        listener.send(Severity::Information, n, "burst");
    }
    assert!(start.elapsed() < Duration::from_secs(1));

    assert!(listener.shutdown(Duration::from_secs(5)));

    let metrics = listener.metrics();
    assert!(metrics.events_dropped() > 0);
    assert!(notified.load(Ordering::SeqCst) > 0);
    assert_eq!(
        metrics.events_dropped() + metrics.events_delivered(),
        metrics.events_enqueued()
    );

    // the newest batch is never the one shed
    let records = transport.records();
    assert_eq!(records.last().unwrap()["event"]["id"], "1999");
}

/// Drop-newest keeps what is already queued
#[test]
fn test_slow_endpoint_sheds_newest() {
    let transport = Arc::new(MemoryTransport::new().with_latency(Duration::from_millis(50)));
    let mut listener = HttpInputListener::builder()
        .uri("http://localhost:8088")
        .token("TOKEN")
        .max_batch_count(10)
        .max_batch_interval(Duration::from_secs(60))
        .max_queue_size(2)
        .overflow_policy(OverflowPolicy::DropNewest)
        .transport(Arc::clone(&transport))
        .build()
        .unwrap();

    for n in 0..2_000 {
        listener.send(Severity::Information, n, "burst");
    }
    assert!(listener.shutdown(Duration::from_secs(5)));

    let metrics = listener.metrics();
    assert!(metrics.events_dropped() > 0);
    assert_eq!(
        metrics.events_dropped() + metrics.events_delivered(),
        metrics.events_enqueued()
    );
    let records = transport.records();
    assert_eq!(records.first().unwrap()["event"]["id"], "0");
}

/// Repeated transient failures under load still terminate within the timeout
#[test]
fn test_flaky_endpoint_under_load() {
    let transport = Arc::new(MemoryTransport::new());
    for _ in 0..20 {
        transport.push_status(503);
        transport.push_status(200);
    }

    let mut listener = HttpInputListener::builder()
        .uri("http://localhost:8088")
        .token("TOKEN")
        .max_batch_count(25)
        .max_batch_interval(Duration::from_millis(10))
        .retry(RetryConfig {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
            jitter: true,
        })
        .transport(Arc::clone(&transport))
        .build()
        .unwrap();

    for n in 0..1_000 {
        listener.send(Severity::Information, n, "flaky");
    }

    assert!(listener.shutdown(Duration::from_secs(10)));
    assert_eq!(listener.metrics().events_delivered(), 1_000);
    assert!(listener.metrics().retries() > 0);
}
