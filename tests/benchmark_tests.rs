//! Performance benchmarks for the hot paths of the sequence server

use server::store::SessionStore;
use server::ClientId;
use shared::{parse_command, parse_commands, Counter, ProgressionSet};
use std::time::Instant;

/// Benchmarks counter advancement
#[test]
fn benchmark_counter_advance() {
    let mut counter = Counter::new(1, 3).unwrap();

    let iterations = 1_000_000u64;
    let start = Instant::now();

    for _ in 0..iterations {
        counter.advance();
    }

    let duration = start.elapsed();
    println!(
        "Counter advance: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert_eq!(counter.value(), 1 + 3 * iterations);
    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks rendering a full progression set, as done once per export tick
#[test]
fn benchmark_render_and_advance() {
    let mut set = ProgressionSet::new();
    set.set_slot(1, 1, 1);
    set.set_slot(2, 1_000_000, 7);
    set.set_slot(3, u32::MAX, u32::MAX);

    let iterations = 100_000;
    let start = Instant::now();
    let mut total_len = 0;

    for _ in 0..iterations {
        total_len += set.render().len();
        set.advance_all();
    }

    let duration = start.elapsed();
    println!(
        "Render + advance: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(total_len > 0);
    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks command parsing
#[test]
fn benchmark_command_parsing() {
    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let line = format!("seq{} {} {}\r\n", i % 3 + 1, i + 1, i % 7 + 1);
        assert!(parse_command(&line).is_ok());
    }

    let duration = start.elapsed();
    println!(
        "Command parsing: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks splitting a full receive buffer into commands
#[test]
fn benchmark_buffer_splitting() {
    let buffer = b"seq1 10 5\r\nseq2 20 10\r\nseq3 30 15\r\nexport seq\r\n";

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        assert_eq!(parse_commands(buffer).len(), 4);
    }

    let duration = start.elapsed();
    println!(
        "Buffer splitting: {} iterations in {:?}",
        iterations, duration
    );

    assert!(duration.as_millis() < 1000);
}

/// Benchmarks store access from many concurrent tasks
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn benchmark_store_contention() {
    let store = std::sync::Arc::new(SessionStore::new());

    let tasks = 8u64;
    let operations = 5_000u32;
    let start = Instant::now();

    let mut handles = Vec::new();
    for task in 0..tasks {
        let store = std::sync::Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let id = ClientId(task);
            for op in 1..=operations {
                store.configure(id, (op % 3 + 1) as u8, op, 1).await;
                let _ = store.snapshot(id).await;
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Store contention: {} operations in {:?}",
        tasks * u64::from(operations) * 2,
        duration
    );

    assert_eq!(store.len().await, tasks as usize);
    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}
