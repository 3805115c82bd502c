//! Integration tests for the single-worker scheduler.
//!
//! Exercises the public contract on its own, without the stores:
//! strict FIFO execution, join-drains semantics, idle-timeout termination,
//! and containment of panicking actions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use anticipator::config::EngineConfig;
use anticipator::core::{EngineError, Scheduler};

fn config(idle_ms: u64) -> EngineConfig {
    EngineConfig::new()
        .with_idle_timeout_ms(idle_ms)
        .with_worker_thread_name("scheduler-test-worker")
}

/// Actions submitted from one thread run in exactly that order.
#[test]
fn test_fifo_order_for_one_producer() {
    let scheduler = Scheduler::new(&config(300)).expect("scheduler start");
    let log = Arc::new(Mutex::new(Vec::new()));

    for i in 0..100 {
        let log = Arc::clone(&log);
        scheduler.schedule(move || log.lock().push(i)).expect("schedule");
    }
    scheduler.join();

    assert_eq!(*log.lock(), (0..100).collect::<Vec<_>>());
}

/// Join returns only after every previously scheduled action completed.
#[test]
fn test_join_waits_for_all_actions() {
    let scheduler = Scheduler::new(&config(300)).expect("scheduler start");
    let count = Arc::new(AtomicUsize::new(0));

    for _ in 0..200 {
        let count = Arc::clone(&count);
        scheduler
            .schedule(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
            .expect("schedule");
    }
    scheduler.join();

    assert_eq!(count.load(Ordering::SeqCst), 200);
    let stats = scheduler.stats();
    assert_eq!(stats.scheduled_actions, 200);
    assert_eq!(stats.executed_actions, 200);
}

/// Join does not wait out the idle window once the queue is drained.
#[test]
fn test_join_returns_before_idle_window() {
    let scheduler = Scheduler::new(&config(10_000)).expect("scheduler start");
    scheduler.schedule(|| {}).expect("schedule");

    let started = Instant::now();
    scheduler.join();
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// With no work inside the idle window, the worker exits on its own and the
/// scheduler rejects later submissions.
#[test]
fn test_idle_worker_exits_and_rejects() {
    let scheduler = Scheduler::new(&config(50)).expect("scheduler start");
    thread::sleep(Duration::from_millis(400));

    let err = scheduler.schedule(|| {}).expect_err("stopped scheduler rejects");
    assert!(matches!(err, EngineError::SchedulerStopped(_)));

    // Join after an idle exit returns immediately.
    let started = Instant::now();
    scheduler.join();
    assert!(started.elapsed() < Duration::from_secs(1));
}

/// A panicking action is contained: later actions still run.
#[test]
fn test_panicking_action_is_contained() {
    let scheduler = Scheduler::new(&config(300)).expect("scheduler start");
    let count = Arc::new(AtomicUsize::new(0));

    for i in 0..10 {
        let count = Arc::clone(&count);
        scheduler
            .schedule(move || {
                assert!(i != 4, "synthetic failure");
                count.fetch_add(1, Ordering::SeqCst);
            })
            .expect("schedule");
    }
    scheduler.join();

    assert_eq!(count.load(Ordering::SeqCst), 9);
    let stats = scheduler.stats();
    assert_eq!(stats.panicked_actions, 1);
    assert_eq!(stats.executed_actions, 9);
}

/// Racing producers all land; total execution count is exact.
#[test]
fn test_concurrent_producers() {
    let scheduler = Arc::new(Scheduler::new(&config(300)).expect("scheduler start"));
    let count = Arc::new(AtomicUsize::new(0));

    let mut handles = vec![];
    for _ in 0..8 {
        let scheduler = Arc::clone(&scheduler);
        let count = Arc::clone(&count);
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                let count = Arc::clone(&count);
                scheduler
                    .schedule(move || {
                        count.fetch_add(1, Ordering::SeqCst);
                    })
                    .expect("schedule");
            }
        }));
    }
    for handle in handles {
        handle.join().expect("producer thread");
    }
    scheduler.join();

    assert_eq!(count.load(Ordering::SeqCst), 400);
}
