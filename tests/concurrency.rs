mod common;

use common::{constant, ready_on, sequence};
use eventually::{Cached, Deferred, DeferredExt, ManualClock, Supervised};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn cached_populates_once_under_contention() {
    let (calls, deferred) = sequence();
    let cached = Arc::new(Cached::new(deferred));
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cached = cached.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                cached.get().into_ready()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(1));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cached.release();
    assert_eq!(cached.get().into_ready(), Some(2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn concurrent_waits_share_one_constraint() {
    let constraint = constant(Duration::from_secs(5), Duration::from_millis(2));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let constraint = constraint.clone();
            thread::spawn(move || {
                let (_, deferred) = ready_on(3 + i);
                deferred.ensured(constraint).resolve()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap().unwrap(), 3 + i);
    }
}

#[test]
fn supervised_shields_a_failing_resource() {
    let clock = ManualClock::new();
    let (calls, deferred) = ready_on(3);
    let supervised = Arc::new(
        Supervised::new(deferred)
            .with_retry_delay(Duration::from_millis(100))
            .with_clock(clock.clone()),
    );

    let hammering: Vec<_> = (0..8)
        .map(|_| {
            let supervised = supervised.clone();
            thread::spawn(move || supervised.get().is_ready())
        })
        .collect();
    for handle in hammering {
        assert!(!handle.join().unwrap());
    }
    // one failure opens the quiet period for everybody
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_millis(101));
    assert!(!supervised.get().is_ready());
    clock.advance(Duration::from_millis(101));
    assert_eq!(supervised.get().into_ready(), Some(3));
}
