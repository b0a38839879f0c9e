#![allow(dead_code)]

use eventually::{from_fn, Attempt, Backoff, Deferred, DeferredError, TimeoutConstraint};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Bounded constraint with a constant delay and no polling cap.
pub fn constant(max_total: Duration, every: Duration) -> TimeoutConstraint {
    TimeoutConstraint::builder()
        .max_total(max_total)
        .backoff(Backoff::constant(every))
        .no_max_polling()
        .build()
        .expect("valid constraint")
}

/// Deferred counting its calls; transiently unavailable until call `ready_on`.
pub fn ready_on(
    ready_on: usize,
) -> (Arc<AtomicUsize>, impl Deferred<Output = usize> + Send + Sync + 'static) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let deferred = from_fn(move || {
        let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= ready_on {
            Attempt::Ready(call)
        } else {
            Attempt::Failed(DeferredError::transient("service"))
        }
    })
    .named("service");
    (calls, deferred)
}

/// Deferred yielding 1, 2, 3, … on successive calls.
pub fn sequence() -> (Arc<AtomicUsize>, impl Deferred<Output = usize> + Send + Sync + 'static) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let deferred = from_fn(move || Attempt::Ready(counter.fetch_add(1, Ordering::SeqCst) + 1))
        .named("sequence");
    (calls, deferred)
}
