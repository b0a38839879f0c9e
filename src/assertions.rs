//! "Eventually", "repetitively" and "concurrently" assertions built on the retry engine.
//!
//! Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use eventually::{eventually, from_fn, Attempt, Backoff, TimeoutConstraint};
//!
//! let counter = Arc::new(AtomicUsize::new(0));
//! let seen = counter.clone();
//! let deferred = from_fn(move || Attempt::Ready(seen.fetch_add(1, Ordering::SeqCst)));
//! let constraint = TimeoutConstraint::builder()
//!     .max_total(Duration::from_secs(1))
//!     .backoff(Backoff::constant(Duration::from_millis(1)))
//!     .build()
//!     .unwrap();
//!
//! eventually(deferred, |n| *n >= 3, constraint).unwrap();
//! ```

use crate::attempt::Attempt;
use crate::backoff::DEFAULT_CONSTANT_DELAY;
use crate::config::DeferredConfig;
use crate::constraint::TimeoutConstraint;
use crate::deferred::Deferred;
use crate::ensured::ensure_that;
use crate::error::DeferredError;
use crate::sleeper::{InterruptibleSleeper, Sleeper, ThreadSleeper};
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// A failed assertion.
#[derive(thiserror::Error, Debug)]
pub enum AssertionFailure {
    /// No value could be obtained.
    #[error("Failed to resolve a value for [{deferred}]")]
    Unresolved {
        deferred: String,
        #[source]
        source: DeferredError,
    },
    /// A value was obtained but did not satisfy the predicate.
    #[error("[{deferred}] failed to match last resolved value [{last_value}]")]
    Mismatch {
        deferred: String,
        last_value: String,
        #[source]
        source: DeferredError,
    },
}

impl AssertionFailure {
    pub fn deferred(&self) -> &str {
        match self {
            Self::Unresolved { deferred, .. } | Self::Mismatch { deferred, .. } => deferred,
        }
    }

    /// Rendering of the last value the predicate rejected, if any.
    pub fn last_value(&self) -> Option<&str> {
        match self {
            Self::Mismatch { last_value, .. } => Some(last_value),
            Self::Unresolved { .. } => None,
        }
    }
}

// Rendering carried by the closest unresolvable failure in the cause chain.
fn last_rejected(err: &DeferredError) -> Option<String> {
    let mut current: Option<&(dyn Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(value) = e.downcast_ref::<DeferredError>().and_then(DeferredError::last_value) {
            return Some(value.to_string());
        }
        current = e.source();
    }
    None
}

/// Assert that the value of `deferred` satisfies `predicate` before `constraint` gives up.
pub fn eventually<D, P>(
    deferred: D,
    predicate: P,
    constraint: TimeoutConstraint,
) -> Result<(), AssertionFailure>
where
    D: Deferred + Send + Sync + 'static,
    D::Output: fmt::Debug + Send,
    P: Fn(&D::Output) -> bool + Send + Sync + 'static,
{
    let described = deferred.describe();
    match ensure_that(deferred, predicate, constraint) {
        Ok(_) => Ok(()),
        Err(source) => Err(match last_rejected(&source) {
            Some(last_value) => AssertionFailure::Mismatch { deferred: described, last_value, source },
            None => AssertionFailure::Unresolved { deferred: described, source },
        }),
    }
}

/// Assert that every value of `deferred` satisfies `predicate` for the whole duration of
/// `constraint`.
///
/// Waits out the constraint's initial delay, then polls on its backoff until its maximum
/// duration has passed (an unbounded constraint uses the process default retry timeout).
/// Transient failures are skipped; the first rejected value, a permanent failure, or never
/// seeing a value at all fails the assertion.
pub fn repetitively<D, P>(
    deferred: D,
    predicate: P,
    constraint: TimeoutConstraint,
) -> Result<(), AssertionFailure>
where
    D: Deferred,
    D::Output: fmt::Debug,
    P: Fn(&D::Output) -> bool,
{
    repetitively_with(deferred, predicate, constraint, &ThreadSleeper)
}

/// [`repetitively`] waiting through `sleeper`.
///
/// The window closes once either the wall clock or the total requested sleep reaches the
/// constraint's maximum, so a non-blocking sleeper still ends the assertion. An interrupted
/// wait fails it as unresolved.
pub fn repetitively_with<D, P>(
    deferred: D,
    predicate: P,
    constraint: TimeoutConstraint,
    sleeper: &dyn Sleeper,
) -> Result<(), AssertionFailure>
where
    D: Deferred,
    D::Output: fmt::Debug,
    P: Fn(&D::Output) -> bool,
{
    let described = deferred.describe();
    let window = constraint.max_total().unwrap_or(DeferredConfig::global().retry_timeout);
    let started = Instant::now();
    let mut waited = Duration::ZERO;

    let initial = constraint.initial_delay().min(window);
    if !initial.is_zero() {
        pause(sleeper, &described, initial)?;
        waited += initial;
    }

    let mut delays = constraint.backoff().delays();
    let mut last_delay = None;
    let mut matched = 0_usize;

    loop {
        match deferred.get() {
            Attempt::Ready(value) if predicate(&value) => matched += 1,
            Attempt::Ready(value) => {
                let last_value = format!("{:?}", value);
                tracing::debug!(deferred = %described, %last_value, matched, "value stopped matching");
                let source = DeferredError::unresolvable(described.clone(), last_value.clone());
                return Err(AssertionFailure::Mismatch { deferred: described, last_value, source });
            }
            Attempt::Failed(e) if e.is_permanent() => {
                return Err(AssertionFailure::Unresolved { deferred: described, source: e });
            }
            Attempt::Failed(_) | Attempt::NotYet => {}
        }

        let elapsed = started.elapsed().max(waited);
        if elapsed >= window {
            if matched == 0 {
                let source = DeferredError::transient(described.clone());
                return Err(AssertionFailure::Unresolved { deferred: described, source });
            }
            return Ok(());
        }

        let next = match delays.next() {
            Some(delay) => {
                last_delay = Some(delay);
                delay
            }
            None => last_delay.unwrap_or(DEFAULT_CONSTANT_DELAY),
        };
        let capped = constraint.max_polling().map_or(next, |cap| next.min(cap));
        let delay = capped.min(window - elapsed);
        pause(sleeper, &described, delay)?;
        waited += delay;
    }
}

fn pause(sleeper: &dyn Sleeper, described: &str, delay: Duration) -> Result<(), AssertionFailure> {
    sleeper.sleep(delay).map_err(|interrupted| AssertionFailure::Unresolved {
        deferred: described.to_string(),
        source: DeferredError::permanent_with(described, interrupted),
    })
}

#[derive(Debug, Default)]
struct Shared {
    failure: Mutex<Option<AssertionFailure>>,
    closing: AtomicBool,
    finished: AtomicBool,
}

impl Shared {
    fn take_failure(&self) -> Option<AssertionFailure> {
        self.failure.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// A [`repetitively`] assertion running on a background thread while the caller carries on.
///
/// The assertion restarts every time its window passes cleanly, until it fails or is closed.
/// A failure is reported once, by whichever of [`check`](Self::check) or
/// [`close`](Self::close) sees it first. Dropping the assertion stops the thread and discards
/// any unreported failure.
#[derive(Debug)]
pub struct ConcurrentAssertion {
    described: String,
    shared: Arc<Shared>,
    sleeper: InterruptibleSleeper,
    worker: Option<JoinHandle<()>>,
}

impl ConcurrentAssertion {
    /// Description of the deferred being asserted on.
    pub fn deferred(&self) -> &str {
        &self.described
    }

    /// Report a failure seen on the background thread so far.
    pub fn check(&self) -> Result<(), AssertionFailure> {
        match self.shared.take_failure() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    /// Whether the background thread has stopped, after a failure or a close.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::SeqCst)
    }

    /// Stop the background thread and report a failure nobody has checked yet.
    pub fn close(mut self) -> Result<(), AssertionFailure> {
        self.stop();
        self.check()
    }

    fn stop(&mut self) {
        self.shared.closing.store(true, Ordering::SeqCst);
        self.sleeper.interrupt();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!(deferred = %self.described, "concurrent assertion panicked");
            }
        }
    }
}

impl Drop for ConcurrentAssertion {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Keep asserting, on a background thread, that every value of `deferred` satisfies
/// `predicate`.
///
/// Each round behaves like [`repetitively`] under `constraint`. Closing interrupts the
/// current wait; that interruption is not a failure.
pub fn concurrently<D, P>(
    deferred: D,
    predicate: P,
    constraint: TimeoutConstraint,
) -> ConcurrentAssertion
where
    D: Deferred + Send + 'static,
    D::Output: fmt::Debug,
    P: Fn(&D::Output) -> bool + Send + 'static,
{
    let described = deferred.describe();
    let shared = Arc::new(Shared::default());
    let sleeper = InterruptibleSleeper::new();

    let worker = {
        let shared = shared.clone();
        let sleeper = sleeper.clone();
        std::thread::spawn(move || {
            while !shared.closing.load(Ordering::SeqCst) {
                let round = repetitively_with(&deferred, &predicate, constraint.clone(), &sleeper);
                if let Err(failure) = round {
                    if !shared.closing.load(Ordering::SeqCst) {
                        tracing::debug!(
                            deferred = %failure.deferred(),
                            error = %failure,
                            "concurrent assertion failed"
                        );
                        *shared.failure.lock().unwrap_or_else(PoisonError::into_inner) =
                            Some(failure);
                    }
                    break;
                }
            }
            shared.finished.store(true, Ordering::SeqCst);
        })
    };

    ConcurrentAssertion { described, shared, sleeper, worker: Some(worker) }
}
