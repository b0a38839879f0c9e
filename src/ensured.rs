//! The retry engine: block until a deferred value resolves, or give up.
//!
//! Semantics:
//! - An optional initial delay is taken once; at least one attempt always follows it.
//! - `Ready` returns at once.
//! - A permanent or unsupported failure gives up at once, without sleeping.
//! - `NotYet` and every other failure are retried after the next backoff delay.
//! - Each delay is capped by the maximum polling delay and clamped to the remaining budget.
//! - Only pauses drain the budget. Time spent inside the wrapped `get` is not counted, so a
//!   slow deferred can overrun the budget in wall-clock terms, and a backoff of nothing but
//!   zero delays never exhausts it (a warning is logged once when that happens).
//! - When a bounded budget is exhausted the engine gives up with a permanent failure naming
//!   the wrapped deferred, with [`GaveUp`] as its cause.
//! - A backoff that runs out keeps repeating its last delay (250ms if it never produced one).
//! - An interrupted sleep is a permanent failure.
//!
//! Wrapping an `Ensured` in another `Ensured` targets the innermost deferred directly, so the
//! outer constraint alone applies and timeouts never multiply.
//!
//! Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use eventually::{ensure, from_option, Backoff, TimeoutConstraint};
//!
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = calls.clone();
//! let ready_on_third =
//!     from_option(move || (counter.fetch_add(1, Ordering::SeqCst) >= 2).then_some("up"));
//! let constraint = TimeoutConstraint::builder()
//!     .max_total(Duration::from_secs(1))
//!     .backoff(Backoff::constant(Duration::from_millis(5)))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(ensure(ready_on_third, constraint).unwrap(), "up");
//! assert_eq!(calls.load(Ordering::SeqCst), 3);
//! ```

use crate::attempt::Attempt;
use crate::backoff::DEFAULT_CONSTANT_DELAY;
use crate::constraint::TimeoutConstraint;
use crate::deferred::{Deferred, SharedDeferred};
use crate::error::{DeferredError, GaveUp};
use crate::predicate::DeferredPredicate;
use crate::sleeper::{Sleeper, ThreadSleeper};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// Zero delays drawn under a bounded budget before the busy loop is reported, once.
const ZERO_DELAYS_BEFORE_WARNING: usize = 8;

/// A deferred value whose `get` blocks until the value resolves or the constraint gives up.
pub struct Ensured<T> {
    deferred: SharedDeferred<T>,
    constraint: TimeoutConstraint,
    sleeper: Arc<dyn Sleeper>,
}

impl<T> Clone for Ensured<T> {
    fn clone(&self) -> Self {
        Self {
            deferred: self.deferred.clone(),
            constraint: self.constraint.clone(),
            sleeper: self.sleeper.clone(),
        }
    }
}

impl<T: 'static> Ensured<T> {
    /// Wait for `deferred` under `constraint`.
    ///
    /// If `deferred` is itself an `Ensured`, its target is used instead and its constraint
    /// is dropped.
    pub fn new<D>(deferred: D, constraint: TimeoutConstraint) -> Self
    where
        D: Deferred<Output = T> + Send + Sync + 'static,
    {
        Self { deferred: innermost(deferred), constraint, sleeper: Arc::new(ThreadSleeper) }
    }
}

fn innermost<T, D>(deferred: D) -> SharedDeferred<T>
where
    T: 'static,
    D: Deferred<Output = T> + Send + Sync + 'static,
{
    match deferred.ensured_target() {
        Some(target) => target,
        None => Arc::new(deferred),
    }
}

impl<T> Ensured<T> {
    /// Use a custom sleeper (useful for tests).
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// The deferred value being waited for.
    pub fn deferred(&self) -> &SharedDeferred<T> {
        &self.deferred
    }

    pub fn constraint(&self) -> &TimeoutConstraint {
        &self.constraint
    }

    /// Block until the value resolves or the constraint gives up.
    pub fn resolve(&self) -> Result<T, DeferredError> {
        let target = self.deferred.describe();
        let mut budget = Budget::new(self.constraint.max_total());

        let initial = budget.clamp(self.constraint.initial_delay());
        if !initial.is_zero() {
            self.pause(&target, initial)?;
            budget.spend(initial);
        }

        let mut delays = self.constraint.backoff().delays();
        let mut last_delay = None;
        let mut attempts = 0_usize;
        let mut last_failure = None;
        let mut zero_delays = 0_usize;

        loop {
            attempts += 1;

            match self.deferred.get() {
                Attempt::Ready(value) => {
                    if attempts > 1 {
                        tracing::debug!(
                            deferred = %target,
                            attempts,
                            waited = ?budget.spent,
                            "resolved"
                        );
                    }
                    return Ok(value);
                }
                Attempt::Failed(e) if e.is_permanent() => {
                    tracing::warn!(
                        deferred = %target,
                        attempts,
                        error = %e,
                        "giving up on permanent failure"
                    );
                    return Err(e.into_permanent(target));
                }
                Attempt::Failed(e) => {
                    tracing::debug!(
                        deferred = %target,
                        attempt = attempts,
                        remaining = ?budget.remaining,
                        error = %e,
                        "attempt failed"
                    );
                    last_failure = Some(e);
                }
                Attempt::NotYet => {
                    tracing::trace!(deferred = %target, attempt = attempts, "not yet available");
                    last_failure = None;
                }
            }

            if budget.is_exhausted() {
                tracing::warn!(
                    deferred = %target,
                    attempts,
                    waited = ?budget.spent,
                    "retry budget exhausted"
                );
                let cause = GaveUp { attempts, waited: budget.spent, last_failure };
                return Err(DeferredError::permanent_with(target, cause));
            }

            let next = match delays.next() {
                Some(delay) => {
                    last_delay = Some(delay);
                    delay
                }
                None => last_delay.unwrap_or(DEFAULT_CONSTANT_DELAY),
            };
            let capped = match self.constraint.max_polling() {
                Some(cap) => next.min(cap),
                None => next,
            };
            let delay = budget.clamp(capped);

            if delay.is_zero() && budget.remaining.is_some() {
                zero_delays += 1;
                if zero_delays == ZERO_DELAYS_BEFORE_WARNING {
                    tracing::warn!(
                        deferred = %target,
                        attempts,
                        "backoff keeps yielding zero delays; the retry budget will not run down"
                    );
                }
            }

            tracing::trace!(deferred = %target, ?delay, "waiting before next attempt");
            self.pause(&target, delay)?;
            budget.spend(delay);
        }
    }

    fn pause(&self, target: &str, delay: Duration) -> Result<(), DeferredError> {
        self.sleeper.sleep(delay).map_err(|interrupted| {
            tracing::warn!(deferred = %target, error = %interrupted, "wait interrupted");
            DeferredError::permanent_with(target, interrupted)
        })
    }
}

#[derive(Debug)]
struct Budget {
    remaining: Option<Duration>,
    spent: Duration,
}

impl Budget {
    fn new(max_total: Option<Duration>) -> Self {
        Self { remaining: max_total, spent: Duration::ZERO }
    }

    fn clamp(&self, delay: Duration) -> Duration {
        match self.remaining {
            Some(remaining) => delay.min(remaining),
            None => delay,
        }
    }

    fn spend(&mut self, slept: Duration) {
        self.spent = self.spent.saturating_add(slept);
        self.remaining = self.remaining.map(|remaining| remaining.saturating_sub(slept));
    }

    fn is_exhausted(&self) -> bool {
        self.remaining.is_some_and(|remaining| remaining.is_zero())
    }
}

impl<T> Deferred for Ensured<T> {
    type Output = T;

    fn get(&self) -> Attempt<T> {
        match self.resolve() {
            Ok(value) => Attempt::Ready(value),
            Err(e) => Attempt::Failed(e),
        }
    }

    fn output_type(&self) -> &'static str {
        self.deferred.output_type()
    }

    fn describe(&self) -> String {
        format!("Ensured{{{}}}", self.deferred.describe())
    }

    fn ensured_target(&self) -> Option<SharedDeferred<T>> {
        Some(self.deferred.clone())
    }
}

impl<T> fmt::Debug for Ensured<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ensured")
            .field("deferred", &self.deferred.describe())
            .field("constraint", &self.constraint)
            .field("sleeper", &self.sleeper)
            .finish()
    }
}

/// Block until `deferred` resolves under `constraint`.
pub fn ensure<T, D>(deferred: D, constraint: TimeoutConstraint) -> Result<T, DeferredError>
where
    T: 'static,
    D: Deferred<Output = T> + Send + Sync + 'static,
{
    Ensured::new(deferred, constraint).resolve()
}

/// Block until the value of `deferred` satisfies `predicate` under `constraint`.
pub fn ensure_that<D, P>(
    deferred: D,
    predicate: P,
    constraint: TimeoutConstraint,
) -> Result<bool, DeferredError>
where
    D: Deferred + Send + Sync + 'static,
    D::Output: fmt::Debug + Send,
    P: Fn(&D::Output) -> bool + Send + Sync + 'static,
{
    ensure(DeferredPredicate::new(deferred, predicate), constraint)
}
