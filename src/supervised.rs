//! Supervised access: hold off on a deferred value that recently failed.

use crate::attempt::Attempt;
use crate::clock::{Clock, MonotonicClock};
use crate::deferred::Deferred;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Default quiet period after a failure.
pub const DEFAULT_SUPERVISED_RETRY_DELAY: Duration = Duration::from_millis(250);

const NEVER_FAILED: u64 = u64::MAX;

/// Protects a deferred value from being hammered after it fails.
///
/// After a failure (or a call to [`resource_no_longer_available`]) `get` answers `NotYet`
/// without touching the wrapped deferred until the retry delay has passed. Calls to the wrapped
/// deferred are serialized.
///
/// [`resource_no_longer_available`]: Supervised::resource_no_longer_available
pub struct Supervised<D> {
    deferred: D,
    retry_delay: Duration,
    clock: Arc<dyn Clock>,
    last_failure: AtomicU64,
    access: Mutex<()>,
}

impl<D> Supervised<D> {
    pub fn new(deferred: D) -> Self {
        Self {
            deferred,
            retry_delay: DEFAULT_SUPERVISED_RETRY_DELAY,
            clock: Arc::new(MonotonicClock::default()),
            last_failure: AtomicU64::new(NEVER_FAILED),
            access: Mutex::new(()),
        }
    }

    /// Set the quiet period after a failure.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Provide a custom clock implementation.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn deferred(&self) -> &D {
        &self.deferred
    }

    /// Whether a `get` would currently reach the wrapped deferred.
    pub fn is_accessible(&self) -> bool {
        let last = self.last_failure.load(Ordering::Acquire);
        if last == NEVER_FAILED {
            return true;
        }
        let delay = u64::try_from(self.retry_delay.as_millis()).unwrap_or(u64::MAX);
        self.clock.now_millis() > last.saturating_add(delay)
    }

    /// Record that a previously acquired value is no longer usable.
    pub fn resource_no_longer_available(&self) {
        self.last_failure.store(self.clock.now_millis(), Ordering::Release);
    }
}

impl<D: Deferred> Deferred for Supervised<D> {
    type Output = D::Output;

    fn get(&self) -> Attempt<D::Output> {
        if !self.is_accessible() {
            return Attempt::NotYet;
        }
        let _access = self.access.lock().unwrap_or_else(PoisonError::into_inner);
        // another caller may have failed while we waited for access
        if !self.is_accessible() {
            return Attempt::NotYet;
        }
        let attempt = self.deferred.get();
        if let Attempt::Failed(e) = &attempt {
            tracing::debug!(deferred = %self.deferred.describe(), error = %e, "supervised access failed");
            self.resource_no_longer_available();
        }
        attempt
    }

    fn output_type(&self) -> &'static str {
        self.deferred.output_type()
    }

    fn describe(&self) -> String {
        format!("Supervised{{{}}}", self.deferred.describe())
    }
}

impl<D: Deferred> fmt::Debug for Supervised<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervised")
            .field("deferred", &self.deferred.describe())
            .field("retry_delay", &self.retry_delay)
            .field("accessible", &self.is_accessible())
            .finish()
    }
}
