//! How long, and how often, to keep asking for a deferred value.
//!
//! A [`TimeoutConstraint`] is immutable and cheap to clone. The backoff inside it is a factory,
//! so one constraint can drive any number of concurrent blocking calls.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use eventually::{Backoff, TimeoutConstraint};
//!
//! let constraint = TimeoutConstraint::builder()
//!     .max_total(Duration::from_secs(5))
//!     .initial_delay(Duration::from_millis(50))
//!     .backoff(Backoff::constant(Duration::from_millis(100)))
//!     .build()
//!     .unwrap();
//! assert_eq!(constraint.max_total(), Some(Duration::from_secs(5)));
//! ```

use crate::backoff::Backoff;
use crate::config::DeferredConfig;
use std::time::Duration;

/// Errors produced while building a constraint.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A zero polling cap would never wait between attempts.
    #[error("maximum polling delay must be > 0")]
    ZeroMaxPolling,
}

/// Limits applied by [`Ensured`](crate::Ensured) while waiting for a value.
#[derive(Debug, Clone)]
pub struct TimeoutConstraint {
    initial_delay: Duration,
    max_total: Option<Duration>,
    max_polling: Option<Duration>,
    backoff: Backoff,
}

impl TimeoutConstraint {
    /// Give up after `max_total`, using the process default backoff and polling cap.
    pub fn within(max_total: Duration) -> Self {
        Self { max_total: Some(max_total), ..Self::from_config(DeferredConfig::global()) }
    }

    /// Never give up on transient failures, using the process default backoff and polling cap.
    pub fn unbounded() -> Self {
        Self { max_total: None, ..Self::from_config(DeferredConfig::global()) }
    }

    /// Constraint described by `config`.
    pub fn from_config(config: &DeferredConfig) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_total: Some(config.retry_timeout),
            max_polling: Some(config.maximum_polling),
            backoff: config.backoff(),
        }
    }

    /// Builder starting from the process defaults.
    pub fn builder() -> TimeoutConstraintBuilder {
        TimeoutConstraintBuilder::new()
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Maximum time spent waiting; `None` means unbounded.
    pub fn max_total(&self) -> Option<Duration> {
        self.max_total
    }

    /// Cap on any single delay between attempts.
    pub fn max_polling(&self) -> Option<Duration> {
        self.max_polling
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn is_bounded(&self) -> bool {
        self.max_total.is_some()
    }
}

impl Default for TimeoutConstraint {
    fn default() -> Self {
        Self::from_config(DeferredConfig::global())
    }
}

/// Builder for [`TimeoutConstraint`].
#[derive(Debug, Clone)]
pub struct TimeoutConstraintBuilder {
    inner: TimeoutConstraint,
}

impl TimeoutConstraintBuilder {
    /// Create a builder with the process defaults.
    pub fn new() -> Self {
        Self { inner: TimeoutConstraint::default() }
    }

    /// Start from `config` instead of the process defaults.
    pub fn from_config(config: &DeferredConfig) -> Self {
        Self { inner: TimeoutConstraint::from_config(config) }
    }

    /// Wait once before the first attempt.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.inner.initial_delay = delay;
        self
    }

    /// Give up after `max_total` of waiting.
    pub fn max_total(mut self, max_total: Duration) -> Self {
        self.inner.max_total = Some(max_total);
        self
    }

    /// Never give up on transient failures.
    pub fn unbounded(mut self) -> Self {
        self.inner.max_total = None;
        self
    }

    /// Cap every delay between attempts. Must be > 0.
    pub fn max_polling(mut self, max_polling: Duration) -> Self {
        self.inner.max_polling = Some(max_polling);
        self
    }

    /// Use the backoff delays as they are.
    pub fn no_max_polling(mut self) -> Self {
        self.inner.max_polling = None;
        self
    }

    /// Set backoff strategy.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.inner.backoff = backoff;
        self
    }

    /// Validate and build the constraint.
    pub fn build(self) -> Result<TimeoutConstraint, BuildError> {
        if self.inner.max_polling == Some(Duration::ZERO) {
            return Err(BuildError::ZeroMaxPolling);
        }
        Ok(self.inner)
    }
}

impl Default for TimeoutConstraintBuilder {
    fn default() -> Self {
        Self::new()
    }
}
