//! Result of a single attempt to resolve a deferred value.

use crate::error::DeferredError;

/// Outcome of one call to [`Deferred::get`](crate::Deferred::get).
///
/// `NotYet` is the lightweight "try again later" signal; it carries no diagnostics and costs
/// nothing to produce. Failures carry a [`DeferredError`] whose kind decides whether a retry
/// loop keeps going.
#[derive(Debug)]
#[must_use]
pub enum Attempt<T> {
    /// The value resolved.
    Ready(T),
    /// Not available yet, no further information.
    NotYet,
    /// Resolution failed.
    Failed(DeferredError),
}

impl<T> Attempt<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Attempt::Ready(_))
    }

    /// True when a retry loop must stop without retrying.
    pub fn is_permanent_failure(&self) -> bool {
        matches!(self, Attempt::Failed(e) if e.is_permanent())
    }

    /// Map the resolved value, leaving other outcomes untouched.
    pub fn map<U, F>(self, f: F) -> Attempt<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Attempt::Ready(value) => Attempt::Ready(f(value)),
            Attempt::NotYet => Attempt::NotYet,
            Attempt::Failed(e) => Attempt::Failed(e),
        }
    }

    /// Chain a further attempt on the resolved value.
    pub fn and_then<U, F>(self, f: F) -> Attempt<U>
    where
        F: FnOnce(T) -> Attempt<U>,
    {
        match self {
            Attempt::Ready(value) => f(value),
            Attempt::NotYet => Attempt::NotYet,
            Attempt::Failed(e) => Attempt::Failed(e),
        }
    }

    /// Borrow the resolved value if present.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Attempt::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Extract the resolved value, discarding failure information.
    pub fn into_ready(self) -> Option<T> {
        match self {
            Attempt::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Borrow the failure if present.
    pub fn failure(&self) -> Option<&DeferredError> {
        match self {
            Attempt::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Attempt<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Attempt::Ready(value),
            None => Attempt::NotYet,
        }
    }
}

impl<T> From<Result<T, DeferredError>> for Attempt<T> {
    fn from(value: Result<T, DeferredError>) -> Self {
        match value {
            Ok(value) => Attempt::Ready(value),
            Err(e) => Attempt::Failed(e),
        }
    }
}

impl<T> From<DeferredError> for Attempt<T> {
    fn from(e: DeferredError) -> Self {
        Attempt::Failed(e)
    }
}
