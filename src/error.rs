//! Failure taxonomy for deferred values.
//!
//! Every failure names the deferred value it came from (its [`describe`] text) so that a
//! caller waiting on a deeply nested combinator still sees what was actually awaited.
//!
//! Classification:
//! - `PermanentlyUnavailable` and `Unsupported` stop any retry loop immediately.
//! - `TemporarilyUnavailable`, `Unresolvable` and `Unexpected` are retryable.
//!
//! [`describe`]: crate::Deferred::describe

use std::time::Duration;

/// Boxed error used as the cause of a failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a [`DeferredError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Will never become available.
    Permanent,
    /// Not available yet.
    Transient,
    /// A condition was evaluated and not satisfied.
    Unresolvable,
    /// The requested operation can never succeed.
    Unsupported,
    /// Any other error raised while resolving.
    Unexpected,
}

impl FailureKind {
    /// Whether a retry loop should try again after a failure of this kind.
    pub fn is_retryable(self) -> bool {
        !matches!(self, FailureKind::Permanent | FailureKind::Unsupported)
    }
}

/// Failure raised while resolving a deferred value.
#[derive(thiserror::Error, Debug)]
pub enum DeferredError {
    /// The value will never become available; retrying is pointless.
    #[error("{deferred} is permanently unavailable")]
    PermanentlyUnavailable {
        deferred: String,
        #[source]
        source: Option<BoxError>,
    },
    /// The value is not available yet.
    #[error("{deferred} is temporarily unavailable")]
    TemporarilyUnavailable {
        deferred: String,
        #[source]
        source: Option<BoxError>,
    },
    /// A value was resolved but did not satisfy the required condition.
    #[error("{deferred} did not satisfy its condition (last value: {last_value})")]
    Unresolvable { deferred: String, last_value: String },
    /// The deferred value does not support the requested operation.
    #[error("{deferred} does not support {operation}")]
    Unsupported { deferred: String, operation: String },
    /// Some other error occurred; treated as transient.
    #[error("{deferred} failed: {source}")]
    Unexpected {
        deferred: String,
        #[source]
        source: BoxError,
    },
}

impl DeferredError {
    pub fn permanent(deferred: impl Into<String>) -> Self {
        Self::PermanentlyUnavailable { deferred: deferred.into(), source: None }
    }

    pub fn permanent_with(deferred: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::PermanentlyUnavailable { deferred: deferred.into(), source: Some(cause.into()) }
    }

    pub fn transient(deferred: impl Into<String>) -> Self {
        Self::TemporarilyUnavailable { deferred: deferred.into(), source: None }
    }

    pub fn transient_with(deferred: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::TemporarilyUnavailable { deferred: deferred.into(), source: Some(cause.into()) }
    }

    pub fn unresolvable(deferred: impl Into<String>, last_value: impl Into<String>) -> Self {
        Self::Unresolvable { deferred: deferred.into(), last_value: last_value.into() }
    }

    pub fn unsupported(deferred: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported { deferred: deferred.into(), operation: operation.into() }
    }

    pub fn unexpected(deferred: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::Unexpected { deferred: deferred.into(), source: cause.into() }
    }

    /// Classify this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::PermanentlyUnavailable { .. } => FailureKind::Permanent,
            Self::TemporarilyUnavailable { .. } => FailureKind::Transient,
            Self::Unresolvable { .. } => FailureKind::Unresolvable,
            Self::Unsupported { .. } => FailureKind::Unsupported,
            Self::Unexpected { .. } => FailureKind::Unexpected,
        }
    }

    /// Check if a retry loop must stop on this failure.
    pub fn is_permanent(&self) -> bool {
        !self.kind().is_retryable()
    }

    /// Check if a retry loop may try again after this failure.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Description of the deferred value that failed.
    pub fn deferred(&self) -> &str {
        match self {
            Self::PermanentlyUnavailable { deferred, .. }
            | Self::TemporarilyUnavailable { deferred, .. }
            | Self::Unresolvable { deferred, .. }
            | Self::Unsupported { deferred, .. }
            | Self::Unexpected { deferred, .. } => deferred,
        }
    }

    /// Rendering of the last value checked, for `Unresolvable` failures.
    pub fn last_value(&self) -> Option<&str> {
        match self {
            Self::Unresolvable { last_value, .. } => Some(last_value),
            _ => None,
        }
    }

    /// Convert into a permanent failure for `deferred`, keeping `self` as the cause.
    ///
    /// Permanent failures are returned unchanged.
    pub fn into_permanent(self, deferred: impl Into<String>) -> Self {
        match self {
            Self::PermanentlyUnavailable { .. } => self,
            other => Self::permanent_with(deferred, other),
        }
    }
}

/// Cause attached to the permanent failure produced when a retry budget runs out.
#[derive(thiserror::Error, Debug)]
#[error("gave up after {attempts} attempts and {waited:?} of waiting")]
pub struct GaveUp {
    pub attempts: usize,
    pub waited: Duration,
    #[source]
    pub last_failure: Option<DeferredError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn kinds_classify_retryability() {
        assert!(!FailureKind::Permanent.is_retryable());
        assert!(!FailureKind::Unsupported.is_retryable());
        assert!(FailureKind::Transient.is_retryable());
        assert!(FailureKind::Unresolvable.is_retryable());
        assert!(FailureKind::Unexpected.is_retryable());
    }

    #[test]
    fn display_names_the_deferred() {
        let err = DeferredError::permanent("Deferred<u32>");
        assert_eq!(err.to_string(), "Deferred<u32> is permanently unavailable");

        let err = DeferredError::unresolvable("port 8080", "false");
        let msg = err.to_string();
        assert!(msg.contains("port 8080"));
        assert!(msg.contains("last value: false"));
        assert_eq!(err.last_value(), Some("false"));
    }

    #[test]
    fn unexpected_keeps_source() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err = DeferredError::unexpected("socket", io_err);
        assert_eq!(err.kind(), FailureKind::Unexpected);
        assert!(err.is_retryable());
        assert_eq!(err.source().map(|e| e.to_string()), Some("refused".to_string()));
    }

    #[test]
    fn into_permanent_wraps_other_kinds() {
        let err = DeferredError::unsupported("Existing<String>", "release").into_permanent("outer");
        assert!(err.is_permanent());
        assert_eq!(err.deferred(), "outer");
        let cause = err.source().expect("cause retained");
        assert!(cause.to_string().contains("does not support release"));
    }

    #[test]
    fn into_permanent_keeps_permanent_unchanged() {
        let err = DeferredError::permanent("inner").into_permanent("outer");
        assert_eq!(err.deferred(), "inner");
    }

    #[test]
    fn gave_up_chains_last_failure() {
        let gave_up = GaveUp {
            attempts: 6,
            waited: Duration::from_millis(500),
            last_failure: Some(DeferredError::transient("svc")),
        };
        let err = DeferredError::permanent_with("svc", gave_up);
        let cause = err.source().expect("gave up cause");
        assert!(cause.to_string().contains("6 attempts"));
        let root = cause.source().expect("last failure");
        assert!(root.to_string().contains("temporarily unavailable"));
    }
}
