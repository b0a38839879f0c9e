//! Convenient re-exports for common types.
pub use crate::{
    assertions::{concurrently, eventually, repetitively},
    attempt::Attempt,
    backoff::Backoff,
    constraint::TimeoutConstraint,
    deferred::Deferred,
    ensured::{ensure, ensure_that, Ensured},
    error::{DeferredError, FailureKind},
    existing::Existing,
    ext::DeferredExt,
    from_fn::{from_fn, from_option, from_result},
    future::future,
    jitter::Jitter,
};
