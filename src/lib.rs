#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # eventually
//!
//! Deferred values and a blocking retry engine for "eventually true" checks.
//!
//! A [`Deferred`] is a value of a known type that may not exist yet: each `get` makes one
//! attempt and answers [`Attempt::Ready`], [`Attempt::NotYet`] or [`Attempt::Failed`].
//! [`Ensured`] turns any deferred into one that blocks the calling thread until the value
//! resolves, a permanent failure occurs, or its [`TimeoutConstraint`] runs out.
//!
//! ## Features
//!
//! - **Adapters** for plain values, closures, atomics, monitors and async handles
//! - **Combinators**: memoizing, predicate-gated, mapped, supervised
//! - **Backoff sequences**: constant, fibonacci, exponential, instant schedules, randomized
//! - **Failure taxonomy** deciding retry versus give-up
//! - **Process-wide defaults** read from the environment
//! - **Assertions**: `eventually`, `repetitively` and `concurrently`
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use eventually::{ensure_that, from_atomic_bool, Backoff, TimeoutConstraint};
//!
//! let started = Arc::new(AtomicBool::new(false));
//! let flag = started.clone();
//! std::thread::spawn(move || {
//!     std::thread::sleep(Duration::from_millis(20));
//!     flag.store(true, Ordering::SeqCst);
//! });
//!
//! let constraint = TimeoutConstraint::builder()
//!     .max_total(Duration::from_secs(5))
//!     .backoff(Backoff::constant(Duration::from_millis(5)))
//!     .build()
//!     .unwrap();
//! assert!(ensure_that(from_atomic_bool(started), |up| *up, constraint).unwrap());
//! ```

pub mod assertions;
pub mod attempt;
pub mod backoff;
pub mod cached;
pub mod clock;
pub mod config;
pub mod constraint;
pub mod deferred;
pub mod ensured;
pub mod error;
pub mod existing;
pub mod ext;
pub mod from_fn;
pub mod future;
pub mod jitter;
pub mod mapped;
pub mod notified;
pub mod predicate;
pub mod prelude;
pub mod sleeper;
pub mod supervised;

// Re-exports
pub use assertions::{
    concurrently, eventually, repetitively, repetitively_with, AssertionFailure,
    ConcurrentAssertion,
};
pub use attempt::Attempt;
pub use backoff::{Backoff, BackoffError, BackoffStrategy, Delays, MAX_BACKOFF};
pub use cached::Cached;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{install_global, parse_duration, ConfigError, DeferredConfig, StrategyName};
pub use constraint::{BuildError, TimeoutConstraint, TimeoutConstraintBuilder};
pub use deferred::{Deferred, SharedDeferred};
pub use ensured::{ensure, ensure_that, Ensured};
pub use error::{BoxError, DeferredError, FailureKind, GaveUp};
pub use existing::Existing;
pub use ext::DeferredExt;
pub use from_fn::{
    from_atomic_bool, from_atomic_i64, from_atomic_u64, from_atomic_usize, from_fn, from_option,
    from_result, FromFn, FromResult,
};
pub use future::{future, FutureValue, HandlePoll, PollHandle, PolledFuture, ThreadHandle};
pub use jitter::Jitter;
pub use mapped::{Mapped, TryMapped};
pub use notified::{Monitor, Notified};
pub use predicate::DeferredPredicate;
pub use sleeper::{
    InstantSleeper, InterruptibleSleeper, SleepInterrupted, Sleeper, ThreadSleeper,
    TrackingSleeper,
};
pub use supervised::Supervised;
