//! Closure and atomic adapters.
//!
//! These replace call-interception with explicit closures: whatever "try now" logic a caller
//! has becomes a [`Deferred`] directly.

use crate::attempt::Attempt;
use crate::deferred::Deferred;
use crate::error::{BoxError, DeferredError};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Deferred value backed by a closure returning an [`Attempt`].
#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
    name: Option<String>,
}

impl<F> FromFn<F> {
    /// Set the description used in diagnostics.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFn").field("name", &self.name).field("f", &"<closure>").finish()
    }
}

impl<T, F> Deferred for FromFn<F>
where
    F: Fn() -> Attempt<T>,
{
    type Output = T;

    fn get(&self) -> Attempt<T> {
        (self.f)()
    }

    fn describe(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("FromFn<{}>", self.output_type()),
        }
    }
}

/// Adapt a closure that reports its own [`Attempt`].
pub fn from_fn<T, F>(f: F) -> FromFn<F>
where
    F: Fn() -> Attempt<T>,
{
    FromFn { f, name: None }
}

/// Adapt a closure where `None` means "not yet".
pub fn from_option<T, F>(f: F) -> FromFn<impl Fn() -> Attempt<T>>
where
    F: Fn() -> Option<T>,
{
    from_fn(move || Attempt::from(f()))
}

/// Deferred value backed by a fallible closure; errors are treated as retryable.
#[derive(Clone)]
pub struct FromResult<F> {
    f: F,
    name: Option<String>,
}

impl<F> FromResult<F> {
    /// Set the description used in diagnostics.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl<F> fmt::Debug for FromResult<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromResult").field("name", &self.name).field("f", &"<closure>").finish()
    }
}

impl<T, E, F> Deferred for FromResult<F>
where
    F: Fn() -> Result<T, E>,
    E: Into<BoxError>,
{
    type Output = T;

    fn get(&self) -> Attempt<T> {
        match (self.f)() {
            Ok(value) => Attempt::Ready(value),
            Err(e) => Attempt::Failed(DeferredError::unexpected(self.describe(), e)),
        }
    }

    fn describe(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("FromResult<{}>", self.output_type()),
        }
    }
}

/// Adapt a fallible closure, e.g. a connection attempt.
pub fn from_result<T, E, F>(f: F) -> FromResult<F>
where
    F: Fn() -> Result<T, E>,
    E: Into<BoxError>,
{
    FromResult { f, name: None }
}

/// Current value of a shared `AtomicBool`.
pub fn from_atomic_bool(atomic: Arc<AtomicBool>) -> FromFn<impl Fn() -> Attempt<bool>> {
    from_fn(move || Attempt::Ready(atomic.load(Ordering::SeqCst))).named("AtomicBool")
}

/// Current value of a shared `AtomicUsize`.
pub fn from_atomic_usize(atomic: Arc<AtomicUsize>) -> FromFn<impl Fn() -> Attempt<usize>> {
    from_fn(move || Attempt::Ready(atomic.load(Ordering::SeqCst))).named("AtomicUsize")
}

/// Current value of a shared `AtomicU64`.
pub fn from_atomic_u64(atomic: Arc<AtomicU64>) -> FromFn<impl Fn() -> Attempt<u64>> {
    from_fn(move || Attempt::Ready(atomic.load(Ordering::SeqCst))).named("AtomicU64")
}

/// Current value of a shared `AtomicI64`.
pub fn from_atomic_i64(atomic: Arc<AtomicI64>) -> FromFn<impl Fn() -> Attempt<i64>> {
    from_fn(move || Attempt::Ready(atomic.load(Ordering::SeqCst))).named("AtomicI64")
}
