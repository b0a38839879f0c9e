//! Derived deferred values.
//!
//! Fluent "call a getter on a value that isn't there yet" chains are written as ordinary
//! function composition: each accessor becomes a closure applied once the wrapped value
//! resolves.

use crate::attempt::Attempt;
use crate::deferred::Deferred;
use std::fmt;

/// Applies an accessor to the resolved value.
#[derive(Clone)]
pub struct Mapped<D, F> {
    deferred: D,
    f: F,
}

impl<D, F> Mapped<D, F> {
    pub fn new(deferred: D, f: F) -> Self {
        Self { deferred, f }
    }

    pub fn deferred(&self) -> &D {
        &self.deferred
    }
}

impl<D, F, U> Deferred for Mapped<D, F>
where
    D: Deferred,
    F: Fn(D::Output) -> U,
{
    type Output = U;

    fn get(&self) -> Attempt<U> {
        self.deferred.get().map(&self.f)
    }

    fn describe(&self) -> String {
        format!("Mapped<{}>{{{}}}", self.output_type(), self.deferred.describe())
    }
}

impl<D: Deferred, F> fmt::Debug for Mapped<D, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapped").field("deferred", &self.deferred.describe()).finish()
    }
}

/// Applies an accessor that may itself be not-yet-available or fail.
#[derive(Clone)]
pub struct TryMapped<D, F> {
    deferred: D,
    f: F,
}

impl<D, F> TryMapped<D, F> {
    pub fn new(deferred: D, f: F) -> Self {
        Self { deferred, f }
    }
}

impl<D, F, U> Deferred for TryMapped<D, F>
where
    D: Deferred,
    F: Fn(D::Output) -> Attempt<U>,
{
    type Output = U;

    fn get(&self) -> Attempt<U> {
        self.deferred.get().and_then(&self.f)
    }

    fn describe(&self) -> String {
        format!("TryMapped<{}>{{{}}}", self.output_type(), self.deferred.describe())
    }
}

impl<D: Deferred, F> fmt::Debug for TryMapped<D, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryMapped").field("deferred", &self.deferred.describe()).finish()
    }
}
