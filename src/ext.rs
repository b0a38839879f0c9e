//! Fluent combinators for any [`Deferred`].

use crate::attempt::Attempt;
use crate::cached::Cached;
use crate::constraint::TimeoutConstraint;
use crate::deferred::Deferred;
use crate::ensured::Ensured;
use crate::mapped::{Mapped, TryMapped};
use crate::predicate::DeferredPredicate;
use crate::supervised::Supervised;

/// Extension methods composing deferred values.
pub trait DeferredExt: Deferred + Sized {
    /// Apply `f` to the resolved value.
    fn map<U, F>(self, f: F) -> Mapped<Self, F>
    where
        F: Fn(Self::Output) -> U,
    {
        Mapped::new(self, f)
    }

    /// Apply `f`, which may itself report "not yet" or fail, to the resolved value.
    fn try_map<U, F>(self, f: F) -> TryMapped<Self, F>
    where
        F: Fn(Self::Output) -> Attempt<U>,
    {
        TryMapped::new(self, f)
    }

    /// Remember the first resolved value.
    fn cached(self) -> Cached<Self> {
        Cached::new(self)
    }

    /// Block on `get` until the value resolves or `constraint` gives up.
    fn ensured(self, constraint: TimeoutConstraint) -> Ensured<Self::Output>
    where
        Self: Send + Sync + 'static,
        Self::Output: 'static,
    {
        Ensured::new(self, constraint)
    }

    /// Resolve to `true` once the value satisfies `predicate`.
    fn matching<P>(self, predicate: P) -> DeferredPredicate<Self, P>
    where
        P: Fn(&Self::Output) -> bool,
    {
        DeferredPredicate::new(self, predicate)
    }

    /// Hold off for a while after each failure.
    fn supervised(self) -> Supervised<Self> {
        Supervised::new(self)
    }
}

impl<D: Deferred> DeferredExt for D {}
