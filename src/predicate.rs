//! Predicate-gated adapter: "wait until the value satisfies a condition".

use crate::attempt::Attempt;
use crate::deferred::Deferred;
use crate::error::DeferredError;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Resolves to `true` once the wrapped value satisfies `predicate`.
///
/// A value that fails the predicate yields an `Unresolvable` failure carrying its `Debug`
/// rendering, so an enclosing [`Ensured`](crate::Ensured) keeps polling and can report what it
/// last saw. Failures and `NotYet` from the wrapped deferred pass through unchanged.
pub struct DeferredPredicate<D: Deferred, P> {
    deferred: D,
    predicate: P,
    last_value: Mutex<Option<D::Output>>,
}

impl<D, P> DeferredPredicate<D, P>
where
    D: Deferred,
    P: Fn(&D::Output) -> bool,
{
    pub fn new(deferred: D, predicate: P) -> Self {
        Self { deferred, predicate, last_value: Mutex::new(None) }
    }

    pub fn deferred(&self) -> &D {
        &self.deferred
    }

    /// The most recent value the predicate was evaluated against.
    pub fn last_value(&self) -> Option<D::Output>
    where
        D::Output: Clone,
    {
        self.last_value.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl<D, P> Deferred for DeferredPredicate<D, P>
where
    D: Deferred,
    D::Output: fmt::Debug,
    P: Fn(&D::Output) -> bool,
{
    type Output = bool;

    fn get(&self) -> Attempt<bool> {
        let value = match self.deferred.get() {
            Attempt::Ready(value) => value,
            Attempt::NotYet => return Attempt::NotYet,
            Attempt::Failed(e) => return Attempt::Failed(e),
        };

        let satisfied = (self.predicate)(&value);
        let rendered = (!satisfied).then(|| format!("{:?}", value));
        *self.last_value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);

        match rendered {
            None => Attempt::Ready(true),
            Some(last) => Attempt::Failed(DeferredError::unresolvable(self.describe(), last)),
        }
    }

    fn describe(&self) -> String {
        format!("DeferredPredicate{{{}}}", self.deferred.describe())
    }
}

impl<D: Deferred, P> fmt::Debug for DeferredPredicate<D, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredPredicate")
            .field("deferred", &self.deferred.describe())
            .field("predicate", &"<predicate>")
            .finish()
    }
}
