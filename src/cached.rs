//! Memoizing adapter.

use crate::attempt::Attempt;
use crate::deferred::Deferred;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Remembers the first value the wrapped deferred resolves to.
///
/// Once populated, `get` returns the stored value without touching the wrapped deferred again
/// until [`release`](Cached::release) empties the slot. The slot lock is held across the
/// check-and-populate sequence, so concurrent callers trigger at most one successful
/// underlying resolution per release.
pub struct Cached<D: Deferred> {
    deferred: D,
    slot: Mutex<Option<D::Output>>,
}

impl<D: Deferred> Cached<D> {
    pub fn new(deferred: D) -> Self {
        Self { deferred, slot: Mutex::new(None) }
    }

    /// The wrapped deferred.
    pub fn deferred(&self) -> &D {
        &self.deferred
    }

    /// Already memoizing; returns `self` instead of wrapping again.
    pub fn cached(self) -> Self {
        self
    }

    /// Clear the slot, returning the value it held.
    pub fn release(&self) -> Option<D::Output> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Whether a value is currently memoized.
    pub fn is_cached(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

impl<D> Deferred for Cached<D>
where
    D: Deferred,
    D::Output: Clone,
{
    type Output = D::Output;

    fn get(&self) -> Attempt<D::Output> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = slot.as_ref() {
            return Attempt::Ready(value.clone());
        }
        match self.deferred.get() {
            Attempt::Ready(value) => {
                *slot = Some(value.clone());
                Attempt::Ready(value)
            }
            other => other,
        }
    }

    fn output_type(&self) -> &'static str {
        self.deferred.output_type()
    }

    fn describe(&self) -> String {
        format!("Cached{{{}}}", self.deferred.describe())
    }
}

impl<D: Deferred> fmt::Debug for Cached<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cached")
            .field("deferred", &self.deferred.describe())
            .field("cached", &self.is_cached())
            .finish()
    }
}
