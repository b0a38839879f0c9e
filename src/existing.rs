//! Identity adapter for values that already exist.

use crate::attempt::Attempt;
use crate::deferred::Deferred;

/// A deferred value that is already available.
///
/// Lets plain values flow through APIs that expect a [`Deferred`]. `get` never waits and
/// never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Existing<T> {
    value: T,
}

impl<T> Existing<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Clone> Deferred for Existing<T> {
    type Output = T;

    fn get(&self) -> Attempt<T> {
        Attempt::Ready(self.value.clone())
    }

    fn describe(&self) -> String {
        format!("Existing<{}>", self.output_type())
    }
}

impl<T> From<T> for Existing<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
