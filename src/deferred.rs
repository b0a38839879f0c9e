//! The `Deferred` abstraction: "attempt to produce a `T` now".

use crate::attempt::Attempt;
use std::sync::Arc;

/// A value of a known type that may not exist yet.
///
/// `get` is a single, non-blocking (or briefly blocking) attempt. Waiting is the job of
/// [`Ensured`](crate::Ensured), which calls `get` repeatedly under a
/// [`TimeoutConstraint`](crate::TimeoutConstraint).
///
/// A successful value is "the" value for that acquisition; a `Deferred` is not a stream.
/// Stateless implementations may be asked many times and answer differently each time.
pub trait Deferred {
    /// Type of the value being awaited.
    type Output;

    /// Attempt to resolve the value now.
    fn get(&self) -> Attempt<Self::Output>;

    /// Name of the awaited type, available even if the value never resolves.
    fn output_type(&self) -> &'static str {
        std::any::type_name::<Self::Output>()
    }

    /// Human-readable description used in failures and logs.
    fn describe(&self) -> String {
        format!("Deferred<{}>", self.output_type())
    }

    /// The deferred an [`Ensured`](crate::Ensured) waits on, when `self` is one.
    ///
    /// Wrapping a deferred that answers `Some` re-targets the returned value, so nested
    /// waits never multiply their timeouts.
    fn ensured_target(&self) -> Option<SharedDeferred<Self::Output>> {
        None
    }
}

/// Type-erased, shareable deferred value.
pub type SharedDeferred<T> = Arc<dyn Deferred<Output = T> + Send + Sync>;

impl<D> Deferred for &D
where
    D: Deferred + ?Sized,
{
    type Output = D::Output;

    fn get(&self) -> Attempt<Self::Output> {
        (**self).get()
    }

    fn output_type(&self) -> &'static str {
        (**self).output_type()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn ensured_target(&self) -> Option<SharedDeferred<Self::Output>> {
        (**self).ensured_target()
    }
}

impl<D> Deferred for Box<D>
where
    D: Deferred + ?Sized,
{
    type Output = D::Output;

    fn get(&self) -> Attempt<Self::Output> {
        (**self).get()
    }

    fn output_type(&self) -> &'static str {
        (**self).output_type()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn ensured_target(&self) -> Option<SharedDeferred<Self::Output>> {
        (**self).ensured_target()
    }
}

impl<D> Deferred for Arc<D>
where
    D: Deferred + ?Sized,
{
    type Output = D::Output;

    fn get(&self) -> Attempt<Self::Output> {
        (**self).get()
    }

    fn output_type(&self) -> &'static str {
        (**self).output_type()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn ensured_target(&self) -> Option<SharedDeferred<Self::Output>> {
        (**self).ensured_target()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Answer;

    impl Deferred for Answer {
        type Output = u32;

        fn get(&self) -> Attempt<u32> {
            Attempt::Ready(42)
        }
    }

    #[test]
    fn default_description_uses_output_type() {
        assert_eq!(Answer.output_type(), "u32");
        assert_eq!(Answer.describe(), "Deferred<u32>");
    }

    #[test]
    fn smart_pointers_delegate() {
        let shared: SharedDeferred<u32> = Arc::new(Answer);
        assert_eq!(shared.get().into_ready(), Some(42));
        assert_eq!(shared.describe(), "Deferred<u32>");

        let boxed: Box<dyn Deferred<Output = u32>> = Box::new(Answer);
        assert_eq!((&boxed).get().into_ready(), Some(42));
        assert!(boxed.ensured_target().is_none());
        assert!(shared.ensured_target().is_none());
    }
}
