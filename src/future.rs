//! Async-handle adapter.
//!
//! Wraps a conventional asynchronous handle and checks it without waiting: a pending handle is
//! reported as temporarily unavailable, a cancelled or failed one as permanently unavailable.
//! Blocking is left entirely to an enclosing [`Ensured`](crate::Ensured).

use crate::attempt::Attempt;
use crate::deferred::Deferred;
use crate::error::{BoxError, DeferredError};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

/// State of a handle observed by a zero-wait poll.
#[derive(Debug)]
pub enum HandlePoll<T> {
    /// Not complete yet.
    Pending,
    /// Completed with a value.
    Ready(T),
    /// Cancelled before producing a value.
    Cancelled,
    /// Completed with an error.
    Failed(BoxError),
}

/// A handle that can be checked for completion without blocking.
///
/// After `poll_now` has returned anything other than `Pending` it is not called again.
pub trait PollHandle {
    type Output;

    fn poll_now(&mut self) -> HandlePoll<Self::Output>;
}

impl<T> PollHandle for tokio::task::JoinHandle<T> {
    type Output = T;

    fn poll_now(&mut self) -> HandlePoll<T> {
        if !self.is_finished() {
            return HandlePoll::Pending;
        }
        match self.now_or_never() {
            None => HandlePoll::Pending,
            Some(Ok(value)) => HandlePoll::Ready(value),
            Some(Err(e)) if e.is_cancelled() => HandlePoll::Cancelled,
            Some(Err(e)) => HandlePoll::Failed(Box::new(e)),
        }
    }
}

impl<T> PollHandle for tokio::sync::oneshot::Receiver<T> {
    type Output = T;

    fn poll_now(&mut self) -> HandlePoll<T> {
        use tokio::sync::oneshot::error::TryRecvError;

        match self.try_recv() {
            Ok(value) => HandlePoll::Ready(value),
            Err(TryRecvError::Empty) => HandlePoll::Pending,
            Err(TryRecvError::Closed) => HandlePoll::Cancelled,
        }
    }
}

/// Poll handle for a spawned OS thread.
#[derive(Debug)]
pub struct ThreadHandle<T> {
    handle: Option<std::thread::JoinHandle<T>>,
}

impl<T> ThreadHandle<T> {
    pub fn new(handle: std::thread::JoinHandle<T>) -> Self {
        Self { handle: Some(handle) }
    }
}

impl<T> From<std::thread::JoinHandle<T>> for ThreadHandle<T> {
    fn from(handle: std::thread::JoinHandle<T>) -> Self {
        Self::new(handle)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "thread panicked".to_string()
    }
}

impl<T> PollHandle for ThreadHandle<T> {
    type Output = T;

    fn poll_now(&mut self) -> HandlePoll<T> {
        match self.handle.take() {
            None => HandlePoll::Cancelled,
            Some(handle) if !handle.is_finished() => {
                self.handle = Some(handle);
                HandlePoll::Pending
            }
            Some(handle) => match handle.join() {
                Ok(value) => HandlePoll::Ready(value),
                Err(payload) => HandlePoll::Failed(panic_message(payload.as_ref()).into()),
            },
        }
    }
}

/// Poll handle for a boxed future producing a `Result`.
///
/// The future is polled with a no-op waker, so it must be driven by something other than its
/// waker: shared state, a channel filled by another thread, and the like.
pub struct PolledFuture<T, E> {
    future: Pin<Box<dyn Future<Output = Result<T, E>> + Send>>,
}

impl<T, E> PolledFuture<T, E> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self { future: Box::pin(future) }
    }
}

impl<T, E> fmt::Debug for PolledFuture<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolledFuture").finish_non_exhaustive()
    }
}

impl<T, E> PollHandle for PolledFuture<T, E>
where
    E: Into<BoxError>,
{
    type Output = T;

    fn poll_now(&mut self) -> HandlePoll<T> {
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        match self.future.as_mut().poll(&mut cx) {
            Poll::Pending => HandlePoll::Pending,
            Poll::Ready(Ok(value)) => HandlePoll::Ready(value),
            Poll::Ready(Err(e)) => HandlePoll::Failed(e.into()),
        }
    }
}

enum HandleState<H, T> {
    Waiting(H),
    Resolved(T),
    Gone(String),
}

/// Deferred value backed by an asynchronous handle.
///
/// The first completed result is remembered, so later calls return the same value even though
/// most handles can only hand their result out once.
pub struct FutureValue<H: PollHandle> {
    state: Mutex<HandleState<H, H::Output>>,
}

impl<H: PollHandle> FutureValue<H> {
    pub fn new(handle: H) -> Self {
        Self { state: Mutex::new(HandleState::Waiting(handle)) }
    }
}

impl<H> Deferred for FutureValue<H>
where
    H: PollHandle,
    H::Output: Clone,
{
    type Output = H::Output;

    fn get(&self) -> Attempt<H::Output> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let polled = match &mut *state {
            HandleState::Resolved(value) => return Attempt::Ready(value.clone()),
            HandleState::Gone(reason) => {
                return Attempt::Failed(DeferredError::permanent_with(
                    self.describe(),
                    reason.clone(),
                ))
            }
            HandleState::Waiting(handle) => handle.poll_now(),
        };

        match polled {
            HandlePoll::Pending => Attempt::Failed(DeferredError::transient(self.describe())),
            HandlePoll::Ready(value) => {
                *state = HandleState::Resolved(value.clone());
                Attempt::Ready(value)
            }
            HandlePoll::Cancelled => {
                *state = HandleState::Gone("cancelled".to_string());
                Attempt::Failed(DeferredError::permanent_with(self.describe(), "cancelled"))
            }
            HandlePoll::Failed(e) => {
                *state = HandleState::Gone(e.to_string());
                Attempt::Failed(DeferredError::permanent_with(self.describe(), e))
            }
        }
    }

    fn describe(&self) -> String {
        format!("Future<{}>", self.output_type())
    }
}

impl<H: PollHandle> fmt::Debug for FutureValue<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            HandleState::Waiting(_) => "waiting",
            HandleState::Resolved(_) => "resolved",
            HandleState::Gone(_) => "gone",
        };
        f.debug_struct("FutureValue").field("state", &state).finish()
    }
}

/// Adapt an asynchronous handle into a deferred value.
pub fn future<H: PollHandle>(handle: H) -> FutureValue<H> {
    FutureValue::new(handle)
}
