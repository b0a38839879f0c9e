//! Monitor-wait adapter: resolves once a shared object has been signalled.
//!
//! A [`Notified`] starts a background waiter as soon as it is constructed. The waiter performs
//! a single timed wait on the [`Monitor`]. Waking up within the budget counts as "notified",
//! whether the wake was a real `notify_*` call or a spurious one; this is a simplification,
//! not a guarantee of causal notification. Signals sent before the waiter starts waiting are
//! not observed.

use crate::attempt::Attempt;
use crate::deferred::Deferred;
use crate::error::DeferredError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::Duration;

/// Default total wait for [`Notified::with_default_wait`].
pub const DEFAULT_NOTIFY_WAIT: Duration = Duration::from_secs(30);

/// A shared object other threads can signal.
pub struct Monitor<T> {
    value: T,
    signals: Mutex<u64>,
    condvar: Condvar,
}

impl<T> Monitor<T> {
    pub fn new(value: T) -> Self {
        Self { value, signals: Mutex::new(0), condvar: Condvar::new() }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Wake every thread waiting on this monitor.
    pub fn notify_all(&self) {
        *self.signals.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.condvar.notify_all();
    }

    /// Wake one thread waiting on this monitor.
    pub fn notify_one(&self) {
        *self.signals.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.condvar.notify_one();
    }

    /// Number of signals sent so far.
    pub fn signals(&self) -> u64 {
        *self.signals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: fmt::Debug> fmt::Debug for Monitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor").field("value", &self.value).finish()
    }
}

#[derive(Debug)]
struct WaitState {
    waiting: AtomicBool,
    notified: OnceLock<bool>,
}

impl WaitState {
    fn finish(&self, notified: bool) {
        let _ = self.notified.set(notified);
        self.waiting.store(false, Ordering::Release);
    }
}

/// Deferred value that becomes available when its [`Monitor`] is signalled.
pub struct Notified<T> {
    monitor: Arc<Monitor<T>>,
    total: Duration,
    state: Arc<WaitState>,
}

impl<T> Notified<T>
where
    T: Send + Sync + 'static,
{
    /// Start waiting up to `total` for `monitor` to be signalled.
    pub fn new(monitor: Arc<Monitor<T>>, total: Duration) -> Self {
        let state =
            Arc::new(WaitState { waiting: AtomicBool::new(true), notified: OnceLock::new() });

        let waiter_monitor = monitor.clone();
        let waiter_state = state.clone();
        let spawned = thread::Builder::new().name("deferred-notified".into()).spawn(move || {
            let guard = waiter_monitor.signals.lock().unwrap_or_else(PoisonError::into_inner);
            let (_guard, result) = waiter_monitor
                .condvar
                .wait_timeout(guard, total)
                .unwrap_or_else(PoisonError::into_inner);
            waiter_state.finish(!result.timed_out());
        });

        if let Err(e) = spawned {
            tracing::warn!(error = %e, "failed to start notification waiter");
            state.finish(false);
        }

        Self { monitor, total, state }
    }

    /// Start waiting up to [`DEFAULT_NOTIFY_WAIT`].
    pub fn with_default_wait(monitor: Arc<Monitor<T>>) -> Self {
        Self::new(monitor, DEFAULT_NOTIFY_WAIT)
    }
}

impl<T> Notified<T> {
    pub fn monitor(&self) -> &Arc<Monitor<T>> {
        &self.monitor
    }

    /// Whether the background waiter is still waiting.
    pub fn is_waiting(&self) -> bool {
        self.state.waiting.load(Ordering::Acquire)
    }
}

impl<T: Clone> Deferred for Notified<T> {
    type Output = T;

    fn get(&self) -> Attempt<T> {
        if self.is_waiting() {
            return Attempt::NotYet;
        }
        match self.state.notified.get() {
            Some(true) => Attempt::Ready(self.monitor.value.clone()),
            _ => Attempt::Failed(DeferredError::permanent(self.describe())),
        }
    }

    fn describe(&self) -> String {
        format!("Notified<{}>{{within {:?}}}", self.output_type(), self.total)
    }
}

impl<T> fmt::Debug for Notified<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notified")
            .field("total", &self.total)
            .field("waiting", &self.is_waiting())
            .field("notified", &self.state.notified.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn wait_until_done<T>(notified: &Notified<T>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while notified.is_waiting() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn not_yet_while_waiting() {
        let monitor = Arc::new(Monitor::new("resource"));
        let notified = Notified::new(monitor, Duration::from_secs(10));
        assert!(matches!(notified.get(), Attempt::NotYet));
    }

    #[test]
    fn signal_resolves_to_value() {
        let monitor = Arc::new(Monitor::new(String::from("resource")));
        let notified = Notified::new(monitor.clone(), Duration::from_secs(10));

        // keep signalling until the waiter has parked and observed one
        let deadline = Instant::now() + Duration::from_secs(5);
        while notified.is_waiting() && Instant::now() < deadline {
            monitor.notify_all();
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(notified.get().into_ready().as_deref(), Some("resource"));
        assert!(monitor.signals() >= 1);
    }

    #[test]
    fn timeout_is_permanent() {
        let monitor = Arc::new(Monitor::new(1_u32));
        let notified = Notified::new(monitor, Duration::from_millis(20));
        wait_until_done(&notified);

        let attempt = notified.get();
        assert!(attempt.is_permanent_failure());
        assert!(attempt.failure().unwrap().deferred().starts_with("Notified<u32>"));
    }
}
