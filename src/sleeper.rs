//! Abstraction for sleeping/waiting between attempts
//!
//! Enables fast, deterministic tests without real time delays, and lets callers cut a wait
//! short with [`InterruptibleSleeper::interrupt`].

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A wait was cut short before its duration elapsed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("interrupted while waiting {requested:?}")]
pub struct SleepInterrupted {
    pub requested: Duration,
}

/// Abstraction for sleeping/waiting
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    fn sleep(&self, duration: Duration) -> Result<(), SleepInterrupted>;
}

/// Production sleeper blocking the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) -> Result<(), SleepInterrupted> {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
        Ok(())
    }
}

/// Test sleeper that doesn't actually sleep
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> Result<(), SleepInterrupted> {
        Ok(())
    }
}

/// Test sleeper that tracks all sleep calls
#[derive(Debug, Clone, Default)]
pub struct TrackingSleeper {
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Sum of all recorded sleeps.
    pub fn total(&self) -> Duration {
        self.calls().iter().sum()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, duration: Duration) -> Result<(), SleepInterrupted> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(duration);
        Ok(())
    }
}

const WAIT_SLICE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Default)]
struct Interrupts {
    raised: Mutex<bool>,
    condvar: Condvar,
}

/// Real sleeper whose waits can be interrupted from another thread.
///
/// An interrupt wakes a sleeping caller, or the next caller if nobody is sleeping, and is
/// consumed by the wait it cuts short.
#[derive(Debug, Clone, Default)]
pub struct InterruptibleSleeper {
    interrupts: Arc<Interrupts>,
}

impl InterruptibleSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        *self.interrupts.raised.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.interrupts.condvar.notify_all();
    }
}

impl Sleeper for InterruptibleSleeper {
    fn sleep(&self, duration: Duration) -> Result<(), SleepInterrupted> {
        let deadline = Instant::now().checked_add(duration);
        let mut raised = self.interrupts.raised.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *raised {
                *raised = false;
                return Err(SleepInterrupted { requested: duration });
            }
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()).min(WAIT_SLICE),
                None => WAIT_SLICE,
            };
            if remaining.is_zero() {
                return Ok(());
            }
            raised = self
                .interrupts
                .condvar
                .wait_timeout(raised, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}
