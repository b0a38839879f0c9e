//! Backoff sequences for the retry engine.
//!
//! A [`Backoff`] is a factory: every call to [`Backoff::delays`] returns a fresh, independent
//! iterator over the delays to wait between attempts. Apart from [`Backoff::instants`] every
//! sequence is infinite.
//!
//! Strategies:
//! - constant: the same delay forever (default 250ms);
//! - fibonacci: `0, 1, 1, 2, 3, 5, 8, …` times a unit (default 1ms);
//! - exponential: starts at `base` and grows by `rate_percent` each step, always by at least
//!   1ms, so a zero base still grows;
//! - instants: a finite schedule of absolute offsets, converted to gaps;
//! - any of the above randomized with a [`Jitter`].
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use eventually::Backoff;
//!
//! let fib: Vec<_> = Backoff::fibonacci_scaled(Duration::from_millis(10)).delays().take(6).collect();
//! assert_eq!(fib, [0, 10, 10, 20, 30, 50].map(Duration::from_millis));
//! ```
//!
//! Overflow behavior: computations that would overflow saturate to `MAX_BACKOFF` (1 day).

use crate::jitter::{Jitter, Jittered};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Maximum delay used when calculations overflow (1 day).
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Delay used by [`Backoff::constant_default`].
pub const DEFAULT_CONSTANT_DELAY: Duration = Duration::from_millis(250);

/// Unit used by [`Backoff::fibonacci`].
pub const DEFAULT_FIBONACCI_UNIT: Duration = Duration::from_millis(1);

/// Growth rate used by [`Backoff::exponential_default`].
pub const DEFAULT_EXPONENTIAL_RATE_PERCENT: f64 = 50.0;

/// Iterator over delays handed out by a backoff.
pub type Delays = Box<dyn Iterator<Item = Duration> + Send>;

/// Errors returned by backoff configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BackoffError {
    #[error("growth rate must be a finite, non-negative percentage (got {0})")]
    InvalidRate(f64),
    #[error("an instant schedule needs at least one instant")]
    NoInstants,
}

/// Trait implemented by all backoff strategies.
pub trait BackoffStrategy: Send + Sync + fmt::Debug {
    /// A fresh iterator over delays, independent of any other iterator.
    fn delays(&self) -> Delays;
}

fn millis_saturated(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

fn capped_millis(millis: u64) -> Duration {
    Duration::from_millis(millis).min(MAX_BACKOFF)
}

/// `0, 1, 1, 2, 3, 5, …` multiples of `unit`.
#[derive(Debug, Clone)]
pub struct FibonacciDelays {
    current: u64,
    next: u64,
    unit: Duration,
}

impl FibonacciDelays {
    pub fn new(unit: Duration) -> Self {
        Self { current: 0, next: 1, unit }
    }
}

impl Iterator for FibonacciDelays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let n = self.current;
        self.current = self.next;
        self.next = n.saturating_add(self.next);
        let factor = u32::try_from(n).unwrap_or(u32::MAX);
        Some(self.unit.checked_mul(factor).unwrap_or(MAX_BACKOFF).min(MAX_BACKOFF))
    }
}

/// Geometric growth in milliseconds, at least 1ms per step.
#[derive(Debug, Clone)]
pub struct ExponentialDelays {
    current_ms: f64,
    factor: f64,
}

impl ExponentialDelays {
    pub fn new(base: Duration, rate_percent: f64) -> Self {
        Self { current_ms: millis_saturated(base) as f64, factor: 1.0 + rate_percent / 100.0 }
    }
}

impl Iterator for ExponentialDelays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let max_ms = MAX_BACKOFF.as_millis() as f64;
        let current = self.current_ms.min(max_ms);
        let grown = (current * self.factor).max(current + 1.0);
        self.current_ms = grown.min(max_ms);
        Some(capped_millis(current.round() as u64))
    }
}

#[derive(Debug, Clone)]
enum BackoffKind {
    Constant(Duration),
    Fibonacci(Duration),
    Exponential { base: Duration, rate_percent: f64 },
    Instants(Arc<[Duration]>),
    Custom(Arc<dyn BackoffStrategy>),
}

impl BackoffKind {
    fn delays(&self) -> Delays {
        match self {
            BackoffKind::Constant(delay) => Box::new(std::iter::repeat(*delay)),
            BackoffKind::Fibonacci(unit) => Box::new(FibonacciDelays::new(*unit)),
            BackoffKind::Exponential { base, rate_percent } => {
                Box::new(ExponentialDelays::new(*base, *rate_percent))
            }
            BackoffKind::Instants(gaps) => {
                let gaps = gaps.clone();
                Box::new((0..gaps.len()).map(move |i| gaps[i]))
            }
            BackoffKind::Custom(strategy) => strategy.delays(),
        }
    }
}

/// A re-iterable sequence of delays between attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    kind: BackoffKind,
    jitter: Jitter,
}

impl Backoff {
    fn of(kind: BackoffKind) -> Self {
        Self { kind, jitter: Jitter::None }
    }

    /// Always wait `delay`.
    pub fn constant(delay: Duration) -> Self {
        Self::of(BackoffKind::Constant(delay.min(MAX_BACKOFF)))
    }

    /// Always wait [`DEFAULT_CONSTANT_DELAY`].
    pub fn constant_default() -> Self {
        Self::constant(DEFAULT_CONSTANT_DELAY)
    }

    /// Fibonacci sequence in milliseconds.
    pub fn fibonacci() -> Self {
        Self::fibonacci_scaled(DEFAULT_FIBONACCI_UNIT)
    }

    /// Fibonacci sequence in multiples of `unit`.
    pub fn fibonacci_scaled(unit: Duration) -> Self {
        Self::of(BackoffKind::Fibonacci(unit))
    }

    /// Start at `base` and grow by `rate_percent` per step.
    pub fn exponential(base: Duration, rate_percent: f64) -> Result<Self, BackoffError> {
        if !rate_percent.is_finite() || rate_percent < 0.0 {
            return Err(BackoffError::InvalidRate(rate_percent));
        }
        Ok(Self::of(BackoffKind::Exponential { base: base.min(MAX_BACKOFF), rate_percent }))
    }

    /// Start at zero and grow by [`DEFAULT_EXPONENTIAL_RATE_PERCENT`].
    pub fn exponential_default() -> Self {
        Self::of(BackoffKind::Exponential {
            base: Duration::ZERO,
            rate_percent: DEFAULT_EXPONENTIAL_RATE_PERCENT,
        })
    }

    /// Fibonacci randomized with full jitter.
    pub fn random_fibonacci() -> Self {
        Self::fibonacci().randomized()
    }

    /// Default exponential randomized with full jitter.
    pub fn random_exponential() -> Self {
        Self::exponential_default().randomized()
    }

    /// Retry at the given offsets from the first attempt.
    ///
    /// Offsets are sorted and turned into the gaps between them, so `[0s, 5s, 10s, 20s]`
    /// waits `0s, 5s, 5s, 10s`. The schedule is finite.
    pub fn instants<I>(offsets: I) -> Result<Self, BackoffError>
    where
        I: IntoIterator<Item = Duration>,
    {
        let mut offsets: Vec<Duration> = offsets.into_iter().collect();
        if offsets.is_empty() {
            return Err(BackoffError::NoInstants);
        }
        offsets.sort();
        let mut previous = Duration::ZERO;
        let gaps: Vec<Duration> = offsets
            .into_iter()
            .map(|offset| {
                let gap = offset.saturating_sub(previous);
                previous = offset;
                gap.min(MAX_BACKOFF)
            })
            .collect();
        Ok(Self::of(BackoffKind::Instants(gaps.into())))
    }

    /// Use a custom strategy.
    pub fn custom<S>(strategy: S) -> Self
    where
        S: BackoffStrategy + 'static,
    {
        Self::of(BackoffKind::Custom(Arc::new(strategy)))
    }

    /// Randomize every delay with `jitter`.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Randomize every delay uniformly in `[0, delay)`.
    pub fn randomized(self) -> Self {
        self.with_jitter(Jitter::full())
    }

    pub fn jitter(&self) -> Jitter {
        self.jitter
    }

    /// A fresh iterator over delays.
    pub fn delays(&self) -> Delays {
        let delays = self.kind.delays();
        match self.jitter {
            Jitter::None => delays,
            _ => Box::new(Jittered::new(delays, self.jitter)),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::random_fibonacci()
    }
}

impl BackoffStrategy for Backoff {
    fn delays(&self) -> Delays {
        Backoff::delays(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_millis).collect()
    }

    #[test]
    fn constant_backoff_repeats() {
        let backoff = Backoff::constant(Duration::from_millis(100));
        let delays: Vec<_> = backoff.delays().take(4).collect();
        assert_eq!(delays, ms(&[100, 100, 100, 100]));
        assert_eq!(Backoff::constant_default().delays().next(), Some(DEFAULT_CONSTANT_DELAY));
    }

    #[test]
    fn fibonacci_first_values() {
        let delays: Vec<_> = Backoff::fibonacci().delays().take(8).collect();
        assert_eq!(delays, ms(&[0, 1, 1, 2, 3, 5, 8, 13]));
    }

    #[test]
    fn fibonacci_scales_by_unit() {
        let delays: Vec<_> =
            Backoff::fibonacci_scaled(Duration::from_secs(1)).delays().take(6).collect();
        assert_eq!(delays, ms(&[0, 1000, 1000, 2000, 3000, 5000]));
    }

    #[test]
    fn iterators_are_independent() {
        let backoff = Backoff::fibonacci();
        let mut first = backoff.delays();
        first.next();
        first.next();
        first.next();
        let mut second = backoff.delays();
        assert_eq!(second.next(), Some(Duration::ZERO));
        assert_eq!(first.next(), Some(Duration::from_millis(2)));
    }

    #[test]
    fn exponential_from_zero_is_non_decreasing() {
        let delays: Vec<_> = Backoff::exponential_default().delays().take(50).collect();
        assert_eq!(delays[0], Duration::ZERO);
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert!(delays[49] > delays[1]);
    }

    #[test]
    fn exponential_grows_by_rate() {
        let backoff = Backoff::exponential(Duration::from_millis(100), 100.0).unwrap();
        let delays: Vec<_> = backoff.delays().take(4).collect();
        assert_eq!(delays, ms(&[100, 200, 400, 800]));
    }

    #[test]
    fn exponential_rejects_bad_rates() {
        assert_eq!(
            Backoff::exponential(Duration::ZERO, -1.0).unwrap_err(),
            BackoffError::InvalidRate(-1.0)
        );
        assert!(Backoff::exponential(Duration::ZERO, f64::NAN).is_err());
    }

    #[test]
    fn exponential_saturates() {
        let backoff = Backoff::exponential(Duration::from_secs(3600), 1000.0).unwrap();
        let last = backoff.delays().nth(100).unwrap();
        assert_eq!(last, MAX_BACKOFF);
    }

    #[test]
    fn fibonacci_saturates() {
        let last = Backoff::fibonacci_scaled(Duration::from_secs(1)).delays().nth(200).unwrap();
        assert_eq!(last, MAX_BACKOFF);
    }

    #[test]
    fn instants_become_gaps_and_end() {
        let backoff = Backoff::instants(
            [20, 0, 10, 5].map(Duration::from_secs),
        )
        .unwrap();
        let delays: Vec<_> = backoff.delays().collect();
        assert_eq!(delays, [0, 5, 5, 10].map(Duration::from_secs).to_vec());
    }

    #[test]
    fn instants_need_at_least_one() {
        assert_eq!(Backoff::instants(Vec::new()).unwrap_err(), BackoffError::NoInstants);
    }

    #[test]
    fn randomized_stays_below_underlying() {
        let plain: Vec<_> = Backoff::fibonacci().delays().take(30).collect();
        let random: Vec<_> = Backoff::random_fibonacci().delays().take(30).collect();
        for (r, p) in random.iter().zip(plain.iter()) {
            if p.is_zero() {
                assert!(r.is_zero());
            } else {
                assert!(r < p);
            }
        }
    }

    #[test]
    fn randomized_exponential_stays_below_underlying() {
        let plain: Vec<_> = Backoff::exponential_default().delays().take(40).collect();
        let random: Vec<_> = Backoff::random_exponential().delays().take(40).collect();
        assert_eq!(Backoff::random_exponential().jitter(), Jitter::Full);
        for (r, p) in random.iter().zip(plain.iter()) {
            if p.is_zero() {
                assert!(r.is_zero());
            } else {
                assert!(r < p, "{r:?} not below {p:?}");
            }
        }
    }

    #[test]
    fn default_is_random_fibonacci() {
        assert_eq!(Backoff::default().jitter(), Jitter::Full);
    }

    #[derive(Debug)]
    struct Doubling;

    impl BackoffStrategy for Doubling {
        fn delays(&self) -> Delays {
            Box::new(std::iter::successors(Some(Duration::from_millis(1)), |d| Some(*d * 2)))
        }
    }

    #[test]
    fn custom_strategy_is_used() {
        let delays: Vec<_> = Backoff::custom(Doubling).delays().take(4).collect();
        assert_eq!(delays, ms(&[1, 2, 4, 8]));
    }
}
