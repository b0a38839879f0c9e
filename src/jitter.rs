//! Randomization applied on top of a backoff sequence
//!
//! When to use which strategy:
//! - `None`: deterministic delays for tests or tightly controlled workflows.
//! - `Full`: uniform in `[0, delay)`, the randomized strategies use this.
//! - `Equal`: uniform in `[delay/2, delay]`, keeps a floor while adding randomness.
//!
//! Notes:
//! - RNG: uses `rand`'s thread-local RNG by default; deterministic RNGs can be injected via `apply_with_rng`.
//! - Precision: millisecond conversions saturate to `u64::MAX` to avoid panics on very large durations.
//! - A zero delay always stays zero.
//!
//! Example:
//! ```rust
//! use eventually::{Backoff, Jitter};
//!
//! let backoff = Backoff::fibonacci().with_jitter(Jitter::equal());
//! let first: Vec<_> = backoff.delays().take(3).collect();
//! assert_eq!(first.len(), 3);
//! ```

use rand::{rng, Rng};
use std::time::Duration;

/// Jitter strategy for randomizing delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Jitter {
    /// No jitter - use exact delay
    #[default]
    None,
    /// Full jitter: random in `[0, delay)`
    Full,
    /// Equal jitter: random in `[delay/2, delay]`
    Equal,
}

impl Jitter {
    /// Create a full jitter strategy
    pub fn full() -> Self {
        Jitter::Full
    }

    /// Create an equal jitter strategy
    pub fn equal() -> Self {
        Jitter::Equal
    }

    /// Apply jitter to a delay duration
    pub fn apply(&self, delay: Duration) -> Duration {
        let mut rng = rng();
        self.apply_with_rng(delay, &mut rng)
    }

    /// Apply jitter with a custom RNG (for testing)
    pub fn apply_with_rng<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        let millis: u64 = delay.as_millis().try_into().unwrap_or(u64::MAX);
        match self {
            Jitter::None => delay,
            _ if millis == 0 => Duration::ZERO,
            Jitter::Full => Duration::from_millis(rng.random_range(0..millis)),
            Jitter::Equal => Duration::from_millis(rng.random_range(millis / 2..=millis)),
        }
    }
}

/// Iterator adapter randomizing every delay of the wrapped sequence.
#[derive(Debug, Clone)]
pub struct Jittered<I> {
    inner: I,
    jitter: Jitter,
}

impl<I> Jittered<I> {
    pub fn new(inner: I, jitter: Jitter) -> Self {
        Self { inner, jitter }
    }
}

impl<I> Iterator for Jittered<I>
where
    I: Iterator<Item = Duration>,
{
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        self.inner.next().map(|delay| self.jitter.apply(delay))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn none_jitter_returns_exact_delay() {
        let delay = Duration::from_secs(1);
        assert_eq!(Jitter::None.apply(delay), delay);
    }

    #[test]
    fn full_jitter_is_below_delay() {
        let jitter = Jitter::full();
        let delay = Duration::from_millis(10);
        for _ in 0..200 {
            assert!(jitter.apply(delay) < delay);
        }
    }

    #[test]
    fn full_jitter_of_one_millisecond_is_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(Jitter::full().apply_with_rng(Duration::from_millis(1), &mut rng), Duration::ZERO);
    }

    #[test]
    fn equal_jitter_is_between_half_and_delay() {
        let mut rng = StdRng::seed_from_u64(42);
        let delay = Duration::from_millis(1000);
        for _ in 0..100 {
            let jittered = Jitter::equal().apply_with_rng(delay, &mut rng);
            assert!(jittered >= Duration::from_millis(500));
            assert!(jittered <= delay);
        }
    }

    #[test]
    fn jitter_handles_zero_delay() {
        assert_eq!(Jitter::full().apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(Jitter::equal().apply(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn saturates_large_durations_without_panicking() {
        let huge = Duration::from_secs(u64::MAX);
        let mut rng = StdRng::seed_from_u64(999);
        let jittered = Jitter::full().apply_with_rng(huge, &mut rng);
        assert!(jittered < Duration::from_millis(u64::MAX));
    }

    #[test]
    fn jittered_preserves_length() {
        let delays = vec![Duration::from_millis(5); 4];
        let jittered: Vec<_> = Jittered::new(delays.into_iter(), Jitter::Full).collect();
        assert_eq!(jittered.len(), 4);
        assert!(jittered.iter().all(|d| *d < Duration::from_millis(5)));
    }
}
