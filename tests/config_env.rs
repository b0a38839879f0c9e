//! Process defaults are global; everything that touches them lives in this one test binary
//! and runs in a single test.

use eventually::{install_global, DeferredConfig, StrategyName, TimeoutConstraint};
use std::time::Duration;

#[test]
fn environment_feeds_process_defaults() {
    std::env::set_var("DEFERRED_RETRY_STRATEGY", "fibonacci");
    std::env::set_var("DEFERRED_RETRY_TIMEOUT", " 2S ");
    std::env::set_var("DEFERRED_MAXIMUM_POLLING_TIME", "75ms");

    let from_env = DeferredConfig::from_env().unwrap();
    assert_eq!(from_env.strategy, StrategyName::Fibonacci);
    assert_eq!(from_env.retry_timeout, Duration::from_secs(2));
    assert_eq!(from_env.maximum_polling, Duration::from_millis(75));

    // first use assembles the default from the environment
    assert_eq!(DeferredConfig::global(), &from_env);

    // once assembled it is never replaced or re-read
    std::env::set_var("DEFERRED_RETRY_TIMEOUT", "9h");
    assert!(install_global(DeferredConfig::default()).is_err());
    assert_eq!(DeferredConfig::global().retry_timeout, Duration::from_secs(2));

    let within = TimeoutConstraint::within(Duration::from_millis(500));
    assert_eq!(within.max_total(), Some(Duration::from_millis(500)));
    assert_eq!(within.max_polling(), Some(Duration::from_millis(75)));
    let delays: Vec<_> = within.backoff().delays().take(5).collect();
    assert_eq!(delays, [0, 1, 1, 2, 3].map(Duration::from_millis).to_vec());

    let defaults = TimeoutConstraint::default();
    assert_eq!(defaults.max_total(), Some(Duration::from_secs(2)));
}
