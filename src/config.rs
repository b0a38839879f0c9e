//! Process-wide retry defaults.
//!
//! [`DeferredConfig`] names the default backoff strategy, the default retry budget and the
//! default cap on a single polling delay. A process default is assembled once, from the
//! environment on first use or from an explicit [`install_global`] call, and never re-read.
//!
//! Environment:
//! - `DEFERRED_RETRY_STRATEGY`: `random.fibonacci` (default), `random.exponential`,
//!   `fibonacci`, `exponential` or `constant`. Anything else means constant 250ms.
//! - `DEFERRED_RETRY_TIMEOUT`: default `60s`.
//! - `DEFERRED_MAXIMUM_POLLING_TIME`: default `1000ms`.
//!
//! Durations accept `ms`, `s`, `m` and `h` suffixes; a bare number is milliseconds.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use eventually::{DeferredConfig, StrategyName};
//!
//! let config = DeferredConfig::from_lookup(|key| match key {
//!     "DEFERRED_RETRY_TIMEOUT" => Some("2m".to_string()),
//!     _ => None,
//! })
//! .unwrap();
//! assert_eq!(config.retry_timeout, Duration::from_secs(120));
//! assert_eq!(config.strategy, StrategyName::RandomFibonacci);
//! ```

use crate::backoff::Backoff;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAXIMUM_POLLING: Duration = Duration::from_millis(1000);

pub const ENV_RETRY_STRATEGY: &str = "DEFERRED_RETRY_STRATEGY";
pub const ENV_RETRY_TIMEOUT: &str = "DEFERRED_RETRY_TIMEOUT";
pub const ENV_MAXIMUM_POLLING_TIME: &str = "DEFERRED_MAXIMUM_POLLING_TIME";

static GLOBAL: OnceLock<DeferredConfig> = OnceLock::new();

/// Errors produced while reading configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid duration {value:?}: {reason}")]
    InvalidDuration { value: String, reason: &'static str },
    #[error("unknown retry strategy {0:?}")]
    UnknownStrategy(String),
    #[error("invalid value for {key}: {source}")]
    InvalidSetting {
        key: &'static str,
        #[source]
        source: Box<ConfigError>,
    },
}

/// Parse a duration such as `250ms`, `5s`, `2m`, `1h` or `100`.
///
/// Whitespace is trimmed and case ignored; a bare number is milliseconds.
pub fn parse_duration(raw: &str) -> Result<Duration, ConfigError> {
    let invalid =
        |reason| ConfigError::InvalidDuration { value: raw.to_string(), reason };

    let text = raw.trim().to_ascii_lowercase();
    if text.is_empty() {
        return Err(invalid("empty"));
    }

    let (number, millis_per_unit) = if let Some(n) = text.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = text.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = text.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = text.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        (text.as_str(), 1)
    };

    let value: u64 = number.trim().parse().map_err(|_| invalid("not a whole number"))?;
    value
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| invalid("too large"))
}

/// Named backoff strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(from = "String"))]
pub enum StrategyName {
    #[default]
    RandomFibonacci,
    RandomExponential,
    Fibonacci,
    Exponential,
    Constant,
}

impl StrategyName {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyName::RandomFibonacci => "random.fibonacci",
            StrategyName::RandomExponential => "random.exponential",
            StrategyName::Fibonacci => "fibonacci",
            StrategyName::Exponential => "exponential",
            StrategyName::Constant => "constant",
        }
    }

    /// Parse a name, falling back to [`StrategyName::Constant`] for anything unknown.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|e: ConfigError| {
            tracing::warn!(error = %e, "falling back to constant retry strategy");
            StrategyName::Constant
        })
    }

    /// The backoff sequence this name stands for, with default parameters.
    pub fn backoff(self) -> Backoff {
        match self {
            StrategyName::RandomFibonacci => Backoff::random_fibonacci(),
            StrategyName::RandomExponential => Backoff::random_exponential(),
            StrategyName::Fibonacci => Backoff::fibonacci(),
            StrategyName::Exponential => Backoff::exponential_default(),
            StrategyName::Constant => Backoff::constant_default(),
        }
    }
}

impl FromStr for StrategyName {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "random.fibonacci" => Ok(StrategyName::RandomFibonacci),
            "random.exponential" => Ok(StrategyName::RandomExponential),
            "fibonacci" => Ok(StrategyName::Fibonacci),
            "exponential" => Ok(StrategyName::Exponential),
            "constant" => Ok(StrategyName::Constant),
            _ => Err(ConfigError::UnknownStrategy(raw.to_string())),
        }
    }
}

impl From<String> for StrategyName {
    fn from(raw: String) -> Self {
        Self::parse_lenient(&raw)
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry defaults used by [`TimeoutConstraint::within`](crate::TimeoutConstraint::within)
/// and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct DeferredConfig {
    pub strategy: StrategyName,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "de::duration"))]
    pub retry_timeout: Duration,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "de::duration"))]
    pub maximum_polling: Duration,
}

impl Default for DeferredConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyName::default(),
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
            maximum_polling: DEFAULT_MAXIMUM_POLLING,
        }
    }
}

impl DeferredConfig {
    /// Read settings from the process environment; unset keys keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_RETRY_STRATEGY) {
            config.strategy = StrategyName::parse_lenient(&raw);
        }
        if let Some(raw) = lookup(ENV_RETRY_TIMEOUT) {
            config.retry_timeout = setting(ENV_RETRY_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAXIMUM_POLLING_TIME) {
            config.maximum_polling = setting(ENV_MAXIMUM_POLLING_TIME, &raw)?;
        }
        Ok(config)
    }

    /// Backoff sequence for the configured strategy.
    pub fn backoff(&self) -> Backoff {
        self.strategy.backoff()
    }

    /// The process default, read from the environment on first use.
    ///
    /// An invalid environment is logged and replaced by the built-in defaults.
    pub fn global() -> &'static DeferredConfig {
        GLOBAL.get_or_init(|| {
            Self::from_env().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring invalid retry configuration");
                Self::default()
            })
        })
    }
}

fn setting(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    parse_duration(raw).map_err(|e| ConfigError::InvalidSetting { key, source: Box::new(e) })
}

/// Install the process default. Fails, handing the config back, once a default exists.
pub fn install_global(config: DeferredConfig) -> Result<(), DeferredConfig> {
    let installed = config.clone();
    GLOBAL.set(config)?;
    tracing::info!(
        strategy = %installed.strategy,
        retry_timeout = ?installed.retry_timeout,
        maximum_polling = ?installed.maximum_polling,
        "installed retry defaults"
    );
    Ok(())
}

#[cfg(feature = "serde")]
mod de {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub(super) fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("100").unwrap(), Duration::from_millis(100));
    }

    #[test]
    fn parsing_trims_and_ignores_case() {
        assert_eq!(parse_duration("  30S ").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("10 MS").unwrap(), Duration::from_millis(10));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert!(matches!(parse_duration(""), Err(ConfigError::InvalidDuration { .. })));
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("1.5s").is_err());
        assert!(parse_duration(&format!("{}h", u64::MAX)).is_err());
    }

    #[test]
    fn defaults_without_environment() {
        let config = DeferredConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, DeferredConfig::default());
        assert_eq!(config.strategy, StrategyName::RandomFibonacci);
        assert_eq!(config.retry_timeout, Duration::from_secs(60));
        assert_eq!(config.maximum_polling, Duration::from_millis(1000));
    }

    #[test]
    fn reads_every_key() {
        let config = DeferredConfig::from_lookup(lookup(&[
            (ENV_RETRY_STRATEGY, "exponential"),
            (ENV_RETRY_TIMEOUT, "5s"),
            (ENV_MAXIMUM_POLLING_TIME, "200"),
        ]))
        .unwrap();
        assert_eq!(config.strategy, StrategyName::Exponential);
        assert_eq!(config.retry_timeout, Duration::from_secs(5));
        assert_eq!(config.maximum_polling, Duration::from_millis(200));
    }

    #[test]
    fn unknown_strategy_falls_back_to_constant() {
        let config =
            DeferredConfig::from_lookup(lookup(&[(ENV_RETRY_STRATEGY, "lucky")])).unwrap();
        assert_eq!(config.strategy, StrategyName::Constant);
        let first = config.backoff().delays().next();
        assert_eq!(first, Some(Duration::from_millis(250)));
    }

    #[test]
    fn invalid_duration_names_the_key() {
        let err =
            DeferredConfig::from_lookup(lookup(&[(ENV_RETRY_TIMEOUT, "soon")])).unwrap_err();
        assert!(err.to_string().contains(ENV_RETRY_TIMEOUT));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn strategy_names_round_trip_through_display() {
        for name in [
            StrategyName::RandomFibonacci,
            StrategyName::RandomExponential,
            StrategyName::Fibonacci,
            StrategyName::Exponential,
            StrategyName::Constant,
        ] {
            assert_eq!(name.to_string().parse::<StrategyName>().unwrap(), name);
        }
        assert_eq!("Random.Fibonacci".parse::<StrategyName>().unwrap(), StrategyName::RandomFibonacci);
    }

    #[test]
    fn fibonacci_strategy_is_deterministic() {
        let delays: Vec<_> = StrategyName::Fibonacci.backoff().delays().take(4).collect();
        assert_eq!(delays, [0, 1, 1, 2].map(Duration::from_millis).to_vec());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_from_json() {
        let config: DeferredConfig = serde_json::from_str(
            r#"{"strategy": "fibonacci", "retry_timeout": "10s"}"#,
        )
        .unwrap();
        assert_eq!(config.strategy, StrategyName::Fibonacci);
        assert_eq!(config.retry_timeout, Duration::from_secs(10));
        assert_eq!(config.maximum_polling, DEFAULT_MAXIMUM_POLLING);
    }
}
