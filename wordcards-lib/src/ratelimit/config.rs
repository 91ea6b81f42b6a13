use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default time between two probes while rate limited
const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration of the shared backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Time to wait before each probe of a rate limited source.
    /// The interval is flat; it does not grow with repeated probes.
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}

/// Default time between two probes while rate limited
const fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

impl BackoffConfig {
    /// Create a `BackoffConfig` from CLI options, using defaults for missing values
    #[must_use]
    pub fn from_options(interval: Option<Duration>) -> Self {
        Self {
            interval: interval.unwrap_or(DEFAULT_INTERVAL),
        }
    }
}
