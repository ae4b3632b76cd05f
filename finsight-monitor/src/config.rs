//! Monitor configuration
//!
//! Defines the tunable parameters of the poll fallback: how often to hit
//! the status endpoint and how long to keep trying before the watchdog
//! gives up.

use std::time::Duration;

/// Monitor configuration
///
/// Both values are configurable to allow tuning for different deployment
/// scenarios (dev vs prod, fast vs slow backends).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// How often the poll fallback queries the status endpoint
    pub poll_interval: Duration,

    /// Maximum total time the poll fallback runs before its watchdog
    /// closes it, regardless of how many individual requests failed
    pub poll_max_duration: Duration,
}

impl MonitorConfig {
    /// Creates a configuration with defaults (2s interval, 5min watchdog)
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            poll_max_duration: Duration::from_secs(300),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - POLL_INTERVAL_MS (optional, default: 2000)
    /// - POLL_MAX_DURATION_MS (optional, default: 300000)
    pub fn from_env() -> Self {
        let poll_interval = std::env::var("POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(2));

        let poll_max_duration = std::env::var("POLL_MAX_DURATION_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(300));

        Self {
            poll_interval,
            poll_max_duration,
        }
    }

    /// Overrides the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the watchdog bound
    pub fn with_poll_max_duration(mut self, max_duration: Duration) -> Self {
        self.poll_max_duration = max_duration;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.poll_max_duration.is_zero() {
            anyhow::bail!("poll_max_duration must be greater than 0");
        }

        if self.poll_max_duration < self.poll_interval {
            anyhow::bail!("poll_max_duration must be at least one poll_interval");
        }

        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new()
    }
}
