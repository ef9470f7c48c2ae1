//! Connection pool configuration

use std::time::Duration;

use serde::Deserialize;

use crate::{ConfigError, Result};

/// Pool sizing and maintenance knobs for stream senders
///
/// # Example
///
/// ```toml
/// [senders.tcp.pool]
/// max_active = 4
/// min_idle = 1
/// max_wait = "2s"
/// test_on_borrow = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Most connections checked out at once (0 = unbounded)
    /// Default: 8
    pub max_active: usize,

    /// Idle connections the sweep keeps around
    /// Default: 0
    pub min_idle: usize,

    /// How long `acquire` waits for a free slot
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub max_wait: Duration,

    /// Idle time after which a connection is always closed
    /// Default: 5m
    #[serde(with = "humantime_serde")]
    pub min_evictable_idle_time: Duration,

    /// Idle time after which a connection is closed if `min_idle` still holds
    /// (zero disables)
    /// Default: 0
    #[serde(with = "humantime_serde")]
    pub soft_min_evictable_idle_time: Duration,

    /// Period of the eviction sweep (zero disables the background task)
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub eviction_run_interval: Duration,

    /// Idle connections inspected per sweep (0 = all)
    /// Default: 3
    pub num_tests_per_eviction_run: usize,

    /// Probe liveness before handing a connection out
    /// Default: false
    pub test_on_borrow: bool,

    /// Probe liveness when a connection comes back
    /// Default: false
    pub test_on_return: bool,

    /// Probe idle survivors during the sweep
    /// Default: false
    pub test_while_idle: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_active: 8,
            min_idle: 0,
            max_wait: Duration::from_secs(5),
            min_evictable_idle_time: Duration::from_secs(300),
            soft_min_evictable_idle_time: Duration::ZERO,
            eviction_run_interval: Duration::from_secs(30),
            num_tests_per_eviction_run: 3,
            test_on_borrow: false,
            test_on_return: false,
            test_while_idle: false,
        }
    }
}

impl PoolConfig {
    /// Check `min_idle ≤ max_active` when the pool is bounded
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.max_active > 0 && self.min_idle > self.max_active {
            return Err(ConfigError::invalid_value(
                "pool",
                name,
                "min_idle",
                format!(
                    "min_idle ({}) exceeds max_active ({})",
                    self.min_idle, self.max_active
                ),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_max_active(mut self, max_active: usize) -> Self {
        self.max_active = max_active;
        self
    }

    #[must_use]
    pub fn with_min_idle(mut self, min_idle: usize) -> Self {
        self.min_idle = min_idle;
        self
    }

    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    #[must_use]
    pub fn with_eviction(
        mut self,
        interval: Duration,
        min_evictable: Duration,
        soft_min_evictable: Duration,
    ) -> Self {
        self.eviction_run_interval = interval;
        self.min_evictable_idle_time = min_evictable;
        self.soft_min_evictable_idle_time = soft_min_evictable;
        self
    }

    #[must_use]
    pub fn with_tests(mut self, on_borrow: bool, on_return: bool, while_idle: bool) -> Self {
        self.test_on_borrow = on_borrow;
        self.test_on_return = on_return;
        self.test_while_idle = while_idle;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert!(PoolConfig::default().validate("tcp").is_ok());
    }

    #[test]
    fn test_min_idle_above_max_active_rejected() {
        let config = PoolConfig::default().with_max_active(2).with_min_idle(3);
        let err = config.validate("tcp").unwrap_err();
        assert!(err.to_string().contains("min_idle"));
    }

    #[test]
    fn test_unbounded_allows_any_min_idle() {
        let config = PoolConfig::default().with_max_active(0).with_min_idle(10);
        assert!(config.validate("tcp").is_ok());
    }

    #[test]
    fn test_deserialize() {
        let toml = r#"
max_active = 1
max_wait = "100ms"
test_on_borrow = true
"#;
        let config: PoolConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_active, 1);
        assert_eq!(config.max_wait, Duration::from_millis(100));
        assert!(config.test_on_borrow);
        assert!(!config.test_on_return);
    }
}
