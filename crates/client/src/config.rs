//! Client configuration from environment variables.

use std::time::Duration;

use crate::error::ConfigError;
use crate::ws::ReconnectConfig;

pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_BUFFER_CAPACITY: usize = 20;
pub const DEFAULT_DEDUP_HORIZON: usize = 256;

/// Tunables for a [`crate::NotificationService`].
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Heartbeat ping interval. The connection is stale after twice this.
    pub ping_interval: Duration,
    /// Upper bound on a single open attempt.
    pub connect_timeout: Duration,
    pub reconnect: ReconnectConfig,
    /// Number of recent notifications retained for late consumers.
    pub buffer_capacity: usize,
    /// Number of recent event ids retained for duplicate suppression.
    pub dedup_horizon: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectConfig::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            dedup_horizon: DEFAULT_DEDUP_HORIZON,
        }
    }
}

impl NotificationConfig {
    /// Build a config from the environment, falling back to defaults.
    ///
    /// Environment variables:
    /// - `PROPWATCH_PING_INTERVAL_SECS` (default: 30)
    /// - `PROPWATCH_CONNECT_TIMEOUT_SECS` (default: 5)
    /// - `PROPWATCH_RECONNECT_DELAY_SECS` (default: 5)
    /// - `PROPWATCH_RECONNECT_MAX_DELAY_SECS` (default: 30)
    /// - `PROPWATCH_RECONNECT_MAX_ATTEMPTS` (default: unlimited, `0` = unlimited)
    /// - `PROPWATCH_BUFFER_CAPACITY` (default: 20)
    /// - `PROPWATCH_DEDUP_HORIZON` (default: 256)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64>(&lookup, "PROPWATCH_PING_INTERVAL_SECS")? {
            config.ping_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "PROPWATCH_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "PROPWATCH_RECONNECT_DELAY_SECS")? {
            config.reconnect.delay = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "PROPWATCH_RECONNECT_MAX_DELAY_SECS")? {
            config.reconnect.max_delay = Duration::from_secs(secs);
        }
        if let Some(max) = parse_var::<u32>(&lookup, "PROPWATCH_RECONNECT_MAX_ATTEMPTS")? {
            config.reconnect.max_attempts = (max > 0).then_some(max);
        }
        if let Some(cap) = parse_var::<usize>(&lookup, "PROPWATCH_BUFFER_CAPACITY")? {
            config.buffer_capacity = cap;
        }
        if let Some(horizon) = parse_var::<usize>(&lookup, "PROPWATCH_DEDUP_HORIZON")? {
            config.dedup_horizon = horizon;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ping_interval.is_zero() {
            return Err(ConfigError::Invalid("ping interval must be non-zero".into()));
        }
        if self.dedup_horizon == 0 {
            return Err(ConfigError::Invalid("dedup horizon must be non-zero".into()));
        }
        if self.dedup_horizon < self.buffer_capacity {
            return Err(ConfigError::Invalid(format!(
                "dedup horizon ({}) must be at least the buffer capacity ({})",
                self.dedup_horizon, self.buffer_capacity
            )));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Parse { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = NotificationConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.ping_interval, Duration::from_secs(30));
        assert_eq!(config.reconnect.delay, Duration::from_secs(5));
        assert_eq!(config.reconnect.max_attempts, None);
        assert_eq!(config.buffer_capacity, 20);
        assert_eq!(config.dedup_horizon, 256);
    }

    #[test]
    fn overrides_are_applied() {
        let config = NotificationConfig::from_lookup(lookup(&[
            ("PROPWATCH_PING_INTERVAL_SECS", "10"),
            ("PROPWATCH_RECONNECT_MAX_ATTEMPTS", "3"),
            ("PROPWATCH_BUFFER_CAPACITY", "5"),
        ]))
        .unwrap();
        assert_eq!(config.ping_interval, Duration::from_secs(10));
        assert_eq!(config.reconnect.max_attempts, Some(3));
        assert_eq!(config.buffer_capacity, 5);
    }

    #[test]
    fn zero_attempts_means_unlimited() {
        let config =
            NotificationConfig::from_lookup(lookup(&[("PROPWATCH_RECONNECT_MAX_ATTEMPTS", "0")]))
                .unwrap();
        assert_eq!(config.reconnect.max_attempts, None);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = NotificationConfig::from_lookup(lookup(&[("PROPWATCH_BUFFER_CAPACITY", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { name: "PROPWATCH_BUFFER_CAPACITY", .. }));
    }

    #[test]
    fn dedup_horizon_must_cover_buffer() {
        let err = NotificationConfig::from_lookup(lookup(&[
            ("PROPWATCH_BUFFER_CAPACITY", "50"),
            ("PROPWATCH_DEDUP_HORIZON", "10"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
