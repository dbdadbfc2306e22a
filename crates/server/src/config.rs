//! Server configuration from environment variables.

use std::net::SocketAddr;

/// How events are fanned out to connected clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Every event goes to every connection; clients filter for themselves.
    Unfiltered,
    /// Only events matching a connection's active filter are forwarded.
    Filtered,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name}: cannot parse {value:?}")]
    Parse { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Per-connection backlog before a slow client starts missing events.
    pub broadcast_capacity: usize,
    pub dispatch: DispatchMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            broadcast_capacity: 100,
            dispatch: DispatchMode::Unfiltered,
        }
    }
}

impl ServerConfig {
    /// Parse server configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PROPWATCH_BIND`: listen address (default: "0.0.0.0:8080")
    /// - `PROPWATCH_BROADCAST_CAPACITY`: broadcast backlog (default: 100)
    /// - `PROPWATCH_DISPATCH`: "unfiltered" | "filtered" (default: "unfiltered")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("PROPWATCH_BIND") {
            config.bind = raw.trim().parse().map_err(|_| ConfigError::Parse {
                name: "PROPWATCH_BIND",
                value: raw,
            })?;
        }
        if let Some(raw) = lookup("PROPWATCH_BROADCAST_CAPACITY") {
            config.broadcast_capacity = match raw.trim().parse::<usize>() {
                Ok(cap) if cap > 0 => cap,
                _ => {
                    return Err(ConfigError::Parse {
                        name: "PROPWATCH_BROADCAST_CAPACITY",
                        value: raw,
                    })
                }
            };
        }
        if let Some(raw) = lookup("PROPWATCH_DISPATCH") {
            config.dispatch = match raw.trim().to_lowercase().as_str() {
                "unfiltered" => DispatchMode::Unfiltered,
                "filtered" => DispatchMode::Filtered,
                _ => {
                    return Err(ConfigError::Parse {
                        name: "PROPWATCH_DISPATCH",
                        value: raw,
                    })
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(|name| match name {
            "PROPWATCH_BIND" => Some("127.0.0.1:9000".into()),
            "PROPWATCH_DISPATCH" => Some("Filtered".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.bind, SocketAddr::from(([127, 0, 0, 1], 9000)));
        assert_eq!(config.dispatch, DispatchMode::Filtered);
        assert_eq!(config.broadcast_capacity, 100);
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = ServerConfig::from_lookup(|name| {
            (name == "PROPWATCH_BROADCAST_CAPACITY").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { name: "PROPWATCH_BROADCAST_CAPACITY", .. }));
    }
}
