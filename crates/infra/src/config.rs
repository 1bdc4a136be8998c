//! Configuration loading and representation.
//!
//! Environment variables (all optional):
//!
//! | Variable | Default |
//! |----------|---------|
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `JWT_SECRET` | insecure dev secret (logged as a warning) |
//! | `RPC_SECRET` | insecure dev secret (logged as a warning) |
//! | `DATABASE_URL` | unset: in-memory store |
//! | `DATABASE_MAX_CONNECTIONS` | `10` |
//! | `REDIS_URL` | unset: in-memory channel |
//! | `BROKER_TIMEOUT_MS` | `2000` |
//! | `DISTRIBUTION_EXCHANGE` | `distribution.exchange` |
//! | `DISTRIBUTION_ROUTING_KEY` | `calculation.request` |

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::plan_dispatcher::Routing;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEV_RPC_SECRET: &str = "dev-rpc-secret";
const DEFAULT_BROKER_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Bearer token the plan calculator presents on the ProcessPlan callback.
    pub rpc_secret: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub broker_timeout: Duration,
    pub routing: Routing,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (tests inject a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                message: format!("'{raw}': {e}"),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let rpc_secret = get("RPC_SECRET").unwrap_or_else(|| {
            warn!("RPC_SECRET not set; using insecure dev default");
            DEV_RPC_SECRET.to_string()
        });

        let broker_timeout = match get("BROKER_TIMEOUT_MS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "BROKER_TIMEOUT_MS",
                        message: format!("'{raw}' is not a positive integer"),
                    });
                }
            },
            None => DEFAULT_BROKER_TIMEOUT,
        };

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "DATABASE_MAX_CONNECTIONS",
                        message: format!("'{raw}' is not a positive integer"),
                    });
                }
            },
            None => 10,
        };

        let defaults = Routing::default();
        let routing = Routing {
            exchange: get("DISTRIBUTION_EXCHANGE").unwrap_or(defaults.exchange),
            routing_key: get("DISTRIBUTION_ROUTING_KEY").unwrap_or(defaults.routing_key),
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            rpc_secret,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            redis_url: get("REDIS_URL"),
            broker_timeout,
            routing,
        })
    }

    /// Dev/test settings: in-memory backends, ephemeral port.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: jwt_secret.into(),
            rpc_secret: DEV_RPC_SECRET.to_string(),
            database_url: None,
            database_max_connections: 10,
            redis_url: None,
            broker_timeout: DEFAULT_BROKER_TIMEOUT,
            routing: Routing::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_dev_defaults() {
        let s = Settings::from_lookup(lookup(&[])).unwrap();

        assert_eq!(s.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(s.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(s.rpc_secret, DEV_RPC_SECRET);
        assert_eq!(s.broker_timeout, Duration::from_millis(2000));
        assert_eq!(s.database_url, None);
        assert_eq!(s.redis_url, None);
        assert_eq!(s.routing, Routing::default());
    }

    #[test]
    fn overrides_are_read_and_blank_values_ignored() {
        let s = Settings::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://localhost/stockshift"),
            ("REDIS_URL", "  "),
            ("DISTRIBUTION_EXCHANGE", "dist.x"),
            ("RPC_SECRET", "calc-token"),
            ("BROKER_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(s.bind_addr.port(), 9000);
        assert_eq!(s.database_url.as_deref(), Some("postgres://localhost/stockshift"));
        assert_eq!(s.redis_url, None);
        assert_eq!(s.routing.exchange, "dist.x");
        assert_eq!(s.routing.routing_key, "calculation.request");
        assert_eq!(s.rpc_secret, "calc-token");
        assert_eq!(s.broker_timeout, Duration::from_millis(250));
    }

    #[test]
    fn malformed_values_are_config_errors() {
        let err = Settings::from_lookup(lookup(&[("BIND_ADDR", "nowhere")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BIND_ADDR", .. }));

        let err = Settings::from_lookup(lookup(&[("DATABASE_MAX_CONNECTIONS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DATABASE_MAX_CONNECTIONS", .. }));

        let err = Settings::from_lookup(lookup(&[("BROKER_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BROKER_TIMEOUT_MS", .. }));
    }
}
