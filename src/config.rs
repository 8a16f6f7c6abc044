//! Environment-driven server configuration.

use std::time::Duration;

use tracing::warn;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_CONNECTIONS: usize = 1000;
pub const DEFAULT_TURN_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
    /// Global default turn timeout; lobbies override it per game.
    pub turn_timeout_secs: u64,
    pub log_level: Option<String>,
    /// Advisory: handed to the persistence collaborator when present.
    pub database_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            turn_timeout_secs: DEFAULT_TURN_TIMEOUT_SECS,
            log_level: None,
            database_url: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("SERVER_HOST").unwrap_or(defaults.host),
            port: parse_var("SERVER_PORT", defaults.port),
            max_connections: parse_var("MAX_CONNECTIONS", defaults.max_connections),
            turn_timeout_secs: parse_var("TURN_TIMEOUT_SECS", defaults.turn_timeout_secs),
            log_level: std::env::var("LOG_LEVEL").ok(),
            database_url: std::env::var("DATABASE_URL").ok(),
        }
    }

    /// Grace for sessions outside any lobby or game.
    pub fn default_reconnect_grace(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs * 4)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "unparseable env var; using default");
            default
        }),
        Err(_) => default,
    }
}
