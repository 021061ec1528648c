//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Default inbound message budget per connection (messages/second)
const DEFAULT_INPUT_RATE_LIMIT: u32 = 60;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS; empty means any
    pub client_origins: Vec<String>,
    /// Inbound messages per second accepted from one connection
    pub input_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Supervisors hand us PORT; fall back to SERVER_ADDR or the default
        let server_addr = match get("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => get("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:10000".to_string()),
        };

        let input_rate_limit = match get("INPUT_RATE_LIMIT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("INPUT_RATE_LIMIT"))?,
            None => DEFAULT_INPUT_RATE_LIMIT,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origins: get("CLIENT_ORIGIN")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            input_rate_limit,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr.port(), 10000);
        assert_eq!(config.log_level, "info");
        assert!(config.client_origins.is_empty());
        assert_eq!(config.input_rate_limit, DEFAULT_INPUT_RATE_LIMIT);
    }

    #[test]
    fn port_wins_over_server_addr() {
        let config = load(&[("PORT", "4321"), ("SERVER_ADDR", "127.0.0.1:9")]).unwrap();
        assert_eq!(config.server_addr.port(), 4321);
    }

    #[test]
    fn origins_are_split() {
        let config = load(&[("CLIENT_ORIGIN", "https://a.test, https://b.test,")]).unwrap();
        assert_eq!(config.client_origins, vec!["https://a.test", "https://b.test"]);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(load(&[("SERVER_ADDR", "nope")]), Err(ConfigError::InvalidAddress)));
        assert!(matches!(
            load(&[("INPUT_RATE_LIMIT", "lots")]),
            Err(ConfigError::Invalid("INPUT_RATE_LIMIT"))
        ));
    }
}
