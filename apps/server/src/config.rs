//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. Only the upstream base URL is required; everything else has a
//! sensible local-development default.

use std::env;
use std::time::Duration;

/// Waterline server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub port: u16,

    /// Path to the SQLite database file
    pub database_path: String,

    /// Base URL of the upstream utility-management API
    pub upstream_base_url: String,

    /// Timeout for upstream requests
    pub upstream_timeout: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ServerConfig {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,

            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "waterline.db".to_string()),

            upstream_base_url: env::var("UPSTREAM_BASE_URL")
                .map_err(|_| ConfigError::MissingRequired("UPSTREAM_BASE_URL".to_string()))?,

            upstream_timeout: Duration::from_secs(
                env::var("UPSTREAM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("UPSTREAM_TIMEOUT_SECS".to_string()))?,
            ),
        };

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test covers both branches: env mutation is process-wide and
    // parallel tests over the same variable would race.
    #[test]
    fn test_load_requires_upstream_base_url() {
        env::remove_var("UPSTREAM_BASE_URL");
        let err = ServerConfig::load().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));

        env::set_var("UPSTREAM_BASE_URL", "http://upstream.test/api");
        let config = ServerConfig::load().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, "waterline.db");
        assert_eq!(config.upstream_timeout, Duration::from_secs(30));
        env::remove_var("UPSTREAM_BASE_URL");
    }
}
