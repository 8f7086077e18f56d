use std::time::Duration;

/// Errors raised while reading session configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Client session configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Studio server base URL (default: `http://localhost:3000`).
    pub api_url: String,
    /// Page size used when re-listing generations (default: `50`).
    pub list_limit: u32,
    /// How long teardown waits for each subscription task (default: `5`).
    pub shutdown_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            list_limit: 50,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `STUDIO_API_URL`               | `http://localhost:3000` |
    /// | `STUDIO_LIST_LIMIT`            | `50`                    |
    /// | `STUDIO_SHUTDOWN_TIMEOUT_SECS` | `5`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let api_url = std::env::var("STUDIO_API_URL").unwrap_or(defaults.api_url);

        let list_limit = match std::env::var("STUDIO_LIST_LIMIT") {
            Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "STUDIO_LIST_LIMIT",
                expected: "u32",
                value: raw,
            })?,
            Err(_) => defaults.list_limit,
        };

        let shutdown_timeout = match std::env::var("STUDIO_SHUTDOWN_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(raw.trim().parse().map_err(|_| {
                ConfigError::Invalid {
                    name: "STUDIO_SHUTDOWN_TIMEOUT_SECS",
                    expected: "u64",
                    value: raw,
                }
            })?),
            Err(_) => defaults.shutdown_timeout,
        };

        Ok(Self {
            api_url,
            list_limit,
            shutdown_timeout,
        })
    }
}
