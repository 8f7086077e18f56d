use std::time::Duration;

/// Errors raised while reading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Provider credentials and endpoint.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// `None` leaves the provider unconfigured; every model run then fails
    /// with a descriptive error instead of the server refusing to start.
    pub api_key: Option<String>,
    pub api_url: String,
    /// Sent as `HTTP-Referer`.
    pub app_url: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// Time allowed to produce response headers, in seconds (default: `30`).
    /// Event-stream bodies are not bounded by it.
    pub request_timeout_secs: u64,
    /// How often the event-stream endpoint polls the store (default: `500`).
    pub stream_poll_interval_ms: u64,
    pub openrouter: OpenRouterConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                         |
    /// |---------------------------|---------------------------------|
    /// | `HOST`                    | `0.0.0.0`                       |
    /// | `PORT`                    | `3000`                          |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`         |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                            |
    /// | `STREAM_POLL_INTERVAL_MS` | `500`                           |
    /// | `OPENROUTER_API_KEY`      | unset                           |
    /// | `OPENROUTER_API_URL`      | `https://openrouter.ai/api/v1`  |
    /// | `APP_URL`                 | `http://localhost:3000`         |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parse_var("PORT", "u16", 3000)?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", "u64", 30)?;
        let stream_poll_interval_ms = parse_var("STREAM_POLL_INTERVAL_MS", "u64", 500)?;

        let openrouter = OpenRouterConfig {
            api_key: std::env::var("OPENROUTER_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            api_url: std::env::var("OPENROUTER_API_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".into()),
            app_url: std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".into()),
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            stream_poll_interval_ms,
            openrouter,
        })
    }

    pub fn stream_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stream_poll_interval_ms)
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}
