//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `NUMBER_OF_SHARDS`: shard count for cart routing (default: `100`)
/// - `ASK_TIMEOUT_MS`: wait for a cart reply (default: `3000`)
/// - `ENTITY_IDLE_TIMEOUT_MS`: idle time before a cart entity stops (default: `120000`)
/// - `PROJECTION_POLL_INTERVAL_MS`: projector tail interval (default: `1000`)
/// - `DATABASE_URL`: PostgreSQL URL; in-memory stores when unset
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub number_of_shards: u32,
    pub ask_timeout: Duration,
    pub entity_idle_timeout: Duration,
    pub projection_poll_interval: Duration,
    pub database_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from any key lookup. Unparsable values fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            number_of_shards: lookup("NUMBER_OF_SHARDS")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.number_of_shards),
            ask_timeout: parsed("ASK_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.ask_timeout),
            entity_idle_timeout: parsed("ENTITY_IDLE_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.entity_idle_timeout),
            projection_poll_interval: parsed("PROJECTION_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.projection_poll_interval),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            number_of_shards: 100,
            ask_timeout: Duration::from_secs(3),
            entity_idle_timeout: Duration::from_secs(120),
            projection_poll_interval: Duration::from_secs(1),
            database_url: None,
        }
    }
}
