//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use notifications::RelayConfig;
use thiserror::Error;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Error)]
#[error("Unknown log format: {0} (expected text or json)")]
pub struct UnknownLogFormat(String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(UnknownLogFormat(other.to_string())),
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
/// - `DATABASE_URL`: Postgres URL; the in-memory store is used when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `OUTBOX_POLL_INTERVAL_MS`: relay poll period (default: `2000`)
/// - `OUTBOX_BATCH_SIZE`: events per relay tick (default: `50`)
///
/// SMTP settings are read separately by `notifications::EmailConfig`.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub outbox_poll_interval: Duration,
    pub outbox_batch_size: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    ///
    /// Unparseable values fall back to the default as well.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parsed("LOG_FORMAT").unwrap_or(defaults.log_format),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            outbox_poll_interval: parsed("OUTBOX_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.outbox_poll_interval),
            outbox_batch_size: parsed("OUTBOX_BATCH_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.outbox_batch_size),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Polling parameters for the outbox relay.
    pub fn relay(&self) -> RelayConfig {
        RelayConfig {
            poll_interval: self.outbox_poll_interval,
            batch_size: self.outbox_batch_size,
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|raw| raw.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            outbox_poll_interval: Duration::from_millis(2000),
            outbox_batch_size: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: [&str; 8] = [
        "HOST",
        "PORT",
        "RUST_LOG",
        "LOG_FORMAT",
        "DATABASE_URL",
        "DATABASE_MAX_CONNECTIONS",
        "OUTBOX_POLL_INTERVAL_MS",
        "OUTBOX_BATCH_SIZE",
    ];

    fn clear_env() {
        for key in KEYS {
            // SAFETY: serialized with every other test touching the environment.
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.relay(), RelayConfig::default());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    #[serial]
    fn from_env_reads_overrides() {
        clear_env();
        // SAFETY: serialized with every other test touching the environment.
        unsafe {
            std::env::set_var("PORT", "8081");
            std::env::set_var("LOG_FORMAT", "JSON");
            std::env::set_var("DATABASE_URL", "postgres://localhost/pedidos");
            std::env::set_var("OUTBOX_POLL_INTERVAL_MS", "250");
            std::env::set_var("OUTBOX_BATCH_SIZE", "5");
        }

        let config = Config::from_env();
        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/pedidos"));
        assert_eq!(config.relay().poll_interval, Duration::from_millis(250));
        assert_eq!(config.relay().batch_size, 5);

        clear_env();
    }

    #[test]
    #[serial]
    fn from_env_ignores_invalid_values() {
        clear_env();
        // SAFETY: serialized with every other test touching the environment.
        unsafe {
            std::env::set_var("PORT", "not-a-port");
            std::env::set_var("LOG_FORMAT", "xml");
            std::env::set_var("DATABASE_URL", "  ");
            std::env::set_var("OUTBOX_BATCH_SIZE", "0");
        }

        let config = Config::from_env();
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.outbox_batch_size, 50);

        clear_env();
    }
}
