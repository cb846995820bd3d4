//! Server configuration module
//! Handles runtime configuration parameters for the chat relay

use crate::constants::{
    DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_CORS_ORIGIN, DEFAULT_HOST, DEFAULT_PING_INTERVAL_SECS,
    DEFAULT_PORT, DEFAULT_STATIC_DIR,
};
use crate::error::{ChatError, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding the pre-built client assets
    pub static_dir: PathBuf,
    /// Interval between keepalive pings sent to each client
    pub ping_interval: Duration,
    /// A connection silent for this long is treated as disconnected
    pub connection_timeout: Duration,
    /// Allowed CORS origin, `*` for any
    pub cors_origin: String,
}

impl ServerConfig {
    /// Configuration used by tests: loopback host, ephemeral port
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            ping_interval: Duration::from_secs(DEFAULT_PING_INTERVAL_SECS),
            connection_timeout: Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
        }
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("RUSTY_CHAT_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        // PORT is honoured for platforms that inject it
        let port = match lookup("RUSTY_CHAT_PORT").or_else(|| lookup("PORT")) {
            Some(raw) => parse_value::<u16>("port", &raw)?,
            None => DEFAULT_PORT,
        };

        let static_dir = lookup("RUSTY_CHAT_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        let ping_secs = match lookup("RUSTY_CHAT_PING") {
            Some(raw) => parse_value::<u64>("ping interval", &raw)?,
            None => DEFAULT_PING_INTERVAL_SECS,
        };

        let timeout_secs = match lookup("RUSTY_CHAT_TIMEOUT") {
            Some(raw) => parse_value::<u64>("connection timeout", &raw)?,
            None => DEFAULT_CONNECTION_TIMEOUT_SECS,
        };

        let cors_origin =
            lookup("RUSTY_CHAT_CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());

        let config = Self {
            host,
            port,
            static_dir,
            ping_interval: Duration::from_secs(ping_secs),
            connection_timeout: Duration::from_secs(timeout_secs),
            cors_origin,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.ping_interval.is_zero() {
            return Err(ChatError::ConfigError(
                "ping interval must be at least one second".to_string(),
            ));
        }
        if self.cors_origin != "*" && !is_serialized_origin(&self.cors_origin) {
            return Err(ChatError::ConfigError(format!(
                "CORS origin must be `*` or scheme://host[:port], got {:?}",
                self.cors_origin
            )));
        }
        if self.connection_timeout <= self.ping_interval {
            return Err(ChatError::ConfigError(format!(
                "connection timeout ({}s) must exceed the ping interval ({}s)",
                self.connection_timeout.as_secs(),
                self.ping_interval.as_secs()
            )));
        }
        Ok(())
    }

    /// Address string suitable for parsing into a `SocketAddr`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// True when `origin` is already in the form browsers send, e.g. `https://chat.example.com:8443`
fn is_serialized_origin(origin: &str) -> bool {
    match Url::parse(origin) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.origin().ascii_serialization() == origin
        }
        Err(_) => false,
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ChatError::ConfigError(format!("invalid {}: {:?}", name, raw)))
}
