//! Endpoint settings.
//!
//! ```rust
//! use parley_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:3978")
//!     .messages_path("api/messages")
//!     .request_timeout(Duration::from_secs(10))
//!     .build();
//!
//! assert_eq!(config.messages_path(), "/api/messages");
//! ```

use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

/// Bot Framework's conventional port.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3978";

/// Where the channel POSTs activities.
pub const DEFAULT_MESSAGES_PATH: &str = "/api/messages";

/// Upper bound on an activity body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Bind address, paths, limits and the identity `/health` reports.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    http_addr: String,
    messages_path: String,
    request_timeout: Duration,
    shutdown_timeout: Duration,
    max_body_bytes: usize,
    service_name: String,
    service_version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            messages_path: DEFAULT_MESSAGES_PATH.to_string(),
            request_timeout: Duration::from_secs(15),
            shutdown_timeout: Duration::from_secs(30),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            service_name: "parley-bot".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Starts from the defaults.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Bind address as configured.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// The bind address as a socket address.
    ///
    /// # Errors
    ///
    /// When `http_addr` is not `ip:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.http_addr.parse()
    }

    /// Path that accepts activities.
    #[must_use]
    pub fn messages_path(&self) -> &str {
        &self.messages_path
    }

    /// Applies twice per request: once to reading the body and once to the
    /// turn.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// How long open connections get to finish after shutdown is signalled.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Bodies larger than this are rejected as invalid activities.
    #[must_use]
    pub const fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Reported by `/health`.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Reported by `/health`.
    #[must_use]
    pub fn service_version(&self) -> &str {
        &self.service_version
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
#[must_use]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// `"127.0.0.1:0"` picks a free port.
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_addr = addr.into();
        self
    }

    /// A leading `/` is added when missing.
    pub fn messages_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.config.messages_path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    /// Sets the body read and turn timeout.
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Sets the drain timeout.
    pub const fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Sets the body size limit.
    pub const fn max_body_bytes(mut self, limit: usize) -> Self {
        self.config.max_body_bytes = limit;
        self
    }

    /// Sets the name `/health` reports.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = name.into();
        self
    }

    /// Sets the version `/health` reports.
    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.config.service_version = version.into();
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_bot_framework_conventions() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().port(), 3978);
        assert_eq!(config.messages_path(), "/api/messages");
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_body_bytes(), 1_048_576);
    }

    #[test]
    fn test_messages_path_normalized() {
        let relative = ServerConfig::builder().messages_path("bot/messages").build();
        let absolute = ServerConfig::builder().messages_path("/bot/messages").build();
        assert_eq!(relative.messages_path(), "/bot/messages");
        assert_eq!(absolute.messages_path(), "/bot/messages");
    }

    #[test]
    fn test_unparsable_addr_kept_until_bind() {
        let config = ServerConfig::builder().http_addr("localhost").build();
        assert_eq!(config.http_addr(), "localhost");
        assert!(config.socket_addr().is_err());
    }
}
