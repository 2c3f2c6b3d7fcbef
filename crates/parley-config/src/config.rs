//! The root [`ParleyConfig`] type and its builder.

use std::net::SocketAddr;

use parley_telemetry::{LogConfig, LogOutput, MetricsConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};

use crate::{BotSection, ConfigError, LogFormat, ServerSection, TelemetrySection};

/// Complete bot configuration.
///
/// Load it with [`ConfigLoader`](crate::ConfigLoader); defaults apply to
/// every field a layer leaves unset.
///
/// # Example
///
/// ```
/// use parley_config::ParleyConfig;
///
/// let config = ParleyConfig::default();
/// assert_eq!(config.server.messages_path, "/api/messages");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Bot identity and tenant admission.
    #[serde(default)]
    pub bot: BotSection,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl ParleyConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ParleyConfigBuilder {
        ParleyConfigBuilder::new()
    }

    /// Checks cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field:
    /// - `server.http_addr` or an enabled `telemetry.metrics.addr` is not a
    ///   socket address
    /// - `server.messages_path` does not start with `/`
    /// - a timeout or `server.max_body_bytes` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if !self.server.messages_path.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "server.messages_path",
                "must start with '/'",
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.server.shutdown_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.shutdown_timeout_secs",
                "must be greater than zero",
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.telemetry.metrics.enabled
            && self.telemetry.metrics.addr.parse::<SocketAddr>().is_err()
        {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.addr",
                format!("invalid socket address: {}", self.telemetry.metrics.addr),
            ));
        }

        Ok(())
    }

    /// Local development: pretty debug logs, loopback bind.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.http_addr = "127.0.0.1:3978".to_string();
        config.telemetry.environment = "development".to_string();
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config
    }

    /// Production: JSON info logs and a Prometheus listener.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.telemetry.environment = "production".to_string();
        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.metrics.enabled = true;
        config
    }

    /// Converts the telemetry section for `parley_telemetry::init_telemetry`.
    #[must_use]
    pub fn to_telemetry_config(&self) -> TelemetryConfig {
        let section = &self.telemetry;
        let output = match section.logging.format {
            LogFormat::Json => LogOutput::Json,
            LogFormat::Pretty => LogOutput::Pretty,
        };

        TelemetryConfig::new(section.service_name.as_str())
            .with_environment(section.environment.as_str())
            .with_logging(LogConfig::new(section.logging.level.as_str(), output))
            .with_metrics(MetricsConfig {
                enabled: section.metrics.enabled,
                addr: section.metrics.addr.clone(),
                ..MetricsConfig::default()
            })
    }
}

/// Builder for [`ParleyConfig`].
#[derive(Debug, Default)]
pub struct ParleyConfigBuilder {
    server: Option<ServerSection>,
    bot: Option<BotSection>,
    telemetry: Option<TelemetrySection>,
}

impl ParleyConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server section.
    #[must_use]
    pub fn server(mut self, server: ServerSection) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the bot section.
    #[must_use]
    pub fn bot(mut self, bot: BotSection) -> Self {
        self.bot = Some(bot);
        self
    }

    /// Set the telemetry section.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetrySection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> ParleyConfig {
        ParleyConfig {
            server: self.server.unwrap_or_default(),
            bot: self.bot.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ParleyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.http_addr, "0.0.0.0:3978");
        assert_eq!(config.server.request_timeout_ms, 15_000);
        assert!(config.bot.allowed_tenants.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_addr() {
        let mut config = ParleyConfig::default();
        config.server.http_addr = "localhost".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.http_addr"));
    }

    #[test]
    fn test_validate_rejects_relative_messages_path() {
        let mut config = ParleyConfig::default();
        config.server.messages_path = "api/messages".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.messages_path"));
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = ParleyConfig::default();
        config.server.request_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ParleyConfig::default();
        config.server.shutdown_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metrics_addr_only_checked_when_enabled() {
        let mut config = ParleyConfig::default();
        config.telemetry.metrics.addr = "nowhere".to_string();
        assert!(config.validate().is_ok());

        config.telemetry.metrics.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_presets() {
        let dev = ParleyConfig::development();
        assert_eq!(dev.telemetry.logging.format, LogFormat::Pretty);
        assert_eq!(dev.server.http_addr, "127.0.0.1:3978");

        let prod = ParleyConfig::production();
        assert_eq!(prod.telemetry.environment, "production");
        assert!(prod.telemetry.metrics.enabled);
        assert!(prod.validate().is_ok());
    }

    #[test]
    fn test_to_telemetry_config() {
        let mut config = ParleyConfig::development();
        config.telemetry.service_name = "helpdesk-bot".to_string();

        let telemetry = config.to_telemetry_config();
        assert_eq!(telemetry.service_name, "helpdesk-bot");
        assert_eq!(telemetry.logging.filter, "debug");
        assert_eq!(telemetry.logging.output, LogOutput::Pretty);
        assert!(!telemetry.metrics.enabled);
    }

    #[test]
    fn test_builder() {
        let config = ParleyConfig::builder()
            .bot(BotSection {
                app_id: "app-1".to_string(),
                allowed_tenants: vec!["contoso".to_string()],
                ..BotSection::default()
            })
            .build();

        assert_eq!(config.bot.app_id, "app-1");
        assert_eq!(config.server, ServerSection::default());
    }
}
