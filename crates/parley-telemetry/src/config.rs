//! Combined logging and metrics settings.

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;

/// Everything [`init_telemetry`](crate::init_telemetry) needs.
///
/// `service_name` becomes the `service` label on every metric.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Name reported in logs and metric labels.
    pub service_name: String,
    /// Deployment environment, e.g. `production`.
    pub environment: String,
    /// Log subscriber.
    pub logging: LogConfig,
    /// Prometheus exporter.
    pub metrics: MetricsConfig,
}

impl TelemetryConfig {
    /// Defaults for `service_name`: JSON logs at `info`, metrics off.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            environment: "development".to_string(),
            logging: LogConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }

    /// Sets the environment.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Replaces the log settings.
    #[must_use]
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Replaces the metrics settings.
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = metrics;
        self
    }

    /// Turns the exporter on, listening on `addr`.
    #[must_use]
    pub fn with_metrics_addr(mut self, addr: impl Into<String>) -> Self {
        self.metrics.enabled = true;
        self.metrics.addr = addr.into();
        self
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::new("parley-bot")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogOutput;

    #[test]
    fn test_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "parley-bot");
        assert_eq!(config.environment, "development");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_with_chain() {
        let config = TelemetryConfig::new("helpdesk-bot")
            .with_environment("production")
            .with_logging(LogConfig::new("warn", LogOutput::Pretty))
            .with_metrics_addr("127.0.0.1:9464");

        assert_eq!(config.environment, "production");
        assert_eq!(config.logging.output, LogOutput::Pretty);
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.addr, "127.0.0.1:9464");
    }
}
