//! Logs and turn metrics for Parley bots.
//!
//! Logging goes through `tracing` with a `tracing-subscriber` formatter
//! installed by [`init_logging`]. Turn counters and latency histograms go
//! through the `metrics` facade and are exported for Prometheus by
//! [`init_metrics`]; the metric names are listed in [`metrics`].
//!
//! ```rust,ignore
//! use parley_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(
//!     &TelemetryConfig::new("helpdesk-bot").with_metrics_addr("0.0.0.0:9464"),
//! )?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogOutput};
pub use metrics::{init_metrics, InFlightGuard, MetricsConfig, TurnOutcome};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Installs the log subscriber, then the metrics exporter.
///
/// # Errors
///
/// Stops at the first failure; logging may already be installed when
/// metrics fail.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics, &config.service_name)?;
    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        metrics = config.metrics.enabled,
        "Telemetry ready"
    );
    Ok(())
}
