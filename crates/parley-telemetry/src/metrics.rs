//! Prometheus metrics for Parley.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `parley_turns_total` | Counter | `activity_type`, `outcome` | Completed turns |
//! | `parley_turn_duration_seconds` | Histogram | `activity_type` | Turn latency |
//! | `parley_in_flight_turns` | Gauge | - | Turns currently running |
//! | `parley_outbound_activities_total` | Counter | `outcome` | Activities sent to the conversation service |
//!
//! # Example
//!
//! ```rust
//! use parley_telemetry::metrics::{record_turn, TurnOutcome};
//! use std::time::Duration;
//!
//! record_turn("message", TurnOutcome::Handled, Duration::from_millis(12));
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

/// Counter of completed turns.
pub const TURNS_TOTAL: &str = "parley_turns_total";
/// Histogram of turn latency in seconds.
pub const TURN_DURATION_SECONDS: &str = "parley_turn_duration_seconds";
/// Gauge of running turns.
pub const IN_FLIGHT_TURNS: &str = "parley_in_flight_turns";
/// Counter of outbound activities.
pub const OUTBOUND_ACTIVITIES_TOTAL: &str = "parley_outbound_activities_total";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address for the Prometheus scrape listener (e.g., "0.0.0.0:9464").
    pub addr: String,

    /// Histogram buckets for turn duration.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9464".to_string(),
            duration_buckets: vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0,
            ],
        }
    }
}

/// How a turn ended, as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A route ran and returned `Ok`.
    Handled,
    /// No route matched or a middleware stopped the turn.
    Unhandled,
    /// The turn returned an error.
    Failed,
}

impl TurnOutcome {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Handled => "handled",
            Self::Unhandled => "unhandled",
            Self::Failed => "failed",
        }
    }
}

/// Installs the global Prometheus recorder and spawns the scrape listener.
///
/// Every series carries a `service` label set to `service`. Does nothing when
/// `config.enabled` is false. Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsAddr` for a bad `addr` and
/// `TelemetryError::Exporter` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig, service: &str) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|source| TelemetryError::MetricsAddr {
            addr: config.addr.clone(),
            source,
        })?;

    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", service)
        .set_buckets_for_metric(
            Matcher::Full(TURN_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?
        .build()
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

    tokio::spawn(async move {
        if let Err(error) = exporter.await {
            tracing::error!(?error, "Metrics exporter stopped");
        }
    });

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    tracing::info!(addr = %addr, service, "Metrics exporter listening");
    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Registers descriptions for all standard metrics.
pub fn register_metric_descriptions() {
    describe_counter!(TURNS_TOTAL, "Total number of turns processed");
    describe_histogram!(TURN_DURATION_SECONDS, "Turn duration in seconds");
    describe_gauge!(IN_FLIGHT_TURNS, "Number of turns currently being processed");
    describe_counter!(
        OUTBOUND_ACTIVITIES_TOTAL,
        "Total activities sent to the conversation service"
    );
}

/// Records a completed turn.
pub fn record_turn(activity_type: &str, outcome: TurnOutcome, duration: Duration) {
    counter!(
        TURNS_TOTAL,
        "activity_type" => activity_type.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!(
        TURN_DURATION_SECONDS,
        "activity_type" => activity_type.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records an activity sent to the conversation service.
pub fn record_outbound_activity(success: bool) {
    counter!(
        OUTBOUND_ACTIVITIES_TOTAL,
        "outcome" => if success { "ok" } else { "error" }
    )
    .increment(1);
}

/// Guard that decrements the in-flight gauge on drop.
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_TURNS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_TURNS).decrement(1.0);
    }
}
