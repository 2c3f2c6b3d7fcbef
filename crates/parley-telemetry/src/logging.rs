//! Log subscriber setup.
//!
//! One `tracing-subscriber` registry with a single formatting layer: JSON
//! lines for collectors or multi-line pretty output for a terminal. The
//! filter takes `EnvFilter` directives such as
//! `info,parley_router=debug`.
//!
//! Turn logs use the field names in [`fields`] so that JSON output can be
//! queried by turn id across crates:
//!
//! ```rust,ignore
//! use parley_telemetry::logging::{fields, init_logging, LogConfig, LogOutput};
//!
//! init_logging(&LogConfig::new("debug", LogOutput::Pretty))?;
//! tracing::info!({ fields::TURN_ID } = "t-1", "Turn started");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    /// One JSON object per event, with the current span's fields.
    #[default]
    Json,
    /// Human-readable, with source locations and span open/close events.
    Pretty,
    /// Install nothing.
    Off,
}

/// What to log and how.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directive string.
    pub filter: String,
    /// Output style.
    pub output: LogOutput,
}

impl LogConfig {
    /// A config with the given filter and style.
    #[must_use]
    pub fn new(filter: impl Into<String>, output: LogOutput) -> Self {
        Self {
            filter: filter.into(),
            output,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("info", LogOutput::Json)
    }
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// `TelemetryError::Filter` for a bad directive and
/// `TelemetryError::SubscriberInstalled` when a subscriber already exists.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.output {
        LogOutput::Off => return Ok(()),
        LogOutput::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed(),
        LogOutput::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .boxed(),
    };

    let filter = parse_filter(&config.filter)?;

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInstalled(e.to_string()))
}

/// Parses an `EnvFilter` directive string.
///
/// # Errors
///
/// `TelemetryError::Filter` naming the directive.
pub fn parse_filter(directive: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|e| TelemetryError::Filter {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

/// Field names shared by turn logs.
pub mod fields {
    /// Turn id.
    pub const TURN_ID: &str = "turn_id";
    /// Activity `type`.
    pub const ACTIVITY_TYPE: &str = "activity_type";
    /// Invoke or event `name`.
    pub const ACTIVITY_NAME: &str = "activity_name";
    /// Conversation id.
    pub const CONVERSATION_ID: &str = "conversation_id";
    /// Route that handled the turn.
    pub const ROUTE: &str = "route";
    /// HTTP or invoke status.
    pub const STATUS: &str = "status";
    /// Duration in milliseconds.
    pub const DURATION_MS: &str = "duration_ms";
    /// Error text.
    pub const ERROR: &str = "error";
}
