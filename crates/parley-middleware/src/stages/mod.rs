//! Built-in middleware stages.
//!
//! The bot application installs them in this order, ahead of any user
//! middleware:
//!
//! 1. [`turn_id`] - assign the turn id
//! 2. [`tracing`] - open the turn span
//! 3. [`telemetry`] - metrics and the completion log line
//! 4. [`tenant_filter`] - tenant allowlist (only when configured)

pub mod telemetry;
pub mod tenant_filter;
pub mod tracing;
pub mod turn_id;

pub use telemetry::TelemetryMiddleware;
pub use tenant_filter::TenantFilterMiddleware;
pub use tracing::TracingMiddleware;
pub use turn_id::TurnIdMiddleware;
