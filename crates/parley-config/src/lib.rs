//! Typed configuration for Parley bots.
//!
//! - TOML and JSON files
//! - `PREFIX__SECTION__KEY` environment overrides, optionally seeded from `.env`
//! - Strict parsing: unknown keys fail the load
//!
//! Layers apply as defaults, then files in call order, then environment.
//!
//! # Example
//!
//! ```no_run
//! use parley_config::ConfigLoader;
//!
//! # fn main() -> Result<(), parley_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("parley.toml")?
//!     .with_env_prefix("PARLEY")
//!     .load()?;
//!
//! println!("Listening on {}{}", config.server.http_addr, config.server.messages_path);
//! # Ok(())
//! # }
//! ```
//!
//! # File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:3978"
//! messages_path = "/api/messages"
//! request_timeout_ms = 15000
//! shutdown_timeout_secs = 30
//! max_body_bytes = 1048576
//!
//! [bot]
//! app_id = "00000000-0000-0000-0000-000000000000"
//! allowed_tenants = ["contoso.onmicrosoft.com"]
//! trust_activity_id = false
//!
//! [telemetry]
//! service_name = "helpdesk-bot"
//! environment = "production"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9464"
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{ParleyConfig, ParleyConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{
    BotSection, LogFormat, LoggingSection, MetricsSection, ServerSection, TelemetrySection,
};
