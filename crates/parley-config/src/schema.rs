//! The sections of a Parley configuration file.
//!
//! Each section is `#[serde(default)]` at the container level, so a file
//! lists only what it changes, and `deny_unknown_fields`, so a typo is an
//! error instead of a silently ignored key.

use serde::{Deserialize, Serialize};

/// `[server]`: the activity endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// `ip:port` to bind.
    pub http_addr: String,
    /// Where the channel POSTs activities.
    pub messages_path: String,
    /// Limit on reading the body and, separately, on running the turn.
    pub request_timeout_ms: u64,
    /// Drain time on shutdown.
    pub shutdown_timeout_secs: u64,
    /// Larger bodies are rejected with 400.
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:3978".into(),
            messages_path: "/api/messages".into(),
            request_timeout_ms: 15_000,
            shutdown_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// `[bot]`: identity and who may talk to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BotSection {
    /// Microsoft app id of the bot.
    pub app_id: String,
    /// Sent as `Authorization: Bearer` on outbound calls.
    pub bearer_token: Option<String>,
    /// Empty admits every tenant.
    pub allowed_tenants: Vec<String>,
    /// Reuse the inbound activity id as the turn id.
    pub trust_activity_id: bool,
}

/// `format` in `[telemetry.logging]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line, for terminals.
    Pretty,
}

/// `[telemetry.logging]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// `EnvFilter` directives.
    pub level: String,
    /// `json` or `pretty`.
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Json,
        }
    }
}

/// `[telemetry.metrics]`: the Prometheus scrape listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsSection {
    /// Start the listener.
    pub enabled: bool,
    /// Listener `ip:port`.
    pub addr: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9464".into(),
        }
    }
}

/// `[telemetry]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetrySection {
    /// Appears in logs, as the `service` metric label and in `/health`.
    pub service_name: String,
    /// `development`, `production`, ...
    pub environment: String,
    /// `[telemetry.logging]`.
    pub logging: LoggingSection,
    /// `[telemetry.metrics]`.
    pub metrics: MetricsSection,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            service_name: "parley-bot".into(),
            environment: "development".into(),
            logging: LoggingSection::default(),
            metrics: MetricsSection::default(),
        }
    }
}
