//! Setup failures.

use std::net::AddrParseError;
use thiserror::Error;

/// Why logging or metrics could not be installed.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directive does not parse.
    #[error("bad log filter '{directive}': {reason}")]
    Filter {
        /// The directive as configured.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// Another global subscriber is already set.
    #[error("log subscriber already installed: {0}")]
    SubscriberInstalled(String),

    /// The scrape address is not a socket address.
    #[error("bad metrics address '{addr}'")]
    MetricsAddr {
        /// The address as configured.
        addr: String,
        /// Parse failure.
        #[source]
        source: AddrParseError,
    },

    /// The Prometheus exporter or recorder failed to start.
    #[error("metrics exporter: {0}")]
    Exporter(String),
}
