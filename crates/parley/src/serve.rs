//! Running a bot from configuration.

use std::sync::Arc;
use std::time::Duration;

use parley_config::ParleyConfig;
use parley_core::BotError;
use parley_server::{Server, ServerConfig, ServerError, ShutdownSignal};
use parley_telemetry::TelemetryError;
use thiserror::Error;

use crate::BotApplication;

/// Errors from [`run`].
#[derive(Debug, Error)]
pub enum RunError {
    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] parley_config::ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The application could not be built.
    #[error(transparent)]
    Bot(#[from] BotError),

    /// The endpoint failed to bind or serve.
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Maps the `server` and `telemetry` sections onto the endpoint config.
#[must_use]
pub fn server_config(config: &ParleyConfig) -> ServerConfig {
    ServerConfig::builder()
        .http_addr(config.server.http_addr.as_str())
        .messages_path(config.server.messages_path.as_str())
        .request_timeout(Duration::from_millis(config.server.request_timeout_ms))
        .shutdown_timeout(Duration::from_secs(config.server.shutdown_timeout_secs))
        .max_body_bytes(config.server.max_body_bytes)
        .service_name(config.telemetry.service_name.as_str())
        .build()
}

/// Installs telemetry, then serves `app` until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns the first failure from telemetry setup, binding or serving.
pub async fn run(app: BotApplication, config: &ParleyConfig) -> Result<(), RunError> {
    parley_telemetry::init_telemetry(&config.to_telemetry_config())?;
    run_with_shutdown(app, config, ShutdownSignal::with_os_signals()).await
}

/// Serves `app` until `shutdown` fires. Telemetry is left to the caller.
///
/// # Errors
///
/// Returns a bind or serve failure.
pub async fn run_with_shutdown(
    app: BotApplication,
    config: &ParleyConfig,
    shutdown: ShutdownSignal,
) -> Result<(), RunError> {
    let server = Server::builder()
        .config(server_config(config))
        .build(Arc::new(app));

    tracing::info!(
        addr = %config.server.http_addr,
        messages_path = %config.server.messages_path,
        environment = %config.telemetry.environment,
        "Starting bot endpoint"
    );

    server.run_with_shutdown(shutdown).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_from_parley_config() {
        let mut config = ParleyConfig::default();
        config.server.messages_path = "/bot".to_string();
        config.server.request_timeout_ms = 2500;
        config.telemetry.service_name = "helpdesk-bot".to_string();

        let server = server_config(&config);
        assert_eq!(server.messages_path(), "/bot");
        assert_eq!(server.request_timeout(), Duration::from_millis(2500));
        assert_eq!(server.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(server.service_name(), "helpdesk-bot");
        assert_eq!(server.http_addr(), "0.0.0.0:3978");
        assert_eq!(server.max_body_bytes(), 1024 * 1024);
    }

    #[tokio::test]
    async fn test_run_with_shutdown_stops() {
        let mut config = ParleyConfig::default();
        config.server.http_addr = "127.0.0.1:0".to_string();

        let app = BotApplication::builder()
            .client(Arc::new(parley_core::fixtures::NoopClient))
            .build()
            .unwrap();

        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_with_shutdown(app, &config, shutdown),
        )
        .await
        .unwrap();
        assert!(result.is_ok());
    }
}
