//! HTTP server for the activity endpoint.
//!
//! # Endpoints
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | `POST` | messages path | turn result, see below |
//! | `GET` | `/health` | [`HealthReport`](crate::HealthReport) |
//! | `GET` | `/ready` | [`ReadinessReport`](crate::ReadinessReport), 503 when not ready |
//! | any | anything else | 404 |
//!
//! A turn answers with the invoke response's status and JSON body when the
//! processor returns one, `200` with an empty body when it returns none, and
//! the error's status with a JSON error envelope when it fails. A turn that
//! outlives the request timeout answers `504` and its cancellation token is
//! cancelled.

use std::sync::Arc;

use bytes::Bytes;
use http::{header, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parley_core::{Activity, BotError, CancellationToken, InvokeResponse, TurnId};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::health::{HealthCheck, ReadinessCheck};
use crate::processor::{ProcessedTurn, TurnProcessor};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Type alias for HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

const JSON: &str = "application/json";

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The bind address was invalid or could not be bound.
    #[error("Bind error: {0}")]
    Bind(String),

    /// I/O error while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The bot's HTTP server.
///
/// ```rust,ignore
/// let server = Server::builder()
///     .config(ServerConfig::builder().http_addr("0.0.0.0:3978").build())
///     .build(Arc::new(app));
///
/// server.run().await?;
/// ```
pub struct Server {
    config: ServerConfig,
    processor: Arc<dyn TurnProcessor>,
    health: HealthCheck,
    readiness: ReadinessCheck,
    turns: CancellationToken,
}

impl Server {
    /// Creates a server that hands turns to `processor`.
    pub fn new(config: ServerConfig, processor: Arc<dyn TurnProcessor>) -> Self {
        let health = HealthCheck::new(config.service_name(), config.service_version());
        Self {
            config,
            processor,
            health,
            readiness: ReadinessCheck::new(),
            turns: CancellationToken::new(),
        }
    }

    /// Creates a new server builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Liveness state.
    #[must_use]
    pub fn health(&self) -> &HealthCheck {
        &self.health
    }

    /// Readiness state.
    #[must_use]
    pub fn readiness(&self) -> &ReadinessCheck {
        &self.readiness
    }

    /// Runs until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds the configured address and serves until `shutdown` triggers.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.config.socket_addr().map_err(|e| {
            ServerError::Bind(format!("Invalid address '{}': {e}", self.config.http_addr()))
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("Failed to bind to {addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from `listener` until `shutdown` triggers, then
    /// drains open connections for up to the shutdown timeout.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            addr = %local_addr,
            messages_path = self.config.messages_path(),
            "Server listening"
        );

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let guard = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, shutdown).await {
                                tracing::debug!(remote_addr = %remote_addr, error = %e, "Connection error");
                            }
                            drop(guard);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to accept connection"),
                },
                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        server.readiness.set_ready(false);
        let shutdown_timeout = server.config.shutdown_timeout();
        tracing::info!(
            timeout = ?shutdown_timeout,
            connections = tracker.active_connections(),
            "Draining connections"
        );

        if tokio::time::timeout(shutdown_timeout, tracker.drained()).await.is_err() {
            tracing::warn!(
                connections = tracker.active_connections(),
                "Shutdown timeout reached, cancelling in-flight turns"
            );
            server.turns.cancel();
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let server = Arc::clone(self);
        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, std::convert::Infallible>(server.handle_request(req).await) }
        });

        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        let mut conn = std::pin::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    /// Answers one HTTP request.
    pub async fn handle_request<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let path = req.uri().path();
        match (req.method(), path) {
            (&Method::GET, "/health") => return json_response(StatusCode::OK, &self.health.report()),
            (&Method::GET, "/ready") => {
                let report = self.readiness.report();
                let status = if report.ready {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                return json_response(status, &report);
            }
            (&Method::POST, p) if p == self.config.messages_path() => {}
            (method, p) => {
                tracing::debug!(method = %method, path = p, "No endpoint");
                return empty_response(StatusCode::NOT_FOUND);
            }
        }

        let body = Limited::new(req.into_body(), self.config.max_body_bytes());
        let body = match tokio::time::timeout(self.config.request_timeout(), body.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) => {
                return self.error_response(&BotError::invalid_activity(format!("failed to read body: {e}")), None);
            }
            Err(_) => {
                let error = BotError::invalid_activity("timed out reading body");
                return self.error_response(&error, None);
            }
        };

        self.handle_activity(&body).await
    }

    async fn handle_activity(&self, body: &[u8]) -> HttpResponse {
        let activity: Activity = match serde_json::from_slice(body) {
            Ok(activity) => activity,
            Err(e) => {
                return self.error_response(&BotError::invalid_activity(format!("invalid activity: {e}")), None);
            }
        };

        let cancel = self.turns.child_token();
        let timeout = self.config.request_timeout();
        let turn = tokio::time::timeout(timeout, self.processor.process_turn(activity, cancel.clone())).await;

        match turn {
            Ok(ProcessedTurn { turn_id, result }) => match result {
                Ok(Some(response)) => invoke_response(&response),
                Ok(None) => empty_response(StatusCode::OK),
                Err(error) => self.error_response(&error, turn_id.as_ref()),
            },
            Err(_) => {
                cancel.cancel();
                let error = BotError::cancelled(format!("turn exceeded {}ms", timeout.as_millis()));
                self.error_response(&error, None)
            }
        }
    }

    fn error_response(&self, error: &BotError, turn_id: Option<&TurnId>) -> HttpResponse {
        let status = error.status_code();
        let turn_id = turn_id.map(TurnId::as_str);
        if status.is_server_error() {
            tracing::error!(turn_id, status = status.as_u16(), error = %error, "Turn failed");
        } else {
            tracing::warn!(turn_id, status = status.as_u16(), error = %error, "Turn rejected");
        }
        json_response(status, &error.to_envelope(turn_id))
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("readiness", &self.readiness)
            .finish_non_exhaustive()
    }
}

fn invoke_response(response: &InvokeResponse) -> HttpResponse {
    match response.to_http_bytes() {
        Ok(body) => build(response.status_code(), Some(JSON), Bytes::from(body)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize invoke response");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_envelope(None))
        }
    }
}

fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    match serde_json::to_vec(body) {
        Ok(bytes) => build(status, Some(JSON), Bytes::from(bytes)),
        Err(_) => empty_response(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

fn empty_response(status: StatusCode) -> HttpResponse {
    build(status, None, Bytes::new())
}

fn build(status: StatusCode, content_type: Option<&str>, body: Bytes) -> HttpResponse {
    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(Full::new(body)).unwrap_or_else(|_| {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

/// Builder for [`Server`].
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config: Option<ServerConfig>,
    readiness: Option<ReadinessCheck>,
}

impl ServerBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the readiness checks.
    #[must_use]
    pub fn readiness(mut self, readiness: ReadinessCheck) -> Self {
        self.readiness = Some(readiness);
        self
    }

    /// Builds the server around `processor`.
    pub fn build(self, processor: Arc<dyn TurnProcessor>) -> Server {
        let mut server = Server::new(self.config.unwrap_or_default(), processor);
        if let Some(readiness) = self.readiness {
            server.readiness = readiness;
        }
        server
    }
}
