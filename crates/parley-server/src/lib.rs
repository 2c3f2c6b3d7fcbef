//! # Parley Server
//!
//! The HTTP boundary of a Parley bot: one `POST` endpoint for activities,
//! liveness and readiness probes, and graceful shutdown. What happens inside
//! a turn is behind the [`TurnProcessor`] trait.
//!
//! ## Example
//!
//! ```rust,ignore
//! use parley_server::{Server, ServerConfig};
//! use std::sync::Arc;
//!
//! let server = Server::builder()
//!     .config(ServerConfig::builder().http_addr("0.0.0.0:3978").build())
//!     .build(Arc::new(app));
//!
//! server.run().await?;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod health;
pub mod processor;
pub mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use health::{HealthCheck, HealthReport, ReadinessCheck, ReadinessReport};
pub use processor::{ProcessedTurn, TurnProcessor};
pub use server::{HttpResponse, ResponseBody, Server, ServerBuilder, ServerError};
pub use shutdown::{ConnectionGuard, ConnectionTracker, ShutdownSignal};
