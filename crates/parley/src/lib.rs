//! # Parley
//!
//! **A Microsoft Teams bot SDK: activity routing, turn middleware and invoke responses.**
//!
//! - **Router**: first-match-wins routes over activity type, invoke or event
//!   name and a selector predicate, with typed narrowing of activity values
//! - **Turn pipeline**: ordered middleware around every turn, able to
//!   short-circuit or observe the invoke response on its way back
//! - **Invoke responses**: invoke handlers answer synchronously; unmatched
//!   invokes get `501 Not Implemented`
//! - **Endpoint**: a hyper server for `POST /api/messages` with health,
//!   readiness and graceful shutdown
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parley::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("parley.toml")?
//!         .with_env_prefix("PARLEY")
//!         .load()?;
//!
//!     let app = BotApplication::builder()
//!         .config(&config)
//!         .routes(|r| {
//!             r.on_message_text("help", |ctx, cancel| async move {
//!                 ctx.send_text("Try `search`.", cancel).await?;
//!                 Ok(())
//!             })
//!             .on_task_fetch(|_ctx, _cancel| async {
//!                 Ok(InvokeResponse::ok(serde_json::json!({ "task": "info" })))
//!             })
//!         })
//!         .build()?;
//!
//!     parley::run(app, &config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Turn flow
//!
//! ```text
//! POST → Activity → TurnId → Tracing → Telemetry → [TenantFilter] → user stages → Router
//!                                                                                   ↓
//! HTTP ← InvokeResponse / 200 / error envelope ←────────────────────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/parley/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod serve;

pub use app::{BotApplication, BotApplicationBuilder};
pub use serve::{run, run_with_shutdown, server_config, RunError};

pub use parley_client as client;
pub use parley_config as config;
pub use parley_core as core;
pub use parley_middleware as middleware;
pub use parley_router as router;
pub use parley_server as server;
pub use parley_telemetry as telemetry;

/// Common imports for bot code.
///
/// ```rust
/// use parley::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{BotApplication, BotApplicationBuilder};

    pub use parley_core::{
        Activity, ActivityType, BotError, BotResult, CancellationToken, ConversationClient,
        InvokeName, InvokeResponse, ResourceResponse, TurnContext, TurnId, TypedActivity,
    };

    pub use parley_router::{Route, Router, RouterBuilder};

    pub use parley_middleware::{FnMiddleware, MatchedRoute, Middleware, Next, TurnResult};

    pub use parley_client::HttpConversationClient;

    pub use parley_config::{ConfigLoader, ParleyConfig};

    pub use parley_server::ShutdownSignal;
}
