//! # Parley Middleware
//!
//! The turn pipeline that sits between the HTTP endpoint and the router.
//!
//! ```text
//! activity → TurnId → Tracing → Telemetry → [TenantFilter] → user stages → Router
//!                                                                            ↓
//! result   ← TurnId ← Tracing ← Telemetry ← [TenantFilter] ← user stages ←──┘
//! ```
//!
//! Each stage receives the mutable [`TurnContext`](parley_core::TurnContext)
//! and a [`Next`] continuation. A stage that returns without calling
//! `next.run()` short-circuits the turn: later stages and the router never
//! see it.
//!
//! ## Example
//!
//! ```
//! use parley_middleware::stages::{TracingMiddleware, TurnIdMiddleware};
//! use parley_middleware::Pipeline;
//!
//! let pipeline = Pipeline::builder()
//!     .stage(TurnIdMiddleware::new())
//!     .stage(TracingMiddleware::new("helpdesk-bot"))
//!     .build();
//!
//! assert_eq!(pipeline.stage_names(), vec!["turn_id", "tracing"]);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod middleware;
pub mod pipeline;
pub mod stages;

pub use middleware::{BoxFuture, FnMiddleware, MatchedRoute, Middleware, Next, TurnResult};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder};
