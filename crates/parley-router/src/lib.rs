//! Activity router for Parley.
//!
//! Routes pair a coarse key (activity type, optionally an invoke or event
//! name) with a selector predicate and a handler. A [`RouterBuilder`]
//! collects them in order and freezes them into an immutable [`Router`].
//!
//! # Dispatch
//!
//! - [`Router::dispatch`] runs the first route whose key and selector both
//!   match. No match is a silent no-op.
//! - [`Router::dispatch_with_return`] does the same over response-producing
//!   routes and returns the [`InvokeResponse`](parley_core::InvokeResponse).
//!   No match answers `501 Not Implemented` with no body.
//!
//! At most one handler runs per dispatch. Handler errors propagate unchanged.
//!
//! # Example
//!
//! ```rust
//! use parley_core::fixtures::{invoke_activity, NoopClient};
//! use parley_core::{CancellationToken, InvokeResponse, TurnContext};
//! use parley_router::Router;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let router = Router::builder()
//!     .on_task_fetch(|_ctx, _cancel| async {
//!         Ok(InvokeResponse::ok(json!({ "foo": "bar" })))
//!     })
//!     .build();
//!
//! let ctx = TurnContext::new(NoopClient::handle(), invoke_activity("task/fetch", json!({})));
//! let response = router.dispatch_with_return(ctx, CancellationToken::new()).await.unwrap();
//! assert_eq!(response.status, 200);
//! # });
//! ```

mod builder;
mod route;
mod router;

pub use builder::RouterBuilder;
pub use route::{BoxFuture, FireHandler, InvokeHandler, Route, RouteHandler, Selector};
pub use router::Router;
