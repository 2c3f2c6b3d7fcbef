//! Core middleware trait and types.
//!
//! A [`Middleware`] sees every turn before the router does. It receives the
//! mutable [`TurnContext`] and a [`Next`] continuation, and either calls
//! `next.run()` to continue or returns its own result to stop the turn.
//!
//! # Example
//!
//! ```ignore
//! use parley_middleware::{BoxFuture, Middleware, Next, TurnResult};
//! use parley_core::{CancellationToken, TurnContext};
//!
//! struct AuditMiddleware;
//!
//! impl Middleware for AuditMiddleware {
//!     fn name(&self) -> &'static str {
//!         "audit"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut TurnContext,
//!         next: Next<'a>,
//!         cancel: CancellationToken,
//!     ) -> BoxFuture<'a, TurnResult> {
//!         Box::pin(async move {
//!             tracing::info!(turn_id = %ctx.turn_id(), "Turn received");
//!             next.run(ctx, cancel).await
//!         })
//!     }
//! }
//! ```

use parley_core::{BotResult, CancellationToken, InvokeResponse, TurnContext};
use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a turn produces: an invoke response for invoke activities routed
/// through the invoke path, nothing otherwise.
pub type TurnResult = BotResult<Option<InvokeResponse>>;

/// Name of the route picked for the turn.
///
/// The terminal handler stores it in the turn's extensions before running the
/// route, so outer stages can read it once `next.run()` returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute(pub String);

/// A stage in the turn pipeline.
///
/// # Contract
///
/// - Call `next.run()` at most once. Not calling it short-circuits the turn.
/// - Return downstream errors unchanged unless the stage exists to map them.
pub trait Middleware: Send + Sync + 'static {
    /// Stage name used in logs and [`Pipeline::stage_names`](crate::Pipeline::stage_names).
    fn name(&self) -> &'static str;

    /// Processes one turn.
    fn process<'a>(
        &'a self,
        ctx: &'a mut TurnContext,
        next: Next<'a>,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, TurnResult>;
}

/// Continuation to the rest of the pipeline.
///
/// Consumed by [`Next::run`], so it can run at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

type TerminalFn<'a> =
    Box<dyn FnOnce(&mut TurnContext, CancellationToken) -> BoxFuture<'static, TurnResult> + Send + 'a>;

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Terminal(TerminalFn<'a>),
}

impl<'a> Next<'a> {
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    pub(crate) fn terminal<F>(f: F) -> Self
    where
        F: FnOnce(&mut TurnContext, CancellationToken) -> BoxFuture<'static, TurnResult> + Send + 'a,
    {
        Self {
            inner: NextInner::Terminal(Box::new(f)),
        }
    }

    /// Runs the next stage, or the terminal handler when no stages remain.
    pub async fn run(self, ctx: &mut TurnContext, cancel: CancellationToken) -> TurnResult {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, *next, cancel).await,
            NextInner::Terminal(handler) => handler(ctx, cancel).await,
        }
    }
}

/// A middleware built from a closure.
///
/// ```ignore
/// let timing = FnMiddleware::new("timing", |ctx, next, cancel| {
///     Box::pin(async move {
///         let start = std::time::Instant::now();
///         let result = next.run(ctx, cancel).await;
///         tracing::debug!(elapsed = ?start.elapsed(), "Turn timed");
///         result
///     })
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut TurnContext, Next<'a>, CancellationToken) -> BoxFuture<'a, TurnResult>
        + Send
        + Sync
        + 'static,
{
    /// Creates a named closure middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut TurnContext, Next<'a>, CancellationToken) -> BoxFuture<'a, TurnResult>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut TurnContext,
        next: Next<'a>,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, TurnResult> {
        (self.func)(ctx, next, cancel)
    }
}

impl<F> std::fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMiddleware").field("name", &self.name).finish()
    }
}
