//! Ordered middleware pipeline.
//!
//! Stages run in registration order on the way in and unwind in reverse on
//! the way out:
//!
//! ```text
//! turn → stage 1 → stage 2 → ... → terminal (router)
//!                                       ↓
//! result ← stage 1 ← stage 2 ← ... ←────┘
//! ```

use crate::middleware::{BoxFuture, Middleware, Next, TurnResult};
use parley_core::{CancellationToken, TurnContext};
use std::sync::Arc;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An immutable, ordered list of middleware stages.
///
/// # Example
///
/// ```ignore
/// let pipeline = Pipeline::builder()
///     .stage(TurnIdMiddleware::new())
///     .stage(TracingMiddleware::new("helpdesk-bot"))
///     .build();
///
/// let result = pipeline
///     .process(&mut ctx, cancel, |ctx, cancel| {
///         let ctx = ctx.clone();
///         Box::pin(async move { router.dispatch(ctx, cancel).await.map(|()| None) })
///     })
///     .await;
/// ```
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs `ctx` through every stage, then `terminal`.
    ///
    /// The terminal runs only if every stage calls `next.run()`.
    pub async fn process<H>(
        &self,
        ctx: &mut TurnContext,
        cancel: CancellationToken,
        terminal: H,
    ) -> TurnResult
    where
        H: FnOnce(&mut TurnContext, CancellationToken) -> BoxFuture<'static, TurnResult> + Send,
    {
        let next = self.build_chain(terminal);
        next.run(ctx, cancel).await
    }

    fn build_chain<'a, H>(&'a self, terminal: H) -> Next<'a>
    where
        H: FnOnce(&mut TurnContext, CancellationToken) -> BoxFuture<'static, TurnResult> + Send + 'a,
    {
        let mut next = Next::terminal(terminal);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared stage.
    #[must_use]
    pub fn boxed(mut self, middleware: BoxedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Appends a stage through a mutable reference.
    pub fn push<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnMiddleware;
    use parley_core::fixtures::{message_activity, NoopClient};
    use parley_core::InvokeResponse;
    use parking_lot::Mutex;

    fn ctx() -> TurnContext {
        TurnContext::new(NoopClient::handle(), message_activity("hi"))
    }

    fn recording(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> impl Middleware {
        let log = Arc::clone(log);
        FnMiddleware::new(name, move |ctx, next, cancel| {
            let log = Arc::clone(&log);
            Box::pin(async move {
                log.lock().push(format!("{name}:before"));
                let result = next.run(ctx, cancel).await;
                log.lock().push(format!("{name}:after"));
                result
            })
        })
    }

    #[test]
    fn test_empty_pipeline() {
        let pipeline = Pipeline::builder().build();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.stage_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_pipeline_runs_terminal() {
        let pipeline = Pipeline::default();
        let result = pipeline
            .process(&mut ctx(), CancellationToken::new(), |_ctx, _cancel| {
                Box::pin(async { Ok(Some(InvokeResponse::new(200))) })
            })
            .await
            .unwrap();
        assert_eq!(result.map(|r| r.status), Some(200));
    }

    #[tokio::test]
    async fn test_stages_nest_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder()
            .stage(recording("outer", &log))
            .stage(recording("inner", &log))
            .build();

        assert_eq!(pipeline.stage_names(), vec!["outer", "inner"]);

        let terminal_log = Arc::clone(&log);
        pipeline
            .process(&mut ctx(), CancellationToken::new(), move |_ctx, _cancel| {
                terminal_log.lock().push("handler".to_string());
                Box::pin(async { Ok(None) })
            })
            .await
            .unwrap();

        assert_eq!(
            *log.lock(),
            vec!["outer:before", "inner:before", "handler", "inner:after", "outer:after"]
        );
    }
}
