//! Turn span.
//!
//! Wraps the rest of the pipeline in a `turn` span carrying the turn id,
//! activity type and name, and conversation id. With a JSON subscriber
//! installed (`with_current_span`), every event emitted by a route handler
//! carries those fields.

use crate::middleware::{BoxFuture, Middleware, Next, TurnResult};
use parley_core::{CancellationToken, TurnContext};
use tracing::Instrument;

/// Middleware that opens a span per turn.
#[derive(Debug, Clone)]
pub struct TracingMiddleware {
    service_name: String,
}

impl TracingMiddleware {
    /// Creates the middleware for the named service.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Service name recorded on each span.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Default for TracingMiddleware {
    fn default() -> Self {
        Self::new("parley-bot")
    }
}

impl Middleware for TracingMiddleware {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut TurnContext,
        next: Next<'a>,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, TurnResult> {
        let activity = ctx.activity();
        let span = tracing::info_span!(
            "turn",
            service = %self.service_name,
            turn_id = %ctx.turn_id(),
            activity_type = %activity.activity_type,
            activity_name = activity.name.as_deref().unwrap_or_default(),
            conversation_id = activity.conversation_id().unwrap_or_default(),
        );

        Box::pin(
            async move {
                let result = next.run(ctx, cancel).await;
                match &result {
                    Ok(Some(response)) => tracing::debug!(status = response.status, "Turn finished"),
                    Ok(None) => tracing::debug!("Turn finished"),
                    Err(error) => tracing::debug!(error = %error, "Turn failed"),
                }
                result
            }
            .instrument(span),
        )
    }
}
