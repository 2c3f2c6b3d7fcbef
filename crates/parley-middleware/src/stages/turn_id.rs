//! Turn id assignment.
//!
//! Every turn gets a [`TurnId`] before anything else runs, so that log lines
//! from every later stage and from the route handler can be correlated.
//!
//! By default a fresh UUID v7 is generated. With
//! [`TurnIdMiddleware::trust_activity_id`], a non-empty incoming activity
//! `id` is adopted instead, which lines our logs up with the channel's.

use crate::middleware::{BoxFuture, Middleware, Next, TurnResult};
use parley_core::{CancellationToken, TurnContext, TurnId};

/// Middleware that assigns the turn id.
#[derive(Debug, Clone, Default)]
pub struct TurnIdMiddleware {
    trust_activity_id: bool,
}

impl TurnIdMiddleware {
    /// Always generates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts the incoming activity id when present.
    #[must_use]
    pub fn trust_activity_id() -> Self {
        Self {
            trust_activity_id: true,
        }
    }

    /// Creates the middleware from a config flag.
    #[must_use]
    pub fn with_trust(trust_activity_id: bool) -> Self {
        Self { trust_activity_id }
    }

    fn resolve(&self, ctx: &TurnContext) -> TurnId {
        if self.trust_activity_id {
            if let Some(id) = ctx.activity().id.as_deref().filter(|id| !id.trim().is_empty()) {
                return TurnId::from_external(id);
            }
        }
        TurnId::new()
    }
}

impl Middleware for TurnIdMiddleware {
    fn name(&self) -> &'static str {
        "turn_id"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut TurnContext,
        next: Next<'a>,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, TurnResult> {
        Box::pin(async move {
            let turn_id = self.resolve(ctx);
            ctx.set_turn_id(turn_id);
            next.run(ctx, cancel).await
        })
    }
}
