//! Tenant allowlist.
//!
//! Turns from tenants outside the allowlist stop here. Non-invoke turns end
//! with no result; invoke turns are answered with 403 so the client does not
//! treat the silence as success. An empty allowlist admits every tenant.

use crate::middleware::{BoxFuture, Middleware, Next, TurnResult};
use parley_core::{CancellationToken, InvokeResponse, TurnContext};
use std::collections::HashSet;

/// Status returned to invoke activities from a rejected tenant.
pub const REJECTED_INVOKE_STATUS: u16 = 403;

/// Middleware that rejects turns from tenants not on the allowlist.
#[derive(Debug, Clone, Default)]
pub struct TenantFilterMiddleware {
    allowed: HashSet<String>,
}

impl TenantFilterMiddleware {
    /// Creates a filter admitting only `tenants`.
    pub fn new<I, S>(tenants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: tenants.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if a turn from `tenant_id` may proceed.
    #[must_use]
    pub fn admits(&self, tenant_id: Option<&str>) -> bool {
        self.allowed.is_empty() || tenant_id.is_some_and(|id| self.allowed.contains(id))
    }
}

impl Middleware for TenantFilterMiddleware {
    fn name(&self) -> &'static str {
        "tenant_filter"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut TurnContext,
        next: Next<'a>,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, TurnResult> {
        Box::pin(async move {
            let activity = ctx.activity();
            if self.admits(activity.tenant_id()) {
                return next.run(ctx, cancel).await;
            }

            tracing::warn!(
                turn_id = %ctx.turn_id(),
                tenant_id = activity.tenant_id().unwrap_or("<none>"),
                activity_type = %activity.activity_type,
                "Rejected turn from tenant outside allowlist"
            );

            if activity.is_invoke() {
                Ok(Some(InvokeResponse::new(REJECTED_INVOKE_STATUS)))
            } else {
                Ok(None)
            }
        })
    }
}
