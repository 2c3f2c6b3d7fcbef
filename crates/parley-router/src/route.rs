//! A single registered route.

use parley_core::{
    Activity, ActivityType, BotResult, CancellationToken, InvokeResponse, TurnContext,
    TypedActivity,
};
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Fine-grained route predicate, evaluated after the coarse type/name check.
pub type Selector = Arc<dyn Fn(&Activity) -> bool + Send + Sync>;

/// Handler that produces no response.
pub type FireHandler =
    Arc<dyn Fn(TurnContext, CancellationToken) -> BoxFuture<'static, BotResult<()>> + Send + Sync>;

/// Handler that produces an [`InvokeResponse`].
pub type InvokeHandler = Arc<
    dyn Fn(TurnContext, CancellationToken) -> BoxFuture<'static, BotResult<InvokeResponse>>
        + Send
        + Sync,
>;

/// The handler half of a route. Exactly one kind is populated.
#[derive(Clone)]
pub enum RouteHandler {
    /// Runs for its side effects.
    Fire(FireHandler),
    /// Returns the invoke response.
    Invoke(InvokeHandler),
}

impl RouteHandler {
    /// Wraps an async closure over the raw context.
    pub fn fire<F, Fut>(handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<()>> + Send + 'static,
    {
        Self::Fire(Arc::new(
            move |ctx: TurnContext, cancel: CancellationToken| -> BoxFuture<'static, BotResult<()>> {
                Box::pin(handler(ctx, cancel))
            },
        ))
    }

    /// Wraps an async closure that returns an invoke response.
    pub fn invoke<F, Fut>(handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<InvokeResponse>> + Send + 'static,
    {
        Self::Invoke(Arc::new(
            move |ctx: TurnContext,
                  cancel: CancellationToken|
                  -> BoxFuture<'static, BotResult<InvokeResponse>> {
                Box::pin(handler(ctx, cancel))
            },
        ))
    }

    /// Wraps a closure over a narrowed context.
    ///
    /// A narrowing failure is returned from the handler and the closure never
    /// runs.
    pub fn fire_typed<T, F, Fut>(handler: F) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(TurnContext<TypedActivity<T>>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<()>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        Self::Fire(Arc::new(
            move |ctx: TurnContext, cancel: CancellationToken| -> BoxFuture<'static, BotResult<()>> {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let typed = ctx.narrow::<T>()?;
                    handler(typed, cancel).await
                })
            },
        ))
    }

    /// Wraps a closure over a narrowed context that returns an invoke response.
    pub fn invoke_typed<T, F, Fut>(handler: F) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(TurnContext<TypedActivity<T>>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<InvokeResponse>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        Self::Invoke(Arc::new(
            move |ctx: TurnContext,
                  cancel: CancellationToken|
                  -> BoxFuture<'static, BotResult<InvokeResponse>> {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let typed = ctx.narrow::<T>()?;
                    handler(typed, cancel).await
                })
            },
        ))
    }

    /// Returns `true` for response-producing handlers.
    #[must_use]
    pub const fn returns_response(&self) -> bool {
        matches!(self, Self::Invoke(_))
    }
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fire(_) => f.write_str("Fire"),
            Self::Invoke(_) => f.write_str("Invoke"),
        }
    }
}

/// A registered `(selector, handler)` pair keyed by activity type and name.
///
/// Routes are immutable once built.
///
/// # Example
///
/// ```
/// use parley_core::ActivityType;
/// use parley_router::{Route, RouteHandler};
///
/// let route = Route::new(
///     Some(ActivityType::Message),
///     None,
///     |activity| activity.text.as_deref() == Some("help"),
///     RouteHandler::fire(|_ctx, _cancel| async { Ok(()) }),
/// );
/// assert_eq!(route.name(), "message");
/// ```
#[derive(Clone)]
pub struct Route {
    name: String,
    activity_type: Option<ActivityType>,
    activity_name: Option<String>,
    selector: Selector,
    handler: RouteHandler,
}

impl Route {
    /// Creates a route.
    ///
    /// `activity_type` of `None` matches every type. `activity_name`, when
    /// set, must equal the activity's `name`.
    pub fn new<S>(
        activity_type: Option<ActivityType>,
        activity_name: Option<String>,
        selector: S,
        handler: RouteHandler,
    ) -> Self
    where
        S: Fn(&Activity) -> bool + Send + Sync + 'static,
    {
        let name = match (&activity_type, &activity_name) {
            (Some(ty), Some(n)) => format!("{ty}/{n}"),
            (Some(ty), None) => ty.to_string(),
            (None, Some(n)) => format!("*/{n}"),
            (None, None) => "*".to_string(),
        };
        Self {
            name,
            activity_type,
            activity_name,
            selector: Arc::new(selector),
            handler,
        }
    }

    /// Diagnostic key: `type` or `type/name`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The activity type this route is filed under, `None` for any.
    #[must_use]
    pub fn activity_type(&self) -> Option<&ActivityType> {
        self.activity_type.as_ref()
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> &RouteHandler {
        &self.handler
    }

    /// Coarse type/name check.
    #[must_use]
    pub fn matches_key(&self, activity: &Activity) -> bool {
        let type_ok = self
            .activity_type
            .as_ref()
            .map_or(true, |ty| *ty == activity.activity_type);
        let name_ok = self
            .activity_name
            .as_deref()
            .map_or(true, |n| activity.name.as_deref() == Some(n));
        type_ok && name_ok
    }

    /// Coarse check and selector both hold.
    #[must_use]
    pub fn matches(&self, activity: &Activity) -> bool {
        self.matches_key(activity) && (self.selector)(activity)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::fixtures::{invoke_activity, message_activity};
    use serde_json::json;

    fn noop() -> RouteHandler {
        RouteHandler::fire(|_ctx, _cancel| async { Ok(()) })
    }

    #[test]
    fn test_route_names() {
        let r = Route::new(Some(ActivityType::Invoke), Some("task/fetch".into()), |_| true, noop());
        assert_eq!(r.name(), "invoke/task/fetch");
        assert_eq!(Route::new(None, None, |_| true, noop()).name(), "*");
    }

    #[test]
    fn test_coarse_key_and_selector_both_required() {
        let route = Route::new(
            Some(ActivityType::Message),
            None,
            |a| a.text.as_deref() == Some("hi"),
            noop(),
        );
        assert!(route.matches(&message_activity("hi")));
        assert!(!route.matches(&message_activity("bye")));
        assert!(!route.matches(&invoke_activity("hi", json!({}))));
    }

    #[test]
    fn test_name_filter() {
        let route = Route::new(
            Some(ActivityType::Invoke),
            Some("task/fetch".into()),
            |_| true,
            noop(),
        );
        assert!(route.matches(&invoke_activity("task/fetch", json!({}))));
        assert!(!route.matches(&invoke_activity("task/submit", json!({}))));
    }

    #[test]
    fn test_handler_kind() {
        assert!(!noop().returns_response());
        let invoke = RouteHandler::invoke(|_ctx, _cancel| async { Ok(InvokeResponse::default()) });
        assert!(invoke.returns_response());
    }
}
