//! Route registration.

use crate::route::{Route, RouteHandler};
use crate::router::Router;
use parley_core::{
    Activity, ActivityType, BotResult, CancellationToken, InvokeName, InvokeResponse, TurnContext,
    TypedActivity,
};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::future::Future;

/// Accumulates routes in registration order and freezes them into a
/// [`Router`].
///
/// Registration order is dispatch order. Nothing is deduplicated and
/// overlapping selectors are allowed.
///
/// # Example
///
/// ```
/// use parley_core::InvokeResponse;
/// use parley_router::RouterBuilder;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Query {
///     command_id: String,
/// }
///
/// let router = RouterBuilder::new()
///     .on_message_text("help", |ctx, cancel| async move {
///         ctx.send_text("Try `search`.", cancel).await?;
///         Ok(())
///     })
///     .on_message_extension_query::<Query, _, _>(|ctx, _cancel| async move {
///         let command = ctx.activity().value().command_id.clone();
///         Ok(InvokeResponse::ok(serde_json::json!({ "command": command })))
///     })
///     .build();
///
/// assert_eq!(router.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
}

impl RouterBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route.
    pub fn route(mut self, route: Route) -> Self {
        self.register(route);
        self
    }

    /// Appends a route through a mutable reference.
    pub fn register(&mut self, route: Route) -> &mut Self {
        tracing::trace!(route = route.name(), index = self.routes.len(), "Registering route");
        self.routes.push(route);
        self
    }

    /// Freezes the routes.
    #[must_use]
    pub fn build(self) -> Router {
        Router::from_routes(self.routes)
    }

    /// Catch-all: any activity type for which `selector` holds.
    pub fn on_activity<S, F, Fut>(self, selector: S, handler: F) -> Self
    where
        S: Fn(&Activity) -> bool + Send + Sync + 'static,
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<()>> + Send + 'static,
    {
        self.route(Route::new(None, None, selector, RouteHandler::fire(handler)))
    }

    /// Every message.
    pub fn on_message<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<()>> + Send + 'static,
    {
        self.on_type(ActivityType::Message, handler)
    }

    /// Messages whose trimmed text equals `text`, ignoring ASCII case.
    pub fn on_message_text<F, Fut>(self, text: impl Into<String>, handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<()>> + Send + 'static,
    {
        let text = text.into();
        self.route(Route::new(
            Some(ActivityType::Message),
            None,
            move |activity| {
                activity
                    .text
                    .as_deref()
                    .is_some_and(|t| t.trim().eq_ignore_ascii_case(&text))
            },
            RouteHandler::fire(handler),
        ))
    }

    /// Messages whose text matches `pattern`.
    pub fn on_message_pattern<F, Fut>(self, pattern: Regex, handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<()>> + Send + 'static,
    {
        self.route(Route::new(
            Some(ActivityType::Message),
            None,
            move |activity| activity.text.as_deref().is_some_and(|t| pattern.is_match(t)),
            RouteHandler::fire(handler),
        ))
    }

    /// Typing indicators.
    pub fn on_typing<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<()>> + Send + 'static,
    {
        self.on_type(ActivityType::Typing, handler)
    }

    /// Conversation membership or metadata changes.
    pub fn on_conversation_update<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<()>> + Send + 'static,
    {
        self.on_type(ActivityType::ConversationUpdate, handler)
    }

    /// Reactions added or removed.
    pub fn on_message_reaction<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<()>> + Send + 'static,
    {
        self.on_type(ActivityType::MessageReaction, handler)
    }

    /// App installed or removed.
    pub fn on_installation_update<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<()>> + Send + 'static,
    {
        self.on_type(ActivityType::InstallationUpdate, handler)
    }

    /// Events named `name`.
    pub fn on_event<F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<()>> + Send + 'static,
    {
        self.route(Route::new(
            Some(ActivityType::Event),
            Some(name.into()),
            |_| true,
            RouteHandler::fire(handler),
        ))
    }

    /// Events named `name`, with the value narrowed into `T`.
    pub fn on_event_typed<T, F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(TurnContext<TypedActivity<T>>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<()>> + Send + 'static,
    {
        self.route(Route::new(
            Some(ActivityType::Event),
            Some(name.into()),
            |_| true,
            RouteHandler::fire_typed(handler),
        ))
    }

    /// Every invoke, whatever its name.
    pub fn on_invoke<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<InvokeResponse>> + Send + 'static,
    {
        self.route(Route::new(
            Some(ActivityType::Invoke),
            None,
            |_| true,
            RouteHandler::invoke(handler),
        ))
    }

    /// Invokes named `name`, with the value narrowed into `T`.
    pub fn on_invoke_typed<T, F, Fut>(self, name: impl Into<InvokeName>, handler: F) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(TurnContext<TypedActivity<T>>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<InvokeResponse>> + Send + 'static,
    {
        let name: InvokeName = name.into();
        self.route(Route::new(
            Some(ActivityType::Invoke),
            Some(name.as_str().to_string()),
            |_| true,
            RouteHandler::invoke_typed(handler),
        ))
    }

    /// `composeExtension/query`.
    pub fn on_message_extension_query<T, F, Fut>(self, handler: F) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(TurnContext<TypedActivity<T>>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<InvokeResponse>> + Send + 'static,
    {
        self.on_invoke_typed(InvokeName::MessageExtensionQuery, handler)
    }

    /// `composeExtension/selectItem`.
    pub fn on_message_extension_select_item<T, F, Fut>(self, handler: F) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(TurnContext<TypedActivity<T>>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<InvokeResponse>> + Send + 'static,
    {
        self.on_invoke_typed(InvokeName::MessageExtensionSelectItem, handler)
    }

    /// `composeExtension/submitAction`.
    pub fn on_message_extension_submit_action<T, F, Fut>(self, handler: F) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(TurnContext<TypedActivity<T>>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<InvokeResponse>> + Send + 'static,
    {
        self.on_invoke_typed(InvokeName::MessageExtensionSubmitAction, handler)
    }

    /// `task/fetch`. The raw value is left to the handler.
    pub fn on_task_fetch<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<InvokeResponse>> + Send + 'static,
    {
        self.on_invoke_named(InvokeName::TaskFetch, handler)
    }

    /// `task/submit`. The raw value is left to the handler.
    pub fn on_task_submit<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<InvokeResponse>> + Send + 'static,
    {
        self.on_invoke_named(InvokeName::TaskSubmit, handler)
    }

    /// `adaptiveCard/action`, with the value narrowed into `T`.
    pub fn on_adaptive_card_action<T, F, Fut>(self, handler: F) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(TurnContext<TypedActivity<T>>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<InvokeResponse>> + Send + 'static,
    {
        self.on_invoke_typed(InvokeName::AdaptiveCardAction, handler)
    }

    fn on_type<F, Fut>(self, activity_type: ActivityType, handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<()>> + Send + 'static,
    {
        self.route(Route::new(
            Some(activity_type),
            None,
            |_| true,
            RouteHandler::fire(handler),
        ))
    }

    fn on_invoke_named<F, Fut>(self, name: InvokeName, handler: F) -> Self
    where
        F: Fn(TurnContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BotResult<InvokeResponse>> + Send + 'static,
    {
        self.route(Route::new(
            Some(ActivityType::Invoke),
            Some(name.as_str().to_string()),
            |_| true,
            RouteHandler::invoke(handler),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::fixtures::{activity, event_activity, invoke_activity, message_activity, NoopClient};
    use parley_core::BotError;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn ctx(activity: Activity) -> TurnContext {
        TurnContext::new(NoopClient::handle(), activity)
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Query {
        command_id: String,
    }

    #[tokio::test]
    async fn test_message_text_and_pattern() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&seen), Arc::clone(&seen));

        let router = RouterBuilder::new()
            .on_message_text("help", move |_ctx, _cancel| {
                let seen = Arc::clone(&a);
                async move {
                    seen.lock().unwrap().push("help");
                    Ok(())
                }
            })
            .on_message_pattern(Regex::new(r"^order \d+$").unwrap(), move |_ctx, _cancel| {
                let seen = Arc::clone(&b);
                async move {
                    seen.lock().unwrap().push("order");
                    Ok(())
                }
            })
            .build();

        for text in [" HELP ", "order 42", "order x"] {
            router
                .dispatch(ctx(message_activity(text)), CancellationToken::new())
                .await
                .unwrap();
        }

        assert_eq!(*seen.lock().unwrap(), vec!["help", "order"]);
    }

    #[tokio::test]
    async fn test_specific_invoke_before_catch_all() {
        let catch_all = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&catch_all);

        let router = RouterBuilder::new()
            .on_message_extension_query::<Query, _, _>(|ctx, _cancel| async move {
                Ok(InvokeResponse::ok(json!({ "command": ctx.activity().value().command_id })))
            })
            .on_invoke(move |_ctx, _cancel| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(InvokeResponse::default())
                }
            })
            .build();

        let response = router
            .dispatch_with_return(
                ctx(invoke_activity(
                    "composeExtension/query",
                    json!({ "commandId": "searchCmd" }),
                )),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.body, Some(json!({ "command": "searchCmd" })));
        assert_eq!(catch_all.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_typed_invoke_narrowing_failure_is_error() {
        let router = RouterBuilder::new()
            .on_message_extension_query::<Query, _, _>(|_ctx, _cancel| async {
                Ok(InvokeResponse::default())
            })
            .build();

        let err = router
            .dispatch_with_return(
                ctx(invoke_activity("composeExtension/query", json!({ "commandId": 5 }))),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BotError::Narrowing { .. }));
    }

    #[tokio::test]
    async fn test_event_routes_match_by_name() {
        #[derive(Deserialize)]
        struct Meeting {
            id: String,
        }

        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);

        let router = RouterBuilder::new()
            .on_event_typed::<Meeting, _, _>("application/vnd.microsoft.meetingStart", move |ctx, _| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock().unwrap() = Some(ctx.activity().value().id.clone());
                    Ok(())
                }
            })
            .build();

        router
            .dispatch(ctx(event_activity("other", json!({ "id": "x" }))), CancellationToken::new())
            .await
            .unwrap();
        assert!(seen.lock().unwrap().is_none());

        router
            .dispatch(
                ctx(event_activity("application/vnd.microsoft.meetingStart", json!({ "id": "m1" }))),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn test_activity_type_helpers() {
        let hits = Arc::new(AtomicUsize::new(0));
        let make = |hits: &Arc<AtomicUsize>| {
            let hits = Arc::clone(hits);
            move |_ctx: TurnContext, _cancel: CancellationToken| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }
        };

        let router = RouterBuilder::new()
            .on_typing(make(&hits))
            .on_conversation_update(make(&hits))
            .on_message_reaction(make(&hits))
            .on_installation_update(make(&hits))
            .build();

        for ty in [
            ActivityType::Typing,
            ActivityType::ConversationUpdate,
            ActivityType::MessageReaction,
            ActivityType::InstallationUpdate,
            ActivityType::EndOfConversation,
        ] {
            router
                .dispatch(ctx(activity(ty)), CancellationToken::new())
                .await
                .unwrap();
        }

        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_register_by_reference() {
        let mut builder = RouterBuilder::new();
        builder
            .register(Route::new(None, None, |_| true, RouteHandler::fire(|_c, _t| async { Ok(()) })))
            .register(Route::new(None, None, |_| false, RouteHandler::fire(|_c, _t| async { Ok(()) })));
        assert_eq!(builder.build().len(), 2);
    }
}
