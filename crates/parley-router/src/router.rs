//! The frozen route table and the dispatch algorithm.
//!
//! Routes are scanned in registration order and the first one whose coarse
//! key and selector both match runs. There is no specificity sorting: a
//! catch-all registered early shadows everything after it.
//!
//! The table is partitioned by activity type when it is frozen. Each
//! partition keeps the global registration order, with any-type routes woven
//! in at their original positions, so partitioning never changes which route
//! wins.

use crate::builder::RouterBuilder;
use crate::route::{Route, RouteHandler};
use parley_core::{Activity, ActivityType, BotResult, CancellationToken, InvokeResponse, TurnContext};
use std::collections::HashMap;

/// An immutable, ordered route table.
///
/// Built once through [`RouterBuilder`] and then shared, typically behind an
/// `Arc`. Dispatch takes no locks.
///
/// # Example
///
/// ```
/// use parley_core::CancellationToken;
/// use parley_core::fixtures::{message_activity, NoopClient};
/// use parley_core::TurnContext;
/// use parley_router::Router;
///
/// # tokio_test::block_on(async {
/// let router = Router::builder()
///     .on_message(|ctx, _cancel| async move {
///         assert_eq!(ctx.activity().text.as_deref(), Some("hi"));
///         Ok(())
///     })
///     .build();
///
/// let ctx = TurnContext::new(NoopClient::handle(), message_activity("hi"));
/// router.dispatch(ctx, CancellationToken::new()).await.unwrap();
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
    by_type: HashMap<ActivityType, Vec<usize>>,
    any_type: Vec<usize>,
}

impl Router {
    /// Starts a new builder.
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub(crate) fn from_routes(routes: Vec<Route>) -> Self {
        let mut by_type: HashMap<ActivityType, Vec<usize>> = HashMap::new();
        let mut any_type = Vec::new();

        for (index, route) in routes.iter().enumerate() {
            match route.activity_type() {
                Some(ty) => by_type.entry(ty.clone()).or_default().push(index),
                None => any_type.push(index),
            }
        }

        for partition in by_type.values_mut() {
            partition.extend_from_slice(&any_type);
            partition.sort_unstable();
        }

        Self {
            routes,
            by_type,
            any_type,
        }
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Route names in registration order.
    pub fn route_names(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(Route::name)
    }

    fn candidates<'a>(&'a self, activity_type: &ActivityType) -> impl Iterator<Item = usize> + 'a {
        self.by_type
            .get(activity_type)
            .unwrap_or(&self.any_type)
            .iter()
            .copied()
    }

    /// Returns the route at `index`, as returned by [`Router::position`].
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    /// Index of the route that would handle `activity`, if any.
    ///
    /// Selectors run here. Pass the result to [`Router::dispatch_at`] to run
    /// the route without matching again.
    pub fn position(&self, activity: &Activity) -> Option<usize> {
        self.candidates(&activity.activity_type)
            .find(|&index| self.routes[index].matches(activity))
    }

    /// Index of the response-producing route that would handle `activity`.
    ///
    /// Fire-only routes are skipped and their selectors never run.
    pub fn position_invoke(&self, activity: &Activity) -> Option<usize> {
        self.candidates(&activity.activity_type).find(|&index| {
            let route = &self.routes[index];
            route.handler().returns_response() && route.matches(activity)
        })
    }

    /// Returns the route that would handle `activity`, if any.
    pub fn find(&self, activity: &Activity) -> Option<&Route> {
        self.position(activity).and_then(|index| self.get(index))
    }

    /// Returns the response-producing route that would handle `activity`.
    ///
    /// Fire-only routes are skipped, so this can differ from [`Router::find`].
    pub fn find_invoke(&self, activity: &Activity) -> Option<&Route> {
        self.position_invoke(activity).and_then(|index| self.get(index))
    }

    /// Runs the first matching route.
    ///
    /// No match is not an error. When the first match returns an invoke
    /// response, the response is dropped. Handler errors are returned as-is.
    pub async fn dispatch(&self, ctx: TurnContext, cancel: CancellationToken) -> BotResult<()> {
        let index = self.position(ctx.activity());
        self.dispatch_at(index, ctx, cancel).await
    }

    /// Runs the route at `index` without evaluating any selector.
    ///
    /// `None` is the no-match case and returns `Ok(())`.
    pub async fn dispatch_at(
        &self,
        index: Option<usize>,
        ctx: TurnContext,
        cancel: CancellationToken,
    ) -> BotResult<()> {
        let Some(route) = index.and_then(|index| self.get(index)) else {
            tracing::debug!(
                turn_id = %ctx.turn_id(),
                activity_type = %ctx.activity().activity_type,
                "No route matched"
            );
            return Ok(());
        };

        tracing::debug!(turn_id = %ctx.turn_id(), route = route.name(), "Dispatching");

        match route.handler() {
            RouteHandler::Fire(handler) => handler(ctx, cancel).await,
            RouteHandler::Invoke(handler) => {
                let response = handler(ctx, cancel).await?;
                tracing::debug!(
                    route = route.name(),
                    status = response.status,
                    "Discarding invoke response outside the invoke path"
                );
                Ok(())
            }
        }
    }

    /// Runs the first matching response-producing route.
    ///
    /// Fire-only routes are skipped. No match yields
    /// [`InvokeResponse::not_implemented`].
    pub async fn dispatch_with_return(
        &self,
        ctx: TurnContext,
        cancel: CancellationToken,
    ) -> BotResult<InvokeResponse> {
        let index = self.position_invoke(ctx.activity());
        self.dispatch_with_return_at(index, ctx, cancel).await
    }

    /// Runs the response-producing route at `index` without evaluating any
    /// selector.
    ///
    /// `None`, or an index naming a fire-only route, yields
    /// [`InvokeResponse::not_implemented`].
    pub async fn dispatch_with_return_at(
        &self,
        index: Option<usize>,
        ctx: TurnContext,
        cancel: CancellationToken,
    ) -> BotResult<InvokeResponse> {
        let route = index.and_then(|index| self.get(index));

        let Some(RouteHandler::Invoke(handler)) = route.map(Route::handler) else {
            tracing::debug!(
                turn_id = %ctx.turn_id(),
                activity = %ctx.activity().route_key(),
                "No invoke route matched"
            );
            return Ok(InvokeResponse::not_implemented());
        };

        tracing::debug!(
            turn_id = %ctx.turn_id(),
            route = route.map(Route::name).unwrap_or_default(),
            "Dispatching invoke"
        );
        handler(ctx, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Route;
    use parley_core::fixtures::{activity, invoke_activity, message_activity, NoopClient};
    use parley_core::BotError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ctx(activity: Activity) -> TurnContext {
        TurnContext::new(NoopClient::handle(), activity)
    }

    fn counting(counter: &Arc<AtomicUsize>) -> RouteHandler {
        let counter = Arc::clone(counter);
        RouteHandler::fire(move |_ctx, _cancel| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let router = Router::builder()
            .route(Route::new(Some(ActivityType::Message), None, |_| true, counting(&first)))
            .route(Route::new(Some(ActivityType::Message), None, |_| true, counting(&second)))
            .build();

        router
            .dispatch(ctx(message_activity("hi")), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_typing_with_only_message_route_is_silent() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::builder()
            .route(Route::new(Some(ActivityType::Message), None, |_| true, counting(&hits)))
            .build();

        let result = router
            .dispatch(ctx(activity(ActivityType::Typing)), CancellationToken::new())
            .await;

        assert!(result.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_catch_all_registered_first_shadows_typed_route() {
        let any = Arc::new(AtomicUsize::new(0));
        let message = Arc::new(AtomicUsize::new(0));

        let router = Router::builder()
            .route(Route::new(None, None, |_| true, counting(&any)))
            .route(Route::new(Some(ActivityType::Message), None, |_| true, counting(&message)))
            .build();

        router
            .dispatch(ctx(message_activity("hi")), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(any.load(Ordering::SeqCst), 1);
        assert_eq!(message.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_catch_all_registered_last_still_reached() {
        let any = Arc::new(AtomicUsize::new(0));
        let router = Router::builder()
            .route(Route::new(
                Some(ActivityType::Message),
                None,
                |a| a.text.as_deref() == Some("help"),
                counting(&Arc::new(AtomicUsize::new(0))),
            ))
            .route(Route::new(None, None, |_| true, counting(&any)))
            .build();

        router
            .dispatch(ctx(message_activity("other")), CancellationToken::new())
            .await
            .unwrap();
        router
            .dispatch(ctx(activity(ActivityType::Typing)), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(any.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dispatch_discards_invoke_response() {
        let router = Router::builder()
            .on_invoke(|_ctx, _cancel| async { Ok(InvokeResponse::ok(json!({ "x": 1 }))) })
            .build();

        let result = router
            .dispatch(ctx(invoke_activity("task/fetch", json!({}))), CancellationToken::new())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_unmatched_invoke_is_501() {
        let router = Router::builder()
            .on_message(|_ctx, _cancel| async { Ok(()) })
            .build();

        let response = router
            .dispatch_with_return(
                ctx(invoke_activity("composeExtension/query", json!({}))),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response, InvokeResponse::not_implemented());
    }

    #[tokio::test]
    async fn test_dispatch_with_return_skips_fire_routes() {
        let fired = Arc::new(AtomicUsize::new(0));
        let router = Router::builder()
            .route(Route::new(Some(ActivityType::Invoke), None, |_| true, counting(&fired)))
            .on_invoke(|_ctx, _cancel| async { Ok(InvokeResponse::ok(json!("answered"))) })
            .build();

        let response = router
            .dispatch_with_return(ctx(invoke_activity("task/fetch", json!({}))), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.body, Some(json!("answered")));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_find_invoke_differs_from_find() {
        let router = Router::builder()
            .route(Route::new(Some(ActivityType::Invoke), None, |_| true, counting(&Arc::new(AtomicUsize::new(0)))))
            .on_task_fetch(|_ctx, _cancel| async { Ok(InvokeResponse::default()) })
            .build();
        let invoke = invoke_activity("task/fetch", json!({}));

        assert_eq!(router.find(&invoke).map(Route::name), Some("invoke"));
        assert_eq!(
            router.find_invoke(&invoke).map(Route::name),
            Some("invoke/task/fetch")
        );
    }

    #[tokio::test]
    async fn test_handler_error_propagates_unwrapped() {
        let router = Router::builder()
            .on_message(|_ctx, _cancel| async { Err(BotError::handler("kaboom")) })
            .build();

        let err = router
            .dispatch(ctx(message_activity("hi")), CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            BotError::Handler { message, .. } => assert_eq!(message, "kaboom"),
            other => panic!("expected handler error, got {other:?}"),
        }
    }

    #[test]
    fn test_route_names_in_order() {
        let router = Router::builder()
            .on_message(|_ctx, _cancel| async { Ok(()) })
            .on_task_fetch(|_ctx, _cancel| async { Ok(InvokeResponse::default()) })
            .build();

        assert_eq!(router.len(), 2);
        assert_eq!(
            router.route_names().collect::<Vec<_>>(),
            vec!["message", "invoke/task/fetch"]
        );
    }

    fn counting_selector(
        counter: &Arc<AtomicUsize>,
        accept: bool,
    ) -> impl Fn(&Activity) -> bool + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move |_activity| {
            counter.fetch_add(1, Ordering::SeqCst);
            accept
        }
    }

    #[tokio::test]
    async fn test_dispatch_at_runs_found_route_without_rematching() {
        let selected = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));
        let ran = Arc::new(AtomicUsize::new(0));
        let skipped = Arc::new(AtomicUsize::new(0));
        let router = Router::builder()
            .route(Route::new(
                Some(ActivityType::Message),
                None,
                counting_selector(&rejected, false),
                counting(&skipped),
            ))
            .route(Route::new(
                Some(ActivityType::Message),
                None,
                counting_selector(&selected, true),
                counting(&ran),
            ))
            .build();

        let activity = message_activity("hi");
        let index = router.position(&activity);
        assert_eq!(index, Some(1));
        assert_eq!(router.get(1).map(Route::name), Some("message"));

        router
            .dispatch_at(index, ctx(activity), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(skipped.load(Ordering::SeqCst), 0);
        assert_eq!(selected.load(Ordering::SeqCst), 1);
        assert_eq!(rejected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_with_return_at_runs_selector_once() {
        let evaluated = Arc::new(AtomicUsize::new(0));
        let router = Router::builder()
            .route(Route::new(
                Some(ActivityType::Invoke),
                Some("task/fetch".to_string()),
                counting_selector(&evaluated, true),
                RouteHandler::invoke(|_ctx, _cancel| async { Ok(InvokeResponse::ok(json!({ "ok": true }))) }),
            ))
            .build();

        let activity = invoke_activity("task/fetch", json!({}));
        let index = router.position_invoke(&activity);
        let response = router
            .dispatch_with_return_at(index, ctx(activity), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(evaluated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_with_return_at_fire_route_is_501() {
        let ran = Arc::new(AtomicUsize::new(0));
        let router = Router::builder()
            .route(Route::new(None, None, |_: &Activity| true, counting(&ran)))
            .build();

        let response = router
            .dispatch_with_return_at(
                Some(0),
                ctx(invoke_activity("task/fetch", json!({}))),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 501);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
