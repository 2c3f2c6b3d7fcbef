//! The bot application: pipeline, router and client behind one handle.

use std::sync::Arc;

use async_trait::async_trait;
use parley_client::HttpConversationClient;
use parley_config::ParleyConfig;
use parley_core::{
    Activity, BotHandle, BotResult, CancellationToken, ConversationClient, InvokeResponse,
    TurnContext,
};
use parley_middleware::stages::{
    TelemetryMiddleware, TenantFilterMiddleware, TracingMiddleware, TurnIdMiddleware,
};
use parley_middleware::{BoxFuture, BoxedMiddleware, MatchedRoute, Middleware, Pipeline, TurnResult};
use parley_router::{Route, Router, RouterBuilder};
use parley_server::{ProcessedTurn, TurnProcessor};

const DEFAULT_SERVICE_NAME: &str = "parley-bot";
const DEFAULT_ENVIRONMENT: &str = "development";

struct AppInner {
    bot: BotHandle,
    router: Arc<Router>,
    pipeline: Pipeline,
}

/// A built bot.
///
/// Every turn runs the built-in stages (turn id, tracing, telemetry and, when
/// tenants are configured, the tenant filter), then the user stages in
/// registration order, then the router. Invoke activities are answered
/// through the invoke path; everything else through the fire path.
///
/// Cloning is cheap and clones share the same router and pipeline.
///
/// # Example
///
/// ```
/// use parley::prelude::*;
/// use parley_core::fixtures::{invoke_activity, NoopClient};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let app = BotApplication::builder()
///     .app_id("my-app")
///     .client(Arc::new(NoopClient))
///     .routes(|r| {
///         r.on_task_fetch(|_ctx, _cancel| async { Ok(InvokeResponse::ok(json!({ "foo": "bar" }))) })
///     })
///     .build()
///     .unwrap();
///
/// let response = app
///     .process(invoke_activity("task/fetch", json!({})), CancellationToken::new())
///     .await
///     .unwrap()
///     .unwrap();
/// assert_eq!(response.status, 200);
/// # });
/// ```
#[derive(Clone)]
pub struct BotApplication {
    inner: Arc<AppInner>,
}

impl BotApplication {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> BotApplicationBuilder {
        BotApplicationBuilder::new()
    }

    /// The bot's app id.
    #[must_use]
    pub fn app_id(&self) -> &str {
        self.inner.bot.app_id()
    }

    /// The router turns end in.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// The turn pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    /// Runs one turn.
    ///
    /// Returns `Some` for invoke activities (501 when no route answers) and
    /// `None` for everything else, including turns a stage short-circuited
    /// without answering.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a stage or handler, unchanged.
    pub async fn process(
        &self,
        activity: Activity,
        cancel: CancellationToken,
    ) -> BotResult<Option<InvokeResponse>> {
        self.run_turn(activity, cancel).await.result
    }

    async fn run_turn(&self, activity: Activity, cancel: CancellationToken) -> ProcessedTurn {
        let mut ctx = TurnContext::new(self.inner.bot.clone(), activity);
        let router = Arc::clone(&self.inner.router);

        let result = self
            .inner
            .pipeline
            .process(&mut ctx, cancel, route_terminal(router))
            .await;

        ProcessedTurn {
            turn_id: Some(ctx.turn_id().clone()),
            result,
        }
    }
}

/// Terminal stage: matches once, records the route, then runs that route.
fn route_terminal(
    router: Arc<Router>,
) -> impl FnOnce(&mut TurnContext, CancellationToken) -> BoxFuture<'static, TurnResult> + Send {
    move |ctx: &mut TurnContext, cancel: CancellationToken| -> BoxFuture<'static, TurnResult> {
        let activity = ctx.activity();
        let invoke = activity.is_invoke();
        let index = if invoke {
            router.position_invoke(activity)
        } else {
            router.position(activity)
        };
        if let Some(route) = index.and_then(|index| router.get(index)) {
            let name = route.name().to_string();
            ctx.extensions_mut().insert(MatchedRoute(name));
        }

        let ctx = ctx.clone();
        Box::pin(async move {
            if invoke {
                router.dispatch_with_return_at(index, ctx, cancel).await.map(Some)
            } else {
                router.dispatch_at(index, ctx, cancel).await.map(|()| None)
            }
        })
    }
}

#[async_trait]
impl TurnProcessor for BotApplication {
    async fn process_turn(&self, activity: Activity, cancel: CancellationToken) -> ProcessedTurn {
        self.run_turn(activity, cancel).await
    }
}

impl std::fmt::Debug for BotApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotApplication")
            .field("app_id", &self.app_id())
            .field("routes", &self.inner.router.len())
            .field("stages", &self.inner.pipeline.stage_names())
            .finish()
    }
}

/// Builder for [`BotApplication`].
pub struct BotApplicationBuilder {
    app_id: String,
    client: Option<Arc<dyn ConversationClient>>,
    bearer_token: Option<String>,
    router: RouterBuilder,
    middleware: Vec<BoxedMiddleware>,
    service_name: String,
    environment: String,
    allowed_tenants: Vec<String>,
    trust_activity_id: bool,
}

impl Default for BotApplicationBuilder {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            client: None,
            bearer_token: None,
            router: RouterBuilder::new(),
            middleware: Vec::new(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            allowed_tenants: Vec::new(),
            trust_activity_id: false,
        }
    }
}

impl BotApplicationBuilder {
    /// Creates a builder with no routes and no user stages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the `bot` and `telemetry` sections of a loaded configuration.
    #[must_use]
    pub fn config(mut self, config: &ParleyConfig) -> Self {
        self.app_id.clone_from(&config.bot.app_id);
        self.bearer_token.clone_from(&config.bot.bearer_token);
        self.allowed_tenants.clone_from(&config.bot.allowed_tenants);
        self.trust_activity_id = config.bot.trust_activity_id;
        self.service_name.clone_from(&config.telemetry.service_name);
        self.environment.clone_from(&config.telemetry.environment);
        self
    }

    /// Sets the app id.
    #[must_use]
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    /// Sets the conversation client.
    ///
    /// Without one, [`build`](Self::build) creates an
    /// [`HttpConversationClient`] using the configured bearer token.
    #[must_use]
    pub fn client<C: ConversationClient>(self, client: Arc<C>) -> Self {
        self.shared_client(client)
    }

    /// Sets an already type-erased conversation client.
    #[must_use]
    pub fn shared_client(mut self, client: Arc<dyn ConversationClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the bearer token for the default HTTP client.
    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Appends a user stage. Stages run in the order they are added.
    #[must_use]
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Registers routes. May be called more than once; order is kept.
    #[must_use]
    pub fn routes<F>(mut self, register: F) -> Self
    where
        F: FnOnce(RouterBuilder) -> RouterBuilder,
    {
        self.router = register(self.router);
        self
    }

    /// Appends one route.
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.router.register(route);
        self
    }

    /// Service name for logs and metrics.
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Deployment environment for logs.
    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Restricts the bot to the given tenants. An empty list admits all.
    #[must_use]
    pub fn allowed_tenants<I, S>(mut self, tenants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tenants = tenants.into_iter().map(Into::into).collect();
        self
    }

    /// Uses the incoming activity id as the turn id.
    #[must_use]
    pub const fn trust_activity_id(mut self, trust: bool) -> Self {
        self.trust_activity_id = trust;
        self
    }

    /// Freezes routes and stages.
    ///
    /// # Errors
    ///
    /// Fails only when no client was set and the default HTTP client cannot
    /// be created.
    pub fn build(self) -> BotResult<BotApplication> {
        let client: Arc<dyn ConversationClient> = match self.client {
            Some(client) => client,
            None => Arc::new(
                HttpConversationClient::builder()
                    .maybe_bearer_token(self.bearer_token)
                    .build()?,
            ),
        };

        let mut pipeline = Pipeline::builder()
            .stage(TurnIdMiddleware::with_trust(self.trust_activity_id))
            .stage(TracingMiddleware::new(self.service_name.as_str()))
            .stage(TelemetryMiddleware::new(self.service_name.as_str()).environment(self.environment));
        if !self.allowed_tenants.is_empty() {
            pipeline = pipeline.stage(TenantFilterMiddleware::new(self.allowed_tenants));
        }
        for stage in self.middleware {
            pipeline = pipeline.boxed(stage);
        }

        let app = BotApplication {
            inner: Arc::new(AppInner {
                bot: BotHandle::new(self.app_id, client),
                router: Arc::new(self.router.build()),
                pipeline: pipeline.build(),
            }),
        };

        tracing::info!(
            app_id = app.app_id(),
            routes = app.inner.router.len(),
            stages = ?app.inner.pipeline.stage_names(),
            "Bot application built"
        );

        Ok(app)
    }
}

impl std::fmt::Debug for BotApplicationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotApplicationBuilder")
            .field("app_id", &self.app_id)
            .field("has_client", &self.client.is_some())
            .field("router", &self.router)
            .field("middleware", &self.middleware.len())
            .field("allowed_tenants", &self.allowed_tenants)
            .finish_non_exhaustive()
    }
}
