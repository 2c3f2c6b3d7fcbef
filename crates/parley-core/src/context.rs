//! Turn context types.
//!
//! A [`TurnContext`] is created fresh for every inbound activity. It carries
//! the bot handle, the activity (raw or narrowed), a [`TurnId`] for log
//! correlation and a typed extension map that middleware use to hand data to
//! later stages and handlers.

use crate::activity::Activity;
use crate::client::{ConversationClient, ResourceResponse};
use crate::error::BotResult;
use crate::typed::TypedActivity;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identifier of a single turn.
///
/// Freshly generated ids are UUID v7, so they sort by creation time. A turn id
/// may also adopt the inbound activity id, which is an opaque string.
///
/// # Example
///
/// ```
/// use parley_core::TurnId;
///
/// let id = TurnId::new();
/// assert_eq!(id.as_str().len(), 36);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(String);

impl TurnId {
    /// Creates a new UUID v7 turn id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Adopts an externally assigned id, such as the activity id.
    pub fn from_external(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for TurnId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

/// Turn-scoped typed values keyed by type.
///
/// Values are reference counted so the map can be cloned into a narrowed
/// context without requiring `T: Clone`.
#[derive(Clone, Default)]
pub struct Extensions {
    map: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, replacing any previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.map.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Returns the value of type `T`, if present.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Removes the value of type `T`.
    ///
    /// Returns `None` when absent or when a cloned context still shares it.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .and_then(|value| Arc::try_unwrap(value).ok())
    }

    /// Returns `true` if a value of type `T` is stored.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}

struct BotHandleInner {
    app_id: String,
    client: Arc<dyn ConversationClient>,
}

/// Shared handle to the running bot: its app id and conversation client.
#[derive(Clone)]
pub struct BotHandle {
    inner: Arc<BotHandleInner>,
}

impl BotHandle {
    /// Creates a handle.
    pub fn new(app_id: impl Into<String>, client: Arc<dyn ConversationClient>) -> Self {
        Self {
            inner: Arc::new(BotHandleInner {
                app_id: app_id.into(),
                client,
            }),
        }
    }

    /// The bot's Microsoft app id.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.inner.app_id
    }

    /// The conversation client.
    #[must_use]
    pub fn client(&self) -> &Arc<dyn ConversationClient> {
        &self.inner.client
    }
}

impl fmt::Debug for BotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotHandle")
            .field("app_id", &self.inner.app_id)
            .finish_non_exhaustive()
    }
}

/// Per-turn context handed to middleware and handlers.
///
/// `A` is [`Activity`] before narrowing and [`TypedActivity<T>`] after.
/// Cloning is cheap: the activity and bot handle are shared.
///
/// # Example
///
/// ```
/// use parley_core::{Activity, TurnContext};
/// use parley_core::fixtures::{message_activity, NoopClient};
///
/// let ctx = TurnContext::new(NoopClient::handle(), message_activity("hi"));
/// assert_eq!(ctx.activity().text.as_deref(), Some("hi"));
/// ```
#[derive(Debug)]
pub struct TurnContext<A = Activity> {
    bot: BotHandle,
    activity: Arc<A>,
    turn_id: TurnId,
    extensions: Extensions,
}

impl<A> Clone for TurnContext<A> {
    fn clone(&self) -> Self {
        Self {
            bot: self.bot.clone(),
            activity: Arc::clone(&self.activity),
            turn_id: self.turn_id.clone(),
            extensions: self.extensions.clone(),
        }
    }
}

impl<A: AsRef<Activity>> TurnContext<A> {
    /// Creates a context with a fresh turn id and no extensions.
    pub fn new(bot: BotHandle, activity: A) -> Self {
        Self {
            bot,
            activity: Arc::new(activity),
            turn_id: TurnId::new(),
            extensions: Extensions::new(),
        }
    }

    /// The bot handle.
    pub fn bot(&self) -> &BotHandle {
        &self.bot
    }

    /// The activity for this turn.
    pub fn activity(&self) -> &A {
        &self.activity
    }

    /// The raw envelope, whatever `A` is.
    pub fn envelope(&self) -> &Activity {
        AsRef::<Activity>::as_ref(&*self.activity)
    }

    /// The turn id.
    pub fn turn_id(&self) -> &TurnId {
        &self.turn_id
    }

    /// Replaces the turn id.
    pub fn set_turn_id(&mut self, turn_id: TurnId) {
        self.turn_id = turn_id;
    }

    /// Turn-scoped extensions.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable turn-scoped extensions.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Shorthand for `extensions().get::<T>()`.
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Addresses `activity` as a reply to this turn and sends it.
    ///
    /// The client's result is returned unchanged, including `Ok(None)` when
    /// the service answered with an empty body.
    pub async fn send_activity(
        &self,
        mut activity: Activity,
        cancel: CancellationToken,
    ) -> BotResult<Option<ResourceResponse>> {
        activity.apply_reply_reference(self.envelope());
        tracing::debug!(
            turn_id = %self.turn_id,
            activity_type = %activity.activity_type,
            conversation_id = activity.conversation_id().unwrap_or_default(),
            "Sending activity"
        );
        self.bot.client().send_activity(&activity, cancel).await
    }

    /// Sends a text message reply.
    pub async fn send_text(
        &self,
        text: impl Into<String>,
        cancel: CancellationToken,
    ) -> BotResult<Option<ResourceResponse>> {
        self.send_activity(Activity::message(text), cancel).await
    }

    /// Sends a typing indicator.
    pub async fn send_typing(&self, cancel: CancellationToken) -> BotResult<Option<ResourceResponse>> {
        self.send_activity(Activity::typing(), cancel).await
    }

    /// Narrows the activity value into `T`.
    ///
    /// The new context shares the bot handle, turn id and extensions. On
    /// failure the error is returned and no context is produced.
    pub fn narrow<T: DeserializeOwned>(&self) -> BotResult<TurnContext<TypedActivity<T>>> {
        let typed = self.envelope().narrow::<T>()?;
        Ok(TurnContext {
            bot: self.bot.clone(),
            activity: Arc::new(typed),
            turn_id: self.turn_id.clone(),
            extensions: self.extensions.clone(),
        })
    }
}
