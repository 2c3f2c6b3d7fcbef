//! Activity fixtures for tests across the Parley workspace.
//!
//! # Example
//!
//! ```
//! use parley_core::fixtures;
//!
//! let activity = fixtures::invoke_activity("task/fetch", serde_json::json!({ "foo": "bar" }));
//! assert!(activity.is_invoke());
//! assert_eq!(activity.conversation_id(), Some(fixtures::CONVERSATION_ID));
//! ```

use crate::activity::{Activity, ActivityType, ChannelAccount, ConversationAccount};
use crate::client::{ConversationClient, ResourceResponse};
use crate::context::BotHandle;
use crate::error::BotResult;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// App id used by fixture handles.
pub const APP_ID: &str = "00000000-0000-0000-0000-000000000001";
/// Conversation id used by fixture activities.
pub const CONVERSATION_ID: &str = "a:fixture-conversation";
/// Tenant id used by fixture activities.
pub const TENANT_ID: &str = "fixture-tenant";
/// Service URL used by fixture activities.
pub const SERVICE_URL: &str = "https://smba.trafficmanager.net/amer/";

/// An activity of `activity_type` addressed like a Teams personal chat.
pub fn activity(activity_type: impl Into<ActivityType>) -> Activity {
    let mut activity = Activity::new(activity_type)
        .with_id("1700000000000")
        .with_service_url(SERVICE_URL)
        .with_from(ChannelAccount::new("29:fixture-user"))
        .with_recipient(ChannelAccount::new(format!("28:{APP_ID}")))
        .with_conversation(ConversationAccount {
            tenant_id: Some(TENANT_ID.to_string()),
            conversation_type: Some("personal".to_string()),
            ..ConversationAccount::new(CONVERSATION_ID)
        })
        .with_channel_data(json!({ "tenant": { "id": TENANT_ID } }));
    activity.channel_id = Some("msteams".to_string());
    activity
}

/// A message activity with `text`.
pub fn message_activity(text: impl Into<String>) -> Activity {
    activity(ActivityType::Message).with_text(text)
}

/// An invoke activity named `name` carrying `value`.
pub fn invoke_activity(name: impl Into<String>, value: Value) -> Activity {
    activity(ActivityType::Invoke)
        .with_name(name)
        .with_value(value)
}

/// An event activity named `name` carrying `value`.
pub fn event_activity(name: impl Into<String>, value: Value) -> Activity {
    activity(ActivityType::Event)
        .with_name(name)
        .with_value(value)
}

/// A conversation client that accepts everything and returns no resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClient;

impl NoopClient {
    /// A bot handle backed by a `NoopClient`.
    #[must_use]
    pub fn handle() -> BotHandle {
        BotHandle::new(APP_ID, Arc::new(Self))
    }
}

#[async_trait]
impl ConversationClient for NoopClient {
    async fn send_activity(
        &self,
        _activity: &Activity,
        _cancel: CancellationToken,
    ) -> BotResult<Option<ResourceResponse>> {
        Ok(None)
    }
}
