//! The conversation client capability.

use crate::activity::Activity;
use crate::error::BotResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Identifies a resource created by the conversation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceResponse {
    /// Id of the created activity.
    pub id: String,
}

/// Sends activities to a conversation.
///
/// Implementations must not treat an empty response body as an error; they
/// return `Ok(None)` instead.
#[async_trait]
pub trait ConversationClient: Send + Sync + 'static {
    /// Sends an already-addressed activity.
    async fn send_activity(
        &self,
        activity: &Activity,
        cancel: CancellationToken,
    ) -> BotResult<Option<ResourceResponse>>;
}
