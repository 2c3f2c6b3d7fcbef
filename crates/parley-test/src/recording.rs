//! A conversation client that records instead of sending.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use parley_core::{
    Activity, ActivityType, BotError, BotHandle, BotResult, CancellationToken,
    ConversationClient, ResourceResponse,
};

type Scripted = BotResult<Option<ResourceResponse>>;

/// Records every activity a bot sends.
///
/// Each send returns the next scripted result, or `activity-{n}` once the
/// script runs out. A send on a cancelled token fails with
/// `BotError::Cancelled` and is not recorded.
///
/// # Example
///
/// ```
/// use parley_test::RecordingClient;
///
/// let client = RecordingClient::new();
/// let bot = client.handle("my-app");
/// assert_eq!(bot.app_id(), "my-app");
/// assert!(client.sent().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordingClient {
    sent: Mutex<Vec<Activity>>,
    script: Mutex<VecDeque<Scripted>>,
    sends: AtomicUsize,
}

impl RecordingClient {
    /// A new shared client.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A bot handle that sends through this client.
    #[must_use]
    pub fn handle(self: &Arc<Self>, app_id: &str) -> BotHandle {
        BotHandle::new(app_id, Arc::clone(self) as Arc<dyn ConversationClient>)
    }

    /// Queues the result for the next unanswered send.
    pub fn push_response(&self, response: Option<ResourceResponse>) {
        self.script.lock().push_back(Ok(response));
    }

    /// Queues a failure for the next unanswered send.
    pub fn push_error(&self, error: BotError) {
        self.script.lock().push_back(Err(error));
    }

    /// Activities sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<Activity> {
        self.sent.lock().clone()
    }

    /// Text of every sent message activity.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|a| a.activity_type == ActivityType::Message)
            .filter_map(|a| a.text.clone())
            .collect()
    }

    /// Forgets recorded activities. The script is kept.
    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl ConversationClient for RecordingClient {
    async fn send_activity(
        &self,
        activity: &Activity,
        cancel: CancellationToken,
    ) -> BotResult<Option<ResourceResponse>> {
        if cancel.is_cancelled() {
            return Err(BotError::cancelled("send cancelled"));
        }

        self.sent.lock().push(activity.clone());
        let n = self.sends.fetch_add(1, Ordering::Relaxed) + 1;

        match self.script.lock().pop_front() {
            Some(scripted) => scripted,
            None => Ok(Some(ResourceResponse {
                id: format!("activity-{n}"),
            })),
        }
    }
}
