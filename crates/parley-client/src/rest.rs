//! `reqwest`-backed conversation client.

use async_trait::async_trait;
use parley_core::{Activity, BotError, BotResult, CancellationToken, ConversationClient, ResourceResponse};
use parley_telemetry::metrics::record_outbound_activity;
use reqwest::{Client, Url};
use std::time::Duration;

/// Default timeout for a single send.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the endpoint an activity is posted to.
///
/// `{serviceUrl}/v3/conversations/{conversationId}/activities`, with
/// `/{replyToId}` appended for replies. Path segments are percent-encoded.
pub fn activities_url(activity: &Activity) -> BotResult<Url> {
    let service_url = activity
        .service_url
        .as_deref()
        .ok_or_else(|| BotError::client("outgoing activity has no serviceUrl", None))?;
    let conversation_id = activity
        .conversation_id()
        .ok_or_else(|| BotError::client("outgoing activity has no conversation id", None))?;

    let mut url = Url::parse(service_url)
        .map_err(|e| BotError::client(format!("invalid serviceUrl {service_url:?}: {e}"), None))?;

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| BotError::client(format!("serviceUrl {service_url:?} cannot be a base"), None))?;
        segments
            .pop_if_empty()
            .extend(["v3", "conversations", conversation_id, "activities"]);
        if let Some(reply_to_id) = activity.reply_to_id.as_deref() {
            segments.push(reply_to_id);
        }
    }

    Ok(url)
}

/// Conversation client that POSTs activities as JSON.
#[derive(Debug, Clone)]
pub struct HttpConversationClient {
    client: Client,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl HttpConversationClient {
    /// Creates a client with default settings and no bearer token.
    pub fn new() -> BotResult<Self> {
        Self::builder().build()
    }

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> HttpConversationClientBuilder {
        HttpConversationClientBuilder::default()
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn post(&self, url: Url, activity: &Activity) -> BotResult<Option<ResourceResponse>> {
        let mut request = self.client.post(url).json(activity);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BotError::client(format!("request failed: {e}"), e.status().map(|s| s.as_u16())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BotError::client(format!("failed to read body: {e}"), Some(status.as_u16())))?;

        if !status.is_success() {
            return Err(BotError::client(
                format!("conversation service returned {status}: {}", body.trim()),
                Some(status.as_u16()),
            ));
        }

        if body.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&body).map(Some).map_err(|e| {
            BotError::client(
                format!("invalid resource response: {e}"),
                Some(status.as_u16()),
            )
        })
    }
}

#[async_trait]
impl ConversationClient for HttpConversationClient {
    async fn send_activity(
        &self,
        activity: &Activity,
        cancel: CancellationToken,
    ) -> BotResult<Option<ResourceResponse>> {
        let url = activities_url(activity)?;
        tracing::debug!(url = %url, activity_type = %activity.activity_type, "Sending activity");

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(BotError::cancelled("send cancelled")),
            result = self.post(url, activity) => result,
        };

        record_outbound_activity(result.is_ok());
        if let Err(error) = &result {
            tracing::warn!(error = %error, "Failed to send activity");
        }
        result
    }
}

/// Builder for [`HttpConversationClient`].
#[derive(Debug, Default)]
pub struct HttpConversationClientBuilder {
    bearer_token: Option<String>,
    timeout: Option<Duration>,
    client: Option<Client>,
}

impl HttpConversationClientBuilder {
    /// Sends `Authorization: Bearer <token>` on every request.
    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Sets the bearer token when `Some`.
    #[must_use]
    pub fn maybe_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses a preconfigured `reqwest` client. The timeout setting is ignored.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the client.
    pub fn build(self) -> BotResult<HttpConversationClient> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(timeout)
                .pool_max_idle_per_host(16)
                .build()
                .map_err(|e| BotError::client(format!("failed to create client: {e}"), None))?,
        };

        Ok(HttpConversationClient {
            client,
            bearer_token: self.bearer_token,
            timeout,
        })
    }
}
