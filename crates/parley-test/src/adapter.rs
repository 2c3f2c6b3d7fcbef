//! Drives turns through a processor without a network.

use std::sync::Arc;

use bytes::Bytes;
use http::{header, Method, Request};
use http_body_util::Full;
use parley_core::{Activity, CancellationToken};
use parley_server::{ProcessedTurn, Server, ServerConfig, TurnProcessor};
use serde::Serialize;

use crate::error::TestError;
use crate::response::TestResponse;

/// Runs bot turns in memory.
///
/// [`process`](Self::process) calls the processor directly.
/// [`post`](Self::post) goes through the same request handling as the HTTP
/// endpoint, so status codes, bodies and error envelopes match production.
///
/// # Example
///
/// ```ignore
/// let adapter = TestAdapter::new(Arc::new(app));
///
/// let response = adapter
///     .post(&json!({"type": "invoke", "name": "task/fetch", "value": {}}))
///     .await?;
/// response.assert_status_code(200);
/// ```
pub struct TestAdapter {
    processor: Arc<dyn TurnProcessor>,
    server: Server,
}

impl TestAdapter {
    /// An adapter with the default endpoint configuration.
    #[must_use]
    pub fn new(processor: Arc<dyn TurnProcessor>) -> Self {
        Self::with_config(processor, ServerConfig::default())
    }

    /// An adapter using `config` for paths and timeouts.
    #[must_use]
    pub fn with_config(processor: Arc<dyn TurnProcessor>, config: ServerConfig) -> Self {
        let server = Server::builder()
            .config(config)
            .build(Arc::clone(&processor));
        Self { processor, server }
    }

    /// Runs one turn for `activity` directly on the processor.
    pub async fn process(&self, activity: Activity) -> ProcessedTurn {
        self.processor
            .process_turn(activity, CancellationToken::new())
            .await
    }

    /// Deserializes `json` into an activity and runs it.
    ///
    /// # Errors
    ///
    /// Returns `TestError::Json` if `json` is not an activity.
    pub async fn process_json(&self, json: serde_json::Value) -> Result<ProcessedTurn, TestError> {
        let activity: Activity = serde_json::from_value(json)?;
        Ok(self.process(activity).await)
    }

    /// POSTs `body` to the messages endpoint.
    ///
    /// # Errors
    ///
    /// Returns `TestError` if `body` cannot be serialized or the response
    /// cannot be read.
    pub async fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<TestResponse, TestError> {
        let bytes = serde_json::to_vec(body)?;
        self.post_raw(bytes).await
    }

    /// POSTs raw bytes to the messages endpoint.
    ///
    /// # Errors
    ///
    /// Returns `TestError` if the request or response cannot be built or read.
    pub async fn post_raw(&self, body: impl Into<Bytes>) -> Result<TestResponse, TestError> {
        let path = self.server.config().messages_path().to_string();
        self.send(Method::POST, &path, body.into()).await
    }

    /// GETs `path`, e.g. `/health`.
    ///
    /// # Errors
    ///
    /// Returns `TestError` if the request or response cannot be built or read.
    pub async fn get(&self, path: &str) -> Result<TestResponse, TestError> {
        self.send(Method::GET, path, Bytes::new()).await
    }

    /// The in-memory server, for readiness toggles and config.
    #[must_use]
    pub const fn server(&self) -> &Server {
        &self.server
    }

    async fn send(&self, method: Method, path: &str, body: Bytes) -> Result<TestResponse, TestError> {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(body))
            .map_err(|e| TestError::RequestBuild(e.to_string()))?;

        let response = self.server.handle_request(request).await;
        TestResponse::from_http(response).await
    }
}

impl std::fmt::Debug for TestAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestAdapter")
            .field("messages_path", &self.server.config().messages_path())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_core::{BotError, InvokeResponse, TurnId};
    use serde_json::json;

    struct EchoProcessor;

    #[async_trait]
    impl TurnProcessor for EchoProcessor {
        async fn process_turn(&self, activity: Activity, _cancel: CancellationToken) -> ProcessedTurn {
            let turn_id = Some(TurnId::from_external("turn-1"));
            let result = match activity.name.as_deref() {
                Some("fail") => Err(BotError::handler("boom")),
                Some(_) if activity.is_invoke() => {
                    Ok(Some(InvokeResponse::ok(activity.value.unwrap_or_default())))
                }
                _ => Ok(None),
            };
            ProcessedTurn { turn_id, result }
        }
    }

    fn adapter() -> TestAdapter {
        TestAdapter::new(Arc::new(EchoProcessor))
    }

    #[tokio::test]
    async fn test_post_invoke() {
        let response = adapter()
            .post(&json!({"type": "invoke", "name": "task/fetch", "value": {"foo": "bar"}}))
            .await
            .unwrap();

        response
            .assert_status_code(200)
            .assert_json_eq(&json!({"value": {"foo": "bar"}}));
    }

    #[tokio::test]
    async fn test_post_message_is_empty_ok() {
        let response = adapter()
            .post(&json!({"type": "message", "text": "hi"}))
            .await
            .unwrap();

        response.assert_status_code(200).assert_empty();
    }

    #[tokio::test]
    async fn test_post_error_carries_turn_id() {
        let response = adapter()
            .post(&json!({"type": "event", "name": "fail"}))
            .await
            .unwrap();

        response.assert_status_code(500).assert_error_code("HANDLER_ERROR");
        assert_eq!(response.error_turn_id().as_deref(), Some("turn-1"));
    }

    #[tokio::test]
    async fn test_post_raw_invalid_body() {
        let response = adapter().post_raw("not json").await.unwrap();
        response.assert_status_code(400).assert_error_code("INVALID_ACTIVITY");
    }

    #[tokio::test]
    async fn test_process_json_direct() {
        let turn = adapter()
            .process_json(json!({"type": "invoke", "name": "x", "value": 1}))
            .await
            .unwrap();

        let response = turn.result.unwrap().unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_process_json_rejects_non_activity() {
        let result = adapter().process_json(json!({"text": "no type"})).await;
        assert!(matches!(result, Err(TestError::Json(_))));
    }

    #[tokio::test]
    async fn test_health() {
        adapter().get("/health").await.unwrap().assert_status_code(200);
    }
}
