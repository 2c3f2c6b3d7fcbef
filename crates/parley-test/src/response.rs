//! Captured endpoint responses.

use crate::error::TestError;
use bytes::Bytes;
use http::{header, HeaderMap, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use std::fmt;

/// An HTTP response from the bot endpoint, fully buffered.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Buffers an endpoint response.
    ///
    /// # Errors
    ///
    /// Returns `TestError::BodyRead` if the body cannot be collected.
    pub async fn from_http<B>(response: http::Response<B>) -> Result<Self, TestError>
    where
        B: BodyExt,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self::new(parts.status, parts.headers, body))
    }

    /// Creates a response from raw parts.
    #[must_use]
    pub const fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Status code as a `u16`.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The `content-type` header, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Raw body bytes.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// True when the body has no bytes, as for non-invoke turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns `TestError::BodyRead` for invalid UTF-8.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `TestError::Json` if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// `error.code` of an error envelope body.
    #[must_use]
    pub fn error_code(&self) -> Option<String> {
        self.envelope_field("code")
    }

    /// `error.turnId` of an error envelope body.
    #[must_use]
    pub fn error_turn_id(&self) -> Option<String> {
        self.envelope_field("turnId")
    }

    fn envelope_field(&self, field: &str) -> Option<String> {
        let value: serde_json::Value = self.json().ok()?;
        json_path(&value, &format!("error.{field}"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    }

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status_code(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status.as_u16(),
            expected,
            "Expected status {expected}, got {} with body {:?}",
            self.status.as_u16(),
            self.body
        );
        self
    }

    /// Asserts an empty body and no content type.
    ///
    /// # Panics
    ///
    /// Panics if a body or content type is present.
    pub fn assert_empty(&self) -> &Self {
        assert!(self.is_empty(), "Expected empty body, got {:?}", self.body);
        assert!(
            self.content_type().is_none(),
            "Expected no content type, got {:?}",
            self.content_type()
        );
        self
    }

    /// Asserts the JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON or doesn't match.
    pub fn assert_json_eq(&self, expected: &serde_json::Value) -> &Self {
        let actual: serde_json::Value = self.json().expect("Body should be valid JSON");
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }

    /// Asserts a dotted JSON path, e.g. `"value.card.title"` or `"items.0"`.
    ///
    /// # Panics
    ///
    /// Panics if the path is missing or the value doesn't match.
    pub fn assert_json_field(&self, path: &str, expected: &serde_json::Value) -> &Self {
        let json: serde_json::Value = self.json().expect("Body should be valid JSON");
        let actual = json_path(&json, path)
            .unwrap_or_else(|| panic!("JSON path '{path}' not found in: {json}"));
        assert_eq!(actual, expected, "JSON field '{path}'");
        self
    }

    /// Asserts an error envelope with the given code.
    ///
    /// # Panics
    ///
    /// Panics if the body is not an error envelope with `code`.
    pub fn assert_error_code(&self, code: &str) -> &Self {
        assert_eq!(
            self.error_code().as_deref(),
            Some(code),
            "Expected error code {code}, got body {:?}",
            self.body
        );
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

fn json_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match segment.parse::<usize>() {
            Ok(index) => current.get(index)?,
            Err(_) => current.get(segment)?,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    fn json_response(status: u16, body: &str) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        TestResponse::new(
            StatusCode::from_u16(status).unwrap(),
            headers,
            Bytes::from(body.to_string()),
        )
    }

    #[test]
    fn test_invoke_body() {
        let response = json_response(200, r#"{"value":{"foo":"bar"}}"#);
        response
            .assert_status_code(200)
            .assert_json_field("value.foo", &json!("bar"));
        assert_eq!(response.content_type(), Some("application/json"));
    }

    #[test]
    fn test_error_envelope_accessors() {
        let response = json_response(
            500,
            r#"{"error":{"code":"HANDLER_ERROR","message":"boom","turnId":"t-1"}}"#,
        );
        response.assert_error_code("HANDLER_ERROR");
        assert_eq!(response.error_turn_id().as_deref(), Some("t-1"));
    }

    #[test]
    fn test_empty_response() {
        let response = TestResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::new());
        response.assert_status_code(200).assert_empty();
        assert_eq!(response.error_code(), None);
    }

    #[test]
    fn test_json_path() {
        let value = json!({"attachments": [{"contentType": "card"}]});
        assert_eq!(
            json_path(&value, "attachments.0.contentType"),
            Some(&json!("card"))
        );
        assert_eq!(json_path(&value, "attachments.1"), None);
    }
}
