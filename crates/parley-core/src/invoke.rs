//! Responses to invoke activities.

use crate::error::{BotError, BotResult};
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// The synchronous answer to an invoke activity.
///
/// `status` becomes the HTTP status line. `body` and `response_type` become
/// the JSON body `{"value": .., "type": ..}`, each omitted when `None`.
///
/// # Example
///
/// ```
/// use parley_core::InvokeResponse;
/// use serde_json::json;
///
/// let response = InvokeResponse::ok(json!({ "foo": "bar" }));
/// assert_eq!(response.status, 200);
/// assert_eq!(response.to_http_body(), json!({ "value": { "foo": "bar" } }));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response payload.
    pub body: Option<Value>,
    /// Payload type discriminator, e.g. `application/vnd.microsoft.card.adaptive`.
    pub response_type: Option<String>,
}

#[derive(Serialize)]
struct WireBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a Value>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    response_type: Option<&'a str>,
}

impl InvokeResponse {
    /// Creates an empty response with the given status.
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            body: None,
            response_type: None,
        }
    }

    /// Creates a 200 response carrying `body`.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::new(200).with_body(body)
    }

    /// Creates a 200 response by serializing `body`.
    pub fn json<T: Serialize>(body: &T) -> BotResult<Self> {
        let body = serde_json::to_value(body).map_err(BotError::Serialization)?;
        Ok(Self::ok(body))
    }

    /// The response used when no route handles an invoke: 501, no body.
    #[must_use]
    pub const fn not_implemented() -> Self {
        Self::new(501)
    }

    /// Sets the body. JSON `null` leaves the body absent.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body).filter(|v| !v.is_null());
        self
    }

    /// Sets the type discriminator.
    #[must_use]
    pub fn with_type(mut self, response_type: impl Into<String>) -> Self {
        self.response_type = Some(response_type.into());
        self
    }

    /// Returns the HTTP status, falling back to 500 for out-of-range codes.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the JSON body written to the HTTP response.
    #[must_use]
    pub fn to_http_body(&self) -> Value {
        serde_json::to_value(self.wire()).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
    }

    /// Serializes the HTTP body to bytes.
    pub fn to_http_bytes(&self) -> BotResult<Vec<u8>> {
        serde_json::to_vec(&self.wire()).map_err(BotError::Serialization)
    }

    fn wire(&self) -> WireBody<'_> {
        WireBody {
            value: self.body.as_ref().filter(|v| !v.is_null()),
            response_type: self.response_type.as_deref(),
        }
    }
}

impl Default for InvokeResponse {
    fn default() -> Self {
        Self::new(200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_is_200_empty() {
        let response = InvokeResponse::default();
        assert_eq!(response.status, 200);
        assert_eq!(response.to_http_body(), json!({}));
    }

    #[test]
    fn test_not_implemented_has_empty_object_body() {
        let response = InvokeResponse::not_implemented();
        assert_eq!(response.status_code(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(response.to_http_bytes().unwrap(), b"{}");
    }

    #[test]
    fn test_null_body_is_omitted() {
        let response = InvokeResponse::ok(Value::Null);
        assert!(response.body.is_none());
        assert_eq!(response.to_http_bytes().unwrap(), b"{}");

        let response = InvokeResponse::json(&None::<String>).unwrap();
        assert_eq!(response.to_http_bytes().unwrap(), b"{}");

        let mut response = InvokeResponse::new(200).with_type("application/json");
        response.body = Some(Value::Null);
        assert_eq!(response.to_http_body(), json!({ "type": "application/json" }));
    }

    #[test]
    fn test_body_and_type() {
        let response = InvokeResponse::ok(json!({ "card": true }))
            .with_type("application/vnd.microsoft.activity.message");
        assert_eq!(
            response.to_http_body(),
            json!({
                "value": { "card": true },
                "type": "application/vnd.microsoft.activity.message"
            })
        );
    }

    #[test]
    fn test_json_constructor() {
        #[derive(Serialize)]
        struct Reply {
            foo: &'static str,
        }
        let response = InvokeResponse::json(&Reply { foo: "bar" }).unwrap();
        assert_eq!(response.to_http_bytes().unwrap(), br#"{"value":{"foo":"bar"}}"#);
    }

    #[test]
    fn test_invalid_status_maps_to_500() {
        assert_eq!(
            InvokeResponse::new(42).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
