//! `HttpConversationClient` against a local conversation service stub.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use parley_client::HttpConversationClient;
use parley_core::{Activity, BotError, CancellationToken, ConversationAccount, ConversationClient};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
struct Captured {
    path: String,
    authorization: Option<String>,
    body: Value,
}

/// Serves every request with `status` and `body`, recording what arrived.
async fn stub(status: StatusCode, body: &'static str) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let sink = Arc::clone(&sink);
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let sink = Arc::clone(&sink);
                    async move {
                        let path = req.uri().path().to_string();
                        let authorization = req
                            .headers()
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        let bytes = req.into_body().collect().await.unwrap().to_bytes();
                        sink.lock().push(Captured {
                            path,
                            authorization,
                            body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
                        });
                        let response = Response::builder()
                            .status(status)
                            .body(Full::new(Bytes::from_static(body.as_bytes())))
                            .unwrap();
                        Ok::<_, Infallible>(response)
                    }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (format!("http://{addr}"), captured)
}

fn reply(service_url: &str) -> Activity {
    let mut activity = Activity::message("pong")
        .with_service_url(service_url)
        .with_conversation(ConversationAccount::new("a:conv-1"));
    activity.reply_to_id = Some("42".to_string());
    activity
}

#[tokio::test]
async fn test_posts_reply_with_bearer_token() {
    let (url, captured) = stub(StatusCode::OK, r#"{"id":"created-1"}"#).await;
    let client = HttpConversationClient::builder()
        .bearer_token("secret")
        .build()
        .unwrap();

    let resource = client
        .send_activity(&reply(&url), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resource.map(|r| r.id).as_deref(), Some("created-1"));
    let captured = captured.lock();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].path, "/v3/conversations/a:conv-1/activities/42");
    assert_eq!(captured[0].authorization.as_deref(), Some("Bearer secret"));
    assert_eq!(captured[0].body["type"], "message");
    assert_eq!(captured[0].body["text"], "pong");
}

#[tokio::test]
async fn test_empty_body_is_none() {
    let (url, captured) = stub(StatusCode::OK, "  ").await;
    let client = HttpConversationClient::new().unwrap();

    let resource = client
        .send_activity(&reply(&url), CancellationToken::new())
        .await
        .unwrap();

    assert!(resource.is_none());
    assert!(captured.lock()[0].authorization.is_none());
}

#[tokio::test]
async fn test_non_success_status_is_client_error() {
    let (url, _captured) = stub(StatusCode::FORBIDDEN, r#"{"error":"denied"}"#).await;
    let client = HttpConversationClient::new().unwrap();

    let err = client
        .send_activity(&reply(&url), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        BotError::Client { status, message } => {
            assert_eq!(status, Some(403));
            assert!(message.contains("denied"));
        }
        other => panic!("expected client error, got {other:?}"),
    }
}
