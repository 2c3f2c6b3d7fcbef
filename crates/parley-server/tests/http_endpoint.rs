//! The activity endpoint over a real socket.

use async_trait::async_trait;
use parley_core::{Activity, CancellationToken, InvokeResponse};
use parley_server::{ProcessedTurn, Server, ServerConfig, ShutdownSignal, TurnProcessor};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

struct EchoInvoke;

#[async_trait]
impl TurnProcessor for EchoInvoke {
    async fn process_turn(&self, activity: Activity, _cancel: CancellationToken) -> ProcessedTurn {
        let result = if activity.is_invoke() {
            Ok(Some(InvokeResponse::ok(activity.value.clone().unwrap_or(Value::Null))))
        } else {
            Ok(None)
        };
        ProcessedTurn::anonymous(result)
    }
}

async fn start(path: &str) -> (String, ShutdownSignal, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig::builder()
        .messages_path(path)
        .shutdown_timeout(Duration::from_millis(200))
        .build();
    let server = Server::new(config, Arc::new(EchoInvoke));
    let shutdown = ShutdownSignal::new();
    let signal = shutdown.clone();
    let handle = tokio::spawn(async move {
        server.serve(listener, signal).await.unwrap();
    });
    (format!("http://{addr}"), shutdown, handle)
}

#[tokio::test]
async fn test_invoke_round_trip_over_http() {
    let (base, shutdown, handle) = start("/api/messages").await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/messages"))
        .json(&json!({
            "type": "invoke",
            "name": "task/fetch",
            "value": { "data": { "id": 7 } }
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "value": { "data": { "id": 7 } } }));

    let message = client
        .post(format!("{base}/api/messages"))
        .json(&json!({ "type": "message", "text": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(message.status(), 200);
    assert!(message.text().await.unwrap().is_empty());

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_custom_messages_path() {
    let (base, shutdown, handle) = start("/bot").await;
    let client = reqwest::Client::new();

    let moved = client
        .post(format!("{base}/api/messages"))
        .json(&json!({ "type": "message" }))
        .send()
        .await
        .unwrap();
    assert_eq!(moved.status(), 404);

    let ok = client
        .post(format!("{base}/bot"))
        .json(&json!({ "type": "message" }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);

    let ready = client.get(format!("{base}/ready")).send().await.unwrap();
    assert_eq!(ready.status(), 200);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
