//! # Parley Test
//!
//! Test utilities for Parley bots. Nothing here opens a socket.
//!
//! - [`RecordingClient`]: a conversation client that records sent activities
//!   and returns scripted results
//! - [`TestAdapter`]: runs turns against any [`TurnProcessor`], either directly
//!   or through the messages endpoint's request handling
//! - [`TestResponse`]: buffered endpoint response with assertion helpers
//!
//! ## Example
//!
//! ```ignore
//! use parley_test::{RecordingClient, TestAdapter};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn replies_to_greeting() {
//!     let client = RecordingClient::new();
//!     let app = BotApplication::builder()
//!         .client(client.clone())
//!         .routes(|r| r.on_message(|ctx, cancel| async move {
//!             ctx.send_text("hello", cancel).await?;
//!             Ok(())
//!         }))
//!         .build();
//!
//!     let adapter = TestAdapter::new(Arc::new(app));
//!     adapter
//!         .post(&json!({"type": "message", "text": "hi"}))
//!         .await
//!         .unwrap()
//!         .assert_status_code(200);
//!
//!     assert_eq!(client.texts(), vec!["hello"]);
//! }
//! ```
//!
//! [`TurnProcessor`]: parley_server::TurnProcessor

#![doc(html_root_url = "https://docs.rs/parley-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod adapter;
mod error;
mod recording;
mod response;

pub use adapter::TestAdapter;
pub use error::TestError;
pub use recording::RecordingClient;
pub use response::TestResponse;
