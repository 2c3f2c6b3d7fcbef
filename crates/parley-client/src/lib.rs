//! # Parley Client
//!
//! Sends activities back to the conversation service that delivered the
//! turn. [`HttpConversationClient`] implements
//! [`ConversationClient`](parley_core::ConversationClient) over `reqwest`.
//!
//! Token acquisition is out of scope: a static bearer token can be supplied,
//! otherwise requests go out unauthenticated.
//!
//! ```ignore
//! use parley_client::HttpConversationClient;
//!
//! let client = HttpConversationClient::builder()
//!     .bearer_token(std::env::var("BOT_TOKEN")?)
//!     .timeout(std::time::Duration::from_secs(10))
//!     .build()?;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod rest;

pub use rest::{activities_url, HttpConversationClient, HttpConversationClientBuilder};
