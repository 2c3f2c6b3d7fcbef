//! # Parley Core
//!
//! Core types for the Parley bot framework.
//!
//! - [`Activity`] - The Bot Framework activity envelope
//! - [`TypedActivity`] - An activity whose value was narrowed into a Rust type
//! - [`InvokeResponse`] - Synchronous answer to an invoke activity
//! - [`TurnContext`] - Per-turn context with reply helpers and extensions
//! - [`ConversationClient`] - Capability for sending activities
//! - [`BotError`] - Standard error type

#![doc(html_root_url = "https://docs.rs/parley-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod activity;
mod client;
mod context;
mod error;
pub mod fixtures;
mod invoke;
mod typed;

pub use activity::{Activity, ActivityType, ChannelAccount, ConversationAccount, InvokeName};
pub use client::{ConversationClient, ResourceResponse};
pub use context::{BotHandle, Extensions, TurnContext, TurnId};
pub use error::{BotError, BotResult, ErrorCategory, ErrorDetail, ErrorEnvelope};
pub use invoke::InvokeResponse;
pub use typed::TypedActivity;

pub use tokio_util::sync::CancellationToken;
