//! The inbound/outbound activity envelope.
//!
//! Only the fields the turn pipeline and replies need are modelled as typed
//! fields. Everything else in the payload is kept in [`Activity::extra`] so a
//! deserialize/serialize pass does not drop data.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value not known to this crate, kept verbatim.
            Other(String),
        }

        impl $name {
            /// Returns the wire string for this value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $wire, )+
                    Self::Other(value) => value.as_str(),
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                match value {
                    $( $wire => Self::$variant, )+
                    other => Self::Other(other.to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match Self::from(value.as_str()) {
                    Self::Other(_) => Self::Other(value),
                    known => known,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                String::deserialize(deserializer).map(Self::from)
            }
        }
    };
}

wire_enum! {
    /// The `type` of an activity.
    pub enum ActivityType {
        /// A chat message.
        Message => "message",
        /// The sender is typing.
        Typing => "typing",
        /// A request that expects a synchronous response.
        Invoke => "invoke",
        /// A named, fire-and-forget event.
        Event => "event",
        /// A reaction was added to or removed from a message.
        MessageReaction => "messageReaction",
        /// A message was edited.
        MessageUpdate => "messageUpdate",
        /// A message was deleted.
        MessageDelete => "messageDelete",
        /// Members joined or left, or the conversation changed.
        ConversationUpdate => "conversationUpdate",
        /// The bot was installed or uninstalled.
        InstallationUpdate => "installationUpdate",
        /// The conversation ended.
        EndOfConversation => "endOfConversation",
    }
}

wire_enum! {
    /// Well-known invoke names sent by Teams.
    pub enum InvokeName {
        /// Message extension search.
        MessageExtensionQuery => "composeExtension/query",
        /// Message extension result item selected.
        MessageExtensionSelectItem => "composeExtension/selectItem",
        /// Message extension action submitted.
        MessageExtensionSubmitAction => "composeExtension/submitAction",
        /// Message extension action dialog requested.
        MessageExtensionFetchTask => "composeExtension/fetchTask",
        /// Link unfurling.
        MessageExtensionQueryLink => "composeExtension/queryLink",
        /// Dialog (task module) requested.
        TaskFetch => "task/fetch",
        /// Dialog (task module) submitted.
        TaskSubmit => "task/submit",
        /// Adaptive card `Action.Execute`.
        AdaptiveCardAction => "adaptiveCard/action",
        /// Message action submitted.
        MessageSubmitAction => "message/submitAction",
        /// Configuration page requested.
        ConfigFetch => "config/fetch",
        /// Configuration page submitted.
        ConfigSubmit => "config/submit",
        /// File consent card answered.
        FileConsent => "fileConsent/invoke",
    }
}

/// A user or bot taking part in a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    /// Channel-specific account id.
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Azure AD object id, when the channel provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_object_id: Option<String>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChannelAccount {
    /// Creates an account with just an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// The conversation an activity belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    /// Conversation id.
    pub id: String,
    /// Conversation name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `personal`, `groupChat` or `channel` in Teams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_type: Option<String>,
    /// Teams tenant id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Whether more than two participants are present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversationAccount {
    /// Creates a conversation reference with just an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// A Bot Framework activity.
///
/// # Example
///
/// ```
/// use parley_core::{Activity, ActivityType};
///
/// let activity: Activity = serde_json::from_str(
///     r#"{"type":"message","text":"hi","locale":"en-US","entities":[]}"#,
/// ).unwrap();
///
/// assert_eq!(activity.activity_type, ActivityType::Message);
/// assert_eq!(activity.text.as_deref(), Some("hi"));
/// assert!(activity.extra.contains_key("entities"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Activity type. Required.
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Activity id assigned by the channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Invoke or event name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Opaque payload, interpreted per route by narrowing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Base URL of the conversation service for replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    /// Channel id, `msteams` for Teams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    /// Receiver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    /// Conversation the activity belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    /// Id of the activity this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    /// Message text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Sender locale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Time the activity was sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Channel-specific payload (tenant, team, channel in Teams).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<Value>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Activity {
    /// Creates an empty activity of the given type.
    pub fn new(activity_type: impl Into<ActivityType>) -> Self {
        Self {
            activity_type: activity_type.into(),
            id: None,
            name: None,
            value: None,
            service_url: None,
            channel_id: None,
            from: None,
            recipient: None,
            conversation: None,
            reply_to_id: None,
            text: None,
            locale: None,
            timestamp: None,
            channel_data: None,
            extra: Map::new(),
        }
    }

    /// Creates a message activity with text.
    pub fn message(text: impl Into<String>) -> Self {
        Self::new(ActivityType::Message).with_text(text)
    }

    /// Creates a typing indicator.
    #[must_use]
    pub fn typing() -> Self {
        Self::new(ActivityType::Typing)
    }

    /// Creates an invoke activity.
    pub fn invoke(name: impl Into<String>, value: Value) -> Self {
        Self::new(ActivityType::Invoke)
            .with_name(name)
            .with_value(value)
    }

    /// Creates a named event activity.
    pub fn event(name: impl Into<String>, value: Value) -> Self {
        Self::new(ActivityType::Event)
            .with_name(name)
            .with_value(value)
    }

    /// Sets the activity id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Sets the text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the conversation.
    pub fn with_conversation(mut self, conversation: ConversationAccount) -> Self {
        self.conversation = Some(conversation);
        self
    }

    /// Sets the service URL.
    pub fn with_service_url(mut self, service_url: impl Into<String>) -> Self {
        self.service_url = Some(service_url.into());
        self
    }

    /// Sets the sender.
    pub fn with_from(mut self, from: ChannelAccount) -> Self {
        self.from = Some(from);
        self
    }

    /// Sets the receiver.
    pub fn with_recipient(mut self, recipient: ChannelAccount) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Sets the channel data.
    pub fn with_channel_data(mut self, channel_data: Value) -> Self {
        self.channel_data = Some(channel_data);
        self
    }

    /// Returns `true` for invoke activities.
    #[must_use]
    pub fn is_invoke(&self) -> bool {
        self.activity_type == ActivityType::Invoke
    }

    /// Returns the invoke name, if this is a named invoke.
    #[must_use]
    pub fn invoke_name(&self) -> Option<InvokeName> {
        if !self.is_invoke() {
            return None;
        }
        self.name.as_deref().map(InvokeName::from)
    }

    /// Returns the diagnostic route key: `type` or `type/name`.
    #[must_use]
    pub fn route_key(&self) -> String {
        match &self.name {
            Some(name) => format!("{}/{}", self.activity_type, name),
            None => self.activity_type.to_string(),
        }
    }

    /// Returns the conversation id, if present.
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation.as_ref().map(|c| c.id.as_str())
    }

    /// Returns the Teams tenant id.
    ///
    /// `channelData.tenant.id` wins over `conversation.tenantId`.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.channel_data
            .as_ref()
            .and_then(|data| data.pointer("/tenant/id"))
            .and_then(Value::as_str)
            .or_else(|| {
                self.conversation
                    .as_ref()
                    .and_then(|c| c.tenant_id.as_deref())
            })
    }

    /// Addresses `self` as a reply to `incoming`.
    ///
    /// Copies the conversation, service URL and channel id, swaps sender and
    /// receiver, and sets `replyToId` unless one is already set.
    pub fn apply_reply_reference(&mut self, incoming: &Activity) {
        self.conversation.clone_from(&incoming.conversation);
        self.service_url.clone_from(&incoming.service_url);
        self.channel_id.clone_from(&incoming.channel_id);
        self.from.clone_from(&incoming.recipient);
        self.recipient.clone_from(&incoming.from);
        if self.reply_to_id.is_none() {
            self.reply_to_id.clone_from(&incoming.id);
        }
    }
}
