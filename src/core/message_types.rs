//! Wire events exchanged over the WebSocket
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::core::message::{ChatMessage, MessageId};

/// Client-to-server events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Announce a username for this connection
    #[serde(rename = "join")]
    Join(String),

    /// Explicit departure
    #[serde(rename = "leave")]
    Leave(String),

    /// New chat line from the bound username
    #[serde(rename = "chatMessage")]
    ChatMessage(String),

    /// Delete one of the sender's own messages
    #[serde(rename = "deleteMessage")]
    DeleteMessage(MessageId),
}

/// Server-to-client events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// History replay, sent once right after connecting
    #[serde(rename = "initialMessages")]
    InitialMessages(Vec<ChatMessage>),

    /// A new chat or system message
    #[serde(rename = "message")]
    Message(ChatMessage),

    /// Current roster, in join order
    #[serde(rename = "userList")]
    UserList(Vec<String>),

    /// A message was removed from the log
    #[serde(rename = "deleteMessage")]
    DeleteMessage(MessageId),
}

impl ClientEvent {
    /// Parse a text frame into an event
    pub fn from_json(text: &str) -> crate::error::Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| crate::error::ChatError::MessageParseError(e.to_string()))
    }
}

impl ServerEvent {
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
