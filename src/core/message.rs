use chrono::{Local, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::constants::SYSTEM_AUTHOR;

/// Identifier assigned to every message, unique for the process lifetime
pub type MessageId = u64;

/// A chat line as seen by clients.
///
/// Serialized with the field names the browser client expects
/// (`user` and `time`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    #[serde(rename = "user")]
    pub author: String,
    pub text: String,
    #[serde(rename = "time")]
    pub timestamp: String,
}

impl ChatMessage {
    pub fn new(id: MessageId, author: String, text: String, timestamp: String) -> Self {
        Self {
            id,
            author,
            text,
            timestamp,
        }
    }

    /// Server-generated notice (join/leave/disconnect)
    pub fn system(id: MessageId, text: String, timestamp: String) -> Self {
        Self::new(id, SYSTEM_AUTHOR.to_string(), text, timestamp)
    }

    pub fn is_system(&self) -> bool {
        self.author == SYSTEM_AUTHOR
    }
}

/// Render a wall-clock time the way the client displays it, e.g. `3:04:05 PM`
pub fn format_time(time: NaiveTime) -> String {
    time.format("%-I:%M:%S %p").to_string()
}

/// Current local time, formatted for a new message
pub fn now_timestamp() -> String {
    format_time(Local::now().time())
}
