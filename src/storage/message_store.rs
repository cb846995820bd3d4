//! In-memory message log
//!
//! Holds every chat message sent and not yet deleted, in send order, and owns
//! the id counter shared by chat and system messages. Nothing is persisted.

use crate::core::message::{now_timestamp, ChatMessage, MessageId};

/// Source of formatted timestamps for new messages
pub type Clock = fn() -> String;

/// Result of a delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteResult {
    Deleted(ChatMessage),
    /// No message with that id
    NotFound,
    /// The message exists but belongs to someone else
    NotAuthor,
}

/// Ordered, unbounded message log
pub struct MessageLog {
    messages: Vec<ChatMessage>,
    next_id: MessageId,
    clock: Clock,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageLog {
    /// Create an empty log stamping messages with the local time
    pub fn new() -> Self {
        Self::with_clock(now_timestamp)
    }

    /// Create an empty log with a custom timestamp source
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            messages: Vec::new(),
            next_id: 0,
            clock,
        }
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Store a new chat message and return it for broadcasting
    pub fn append(&mut self, author: String, text: String) -> ChatMessage {
        let id = self.allocate_id();
        let message = ChatMessage::new(id, author, text, (self.clock)());
        self.messages.push(message.clone());
        message
    }

    /// Create a system notice. It takes an id but is not kept in the log.
    pub fn system_message(&mut self, text: String) -> ChatMessage {
        let id = self.allocate_id();
        ChatMessage::system(id, text, (self.clock)())
    }

    /// Remove a message if `requester` is its author
    pub fn delete_by_id(&mut self, id: MessageId, requester: Option<&str>) -> DeleteResult {
        let Some(index) = self.messages.iter().position(|m| m.id == id) else {
            return DeleteResult::NotFound;
        };

        if requester != Some(self.messages[index].author.as_str()) {
            return DeleteResult::NotAuthor;
        }

        DeleteResult::Deleted(self.messages.remove(index))
    }

    /// Full copy of the log, oldest first
    pub fn snapshot_all(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Get the number of stored messages
    pub fn count(&self) -> usize {
        self.messages.len()
    }

    /// Id the next message will receive
    pub fn peek_next_id(&self) -> MessageId {
        self.next_id
    }
}
