//! In-memory storage for chat history

pub mod message_store;

// Re-export the message log
pub use message_store::{DeleteResult, MessageLog};
