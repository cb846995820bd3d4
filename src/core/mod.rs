//! Core functionality for the chat relay

pub mod connection;
pub mod message;
pub mod message_types;
pub mod relay;
pub mod server;
pub mod session;

// Re-export main components for convenience
pub use connection::{Connection, ConnectionId, ConnectionState};
pub use message::{ChatMessage, MessageId};
pub use message_types::{ClientEvent, ServerEvent};
pub use relay::{ChatState, Dispatch, Effect, Event, Outcome};
pub use server::{create_chat_server, ChatServer, SharedChatServer};
pub use session::{SessionRegistry, User};
