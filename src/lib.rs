//! Rusty Chat - a real-time broadcast chat relay over WebSocket
//!
//! Clients announce a username, exchange short messages, and see
//! join/leave notices and a live roster. All state is in memory.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod storage;

// Re-export main components
pub use config::*;
pub use constants::*;
