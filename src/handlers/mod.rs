//! Request handlers for different server endpoints

pub mod routes;
pub mod websocket;

// Re-export the handlers
pub use routes::{routes, serve};
pub use websocket::{handle_ws_client, Liveness};
