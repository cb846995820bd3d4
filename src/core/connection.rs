//! Per-connection lifecycle
//! Tracks whether a connection is anonymous, named or finished

use std::time::{Duration, Instant};
use uuid::Uuid;

/// Opaque identity of one transport connection
pub type ConnectionId = String;

/// Generate a fresh connection identity
pub fn new_connection_id() -> ConnectionId {
    Uuid::new_v4().to_string()
}

/// Lifecycle state of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, no username announced yet
    Anonymous,
    /// Username bound for the remainder of the connection
    Named(String),
    /// Left or disconnected; accepts no further events
    Terminated,
}

/// State of a single client connection
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub state: ConnectionState,
    pub connected_at: Instant,
}

impl Connection {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            state: ConnectionState::Anonymous,
            connected_at: Instant::now(),
        }
    }

    /// Bound username, if the connection is currently named
    pub fn username(&self) -> Option<&str> {
        match &self.state {
            ConnectionState::Named(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ConnectionState::Terminated
    }

    /// Anonymous -> Named. Returns false if the connection was not anonymous.
    pub fn bind(&mut self, username: String) -> bool {
        if self.state != ConnectionState::Anonymous {
            return false;
        }
        self.state = ConnectionState::Named(username);
        true
    }

    /// Move to Terminated, handing back the username that was bound
    pub fn terminate(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.state, ConnectionState::Terminated) {
            ConnectionState::Named(name) => Some(name),
            _ => None,
        }
    }

    /// How long this connection has been open
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
