//! Session registry: the ordered roster of named connections

use crate::core::connection::{Connection, ConnectionId};

/// A connection that has announced a username
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub connection_id: ConnectionId,
    pub username: String,
}

/// Ordered collection of connected users.
///
/// Usernames are not unique. Removal is keyed on the username and takes the
/// first entry in join order, so with two "bob"s the earliest one goes first
/// regardless of which connection asked.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    users: Vec<User>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self { users: Vec::new() }
    }

    /// Append a user to the roster
    pub fn add(&mut self, connection_id: ConnectionId, username: String) {
        self.users.push(User {
            connection_id,
            username,
        });
    }

    /// Remove the first entry with this username
    pub fn remove(&mut self, username: &str) -> Option<User> {
        let index = self.users.iter().position(|u| u.username == username)?;
        Some(self.users.remove(index))
    }

    /// Remove using the username bound on the connection, if it ever had one
    pub fn remove_by_connection(&mut self, connection: &Connection) -> Option<User> {
        connection
            .username()
            .and_then(|username| self.remove(username))
    }

    /// Usernames in join order, as broadcast in `userList`
    pub fn usernames(&self) -> Vec<String> {
        self.users.iter().map(|u| u.username.clone()).collect()
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.iter().any(|u| u.username == username)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}
