//! Event dispatcher for the chat relay
//!
//! `ChatState` owns the session registry, the message log and the lifecycle
//! of every open connection. Each incoming [`Event`] is applied to completion
//! and yields the ordered list of [`Effect`]s the transport must deliver.
//! Nothing here touches a socket, so the whole relay can be driven from tests.

use std::collections::HashMap;

use log::debug;

use crate::core::connection::{Connection, ConnectionId};
use crate::core::message::MessageId;
use crate::core::message_types::{ClientEvent, ServerEvent};
use crate::core::session::SessionRegistry;
use crate::storage::message_store::{Clock, DeleteResult, MessageLog};

/// Everything that can happen to the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect(ConnectionId),
    Join(ConnectionId, String),
    Leave(ConnectionId, String),
    Chat(ConnectionId, String),
    Delete(ConnectionId, MessageId),
    Disconnect(ConnectionId),
}

impl Event {
    /// Wrap a decoded client frame with the connection it arrived on
    pub fn from_client(connection_id: ConnectionId, event: ClientEvent) -> Self {
        match event {
            ClientEvent::Join(username) => Event::Join(connection_id, username),
            ClientEvent::Leave(username) => Event::Leave(connection_id, username),
            ClientEvent::ChatMessage(text) => Event::Chat(connection_id, text),
            ClientEvent::DeleteMessage(id) => Event::Delete(connection_id, id),
        }
    }

    pub fn connection_id(&self) -> &str {
        match self {
            Event::Connect(id)
            | Event::Join(id, _)
            | Event::Leave(id, _)
            | Event::Chat(id, _)
            | Event::Delete(id, _)
            | Event::Disconnect(id) => id,
        }
    }
}

/// Outbound delivery produced by an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send to every open connection
    Broadcast(ServerEvent),
    /// Send to one connection only
    Unicast(ConnectionId, ServerEvent),
}

/// What became of an event. Ignored outcomes are never reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Nothing matched (unknown message id, username not in the roster)
    IgnoredNoMatch,
    /// The requester does not own the target
    IgnoredUnauthorized,
    /// The connection is unknown or in the wrong state for this event
    IgnoredInvalidState,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}

/// Outcome plus effects, in delivery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub outcome: Outcome,
    pub effects: Vec<Effect>,
}

impl Dispatch {
    fn applied(effects: Vec<Effect>) -> Self {
        Self {
            outcome: Outcome::Applied,
            effects,
        }
    }

    fn ignored(outcome: Outcome) -> Self {
        Self {
            outcome,
            effects: Vec::new(),
        }
    }
}

/// Shared relay state: roster, history and connection lifecycles
#[derive(Default)]
pub struct ChatState {
    registry: SessionRegistry,
    log: MessageLog,
    connections: HashMap<ConnectionId, Connection>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State whose messages are stamped by `clock`
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            registry: SessionRegistry::new(),
            log: MessageLog::with_clock(clock),
            connections: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Apply one event to completion
    pub fn handle(&mut self, event: Event) -> Dispatch {
        match event {
            Event::Connect(id) => self.connect(id),
            Event::Join(id, username) => self.join(&id, username),
            Event::Leave(id, username) => self.leave(&id, &username),
            Event::Chat(id, text) => self.chat(&id, text),
            Event::Delete(id, message_id) => self.delete(&id, message_id),
            Event::Disconnect(id) => self.disconnect(&id),
        }
    }

    fn connect(&mut self, id: ConnectionId) -> Dispatch {
        if self.connections.contains_key(&id) {
            return Dispatch::ignored(Outcome::IgnoredInvalidState);
        }
        self.connections.insert(id.clone(), Connection::new(id.clone()));

        let history = ServerEvent::InitialMessages(self.log.snapshot_all());
        Dispatch::applied(vec![Effect::Unicast(id, history)])
    }

    fn join(&mut self, id: &str, username: String) -> Dispatch {
        let Some(connection) = self.connections.get_mut(id) else {
            return Dispatch::ignored(Outcome::IgnoredInvalidState);
        };
        if !connection.bind(username.clone()) {
            return Dispatch::ignored(Outcome::IgnoredInvalidState);
        }

        let notice = format!("{} joined the chat", username);
        self.registry.add(id.to_string(), username);
        self.roster_change(notice)
    }

    fn leave(&mut self, id: &str, requested: &str) -> Dispatch {
        let Some(connection) = self.connections.get_mut(id) else {
            return Dispatch::ignored(Outcome::IgnoredInvalidState);
        };
        if connection.username().is_none() {
            return Dispatch::ignored(Outcome::IgnoredInvalidState);
        }
        let Some(username) = connection.terminate() else {
            return Dispatch::ignored(Outcome::IgnoredInvalidState);
        };
        if username != requested {
            debug!(
                "Connection {} asked to leave as {:?} but is bound to {:?}",
                id, requested, username
            );
        }

        if self.registry.remove(&username).is_none() {
            return Dispatch::ignored(Outcome::IgnoredNoMatch);
        }
        self.roster_change(format!("{} left the chat", username))
    }

    fn chat(&mut self, id: &str, text: String) -> Dispatch {
        let Some(author) = self
            .connections
            .get(id)
            .and_then(|c| c.username())
            .map(str::to_string)
        else {
            return Dispatch::ignored(Outcome::IgnoredInvalidState);
        };

        let message = self.log.append(author, text);
        Dispatch::applied(vec![Effect::Broadcast(ServerEvent::Message(message))])
    }

    fn delete(&mut self, id: &str, message_id: MessageId) -> Dispatch {
        let requester = match self.connections.get(id) {
            Some(connection) if !connection.is_terminated() => connection.username(),
            _ => return Dispatch::ignored(Outcome::IgnoredInvalidState),
        };

        match self.log.delete_by_id(message_id, requester) {
            DeleteResult::Deleted(_) => Dispatch::applied(vec![Effect::Broadcast(
                ServerEvent::DeleteMessage(message_id),
            )]),
            DeleteResult::NotFound => Dispatch::ignored(Outcome::IgnoredNoMatch),
            DeleteResult::NotAuthor => Dispatch::ignored(Outcome::IgnoredUnauthorized),
        }
    }

    fn disconnect(&mut self, id: &str) -> Dispatch {
        let Some(connection) = self.connections.remove(id) else {
            return Dispatch::ignored(Outcome::IgnoredInvalidState);
        };
        debug!(
            "Connection {} closed after {:?}",
            id,
            connection.connection_duration()
        );

        // Anonymous or already-left connections only need forgetting
        let Some(username) = connection.username() else {
            return Dispatch::applied(Vec::new());
        };
        let notice = format!("{} disconnected", username);

        if self.registry.remove_by_connection(&connection).is_none() {
            return Dispatch::ignored(Outcome::IgnoredNoMatch);
        }
        self.roster_change(notice)
    }

    /// System notice followed by the refreshed roster
    fn roster_change(&mut self, notice: String) -> Dispatch {
        let message = self.log.system_message(notice);
        Dispatch::applied(vec![
            Effect::Broadcast(ServerEvent::Message(message)),
            Effect::Broadcast(ServerEvent::UserList(self.registry.usernames())),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> String {
        "1:02:03 PM".to_string()
    }

    fn state_with(ids: &[&str]) -> ChatState {
        let mut state = ChatState::with_clock(clock);
        for id in ids {
            state.handle(Event::Connect(id.to_string()));
        }
        state
    }

    #[test]
    fn test_connect_unicasts_history() {
        let mut state = ChatState::with_clock(clock);
        let dispatch = state.handle(Event::Connect("c1".to_string()));
        assert_eq!(
            dispatch.effects,
            vec![Effect::Unicast("c1".to_string(), ServerEvent::InitialMessages(vec![]))]
        );
        assert_eq!(state.connection_count(), 1);
    }

    #[test]
    fn test_duplicate_connect_ignored() {
        let mut state = state_with(&["c1"]);
        let dispatch = state.handle(Event::Connect("c1".to_string()));
        assert_eq!(dispatch.outcome, Outcome::IgnoredInvalidState);
        assert!(dispatch.effects.is_empty());
    }

    #[test]
    fn test_join_broadcasts_notice_then_roster() {
        let mut state = state_with(&["c1"]);
        let dispatch = state.handle(Event::Join("c1".to_string(), "alice".to_string()));
        assert!(dispatch.outcome.is_applied());
        assert_eq!(dispatch.effects.len(), 2);

        match &dispatch.effects[0] {
            Effect::Broadcast(ServerEvent::Message(msg)) => {
                assert!(msg.is_system());
                assert_eq!(msg.text, "alice joined the chat");
                assert_eq!(msg.timestamp, "1:02:03 PM");
            }
            other => panic!("unexpected effect {:?}", other),
        }
        assert_eq!(
            dispatch.effects[1],
            Effect::Broadcast(ServerEvent::UserList(vec!["alice".to_string()]))
        );
    }

    #[test]
    fn test_second_join_ignored() {
        let mut state = state_with(&["c1"]);
        state.handle(Event::Join("c1".to_string(), "alice".to_string()));
        let dispatch = state.handle(Event::Join("c1".to_string(), "alicia".to_string()));
        assert_eq!(dispatch.outcome, Outcome::IgnoredInvalidState);
        assert_eq!(state.registry().usernames(), vec!["alice"]);
    }

    #[test]
    fn test_anonymous_chat_ignored() {
        let mut state = state_with(&["c1"]);
        let dispatch = state.handle(Event::Chat("c1".to_string(), "hello?".to_string()));
        assert_eq!(dispatch.outcome, Outcome::IgnoredInvalidState);
        assert_eq!(state.log().count(), 0);
    }

    #[test]
    fn test_leave_uses_bound_name_and_terminates() {
        let mut state = state_with(&["c1"]);
        state.handle(Event::Join("c1".to_string(), "alice".to_string()));

        let dispatch = state.handle(Event::Leave("c1".to_string(), "someone-else".to_string()));
        assert!(dispatch.outcome.is_applied());
        assert!(state.registry().usernames().is_empty());
        assert!(state.connection("c1").map(|c| c.is_terminated()).unwrap_or(false));

        // No further mutation from a terminated connection
        let chat = state.handle(Event::Chat("c1".to_string(), "ghost".to_string()));
        assert_eq!(chat.outcome, Outcome::IgnoredInvalidState);
        let gone = state.handle(Event::Disconnect("c1".to_string()));
        assert!(gone.effects.is_empty());
        assert_eq!(state.connection_count(), 0);
    }

    #[test]
    fn test_anonymous_leave_and_disconnect_are_silent() {
        let mut state = state_with(&["c1"]);
        let leave = state.handle(Event::Leave("c1".to_string(), "bob".to_string()));
        assert_eq!(leave.outcome, Outcome::IgnoredInvalidState);

        let next_id = state.log().peek_next_id();
        let gone = state.handle(Event::Disconnect("c1".to_string()));
        assert!(gone.outcome.is_applied());
        assert!(gone.effects.is_empty());
        assert_eq!(state.log().peek_next_id(), next_id);
    }

    #[test]
    fn test_disconnect_notice() {
        let mut state = state_with(&["c1", "c2"]);
        state.handle(Event::Join("c1".to_string(), "alice".to_string()));
        state.handle(Event::Join("c2".to_string(), "bob".to_string()));

        let dispatch = state.handle(Event::Disconnect("c1".to_string()));
        match &dispatch.effects[0] {
            Effect::Broadcast(ServerEvent::Message(msg)) => {
                assert_eq!(msg.text, "alice disconnected")
            }
            other => panic!("unexpected effect {:?}", other),
        }
        assert_eq!(
            dispatch.effects[1],
            Effect::Broadcast(ServerEvent::UserList(vec!["bob".to_string()]))
        );
    }

    #[test]
    fn test_unknown_connection_ignored() {
        let mut state = ChatState::with_clock(clock);
        for event in [
            Event::Join("x".to_string(), "a".to_string()),
            Event::Chat("x".to_string(), "a".to_string()),
            Event::Delete("x".to_string(), 0),
            Event::Disconnect("x".to_string()),
        ] {
            assert_eq!(state.handle(event).outcome, Outcome::IgnoredInvalidState);
        }
    }

    #[test]
    fn test_event_from_client() {
        let event = Event::from_client("c9".to_string(), ClientEvent::DeleteMessage(5));
        assert_eq!(event, Event::Delete("c9".to_string(), 5));
        assert_eq!(event.connection_id(), "c9");
    }
}
