//! Chat server that couples relay state with live client senders

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use tokio::sync::mpsc;
use warp::ws::Message as WsMessage;

use crate::core::connection::ConnectionId;
use crate::core::message_types::{ClientEvent, ServerEvent};
use crate::core::relay::{ChatState, Effect, Event, Outcome};
use crate::error::Result;

// Represents a client connection with its associated sender channel
pub struct Client {
    pub id: ConnectionId,
    pub sender: mpsc::UnboundedSender<WsMessage>,
}

/// Owns the relay state and the outbound channel of every open connection.
///
/// All events go through one `&mut self` call, so each one is applied and
/// its effects queued before the next one starts.
pub struct ChatServer {
    state: ChatState,
    clients: HashMap<ConnectionId, Client>,
}

impl Default for ChatServer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatServer {
    pub fn new() -> Self {
        Self::with_state(ChatState::new())
    }

    pub fn with_state(state: ChatState) -> Self {
        Self {
            state,
            clients: HashMap::new(),
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Register a new client connection and replay history to it
    pub fn register(
        &mut self,
        id: ConnectionId,
        sender: mpsc::UnboundedSender<WsMessage>,
    ) -> Result<Outcome> {
        self.clients.insert(
            id.clone(),
            Client {
                id: id.clone(),
                sender,
            },
        );

        match self.apply(Event::Connect(id.clone())) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.discard(&id);
                Err(e)
            }
        }
    }

    // Drop a connection that never finished registering; no one is notified
    fn discard(&mut self, id: &str) {
        self.clients.remove(id);
        let dispatch = self.state.handle(Event::Disconnect(id.to_string()));
        debug!("Discarded client {}: {:?}", id, dispatch.outcome);
    }

    /// Apply a decoded frame from a connected client
    pub fn handle_client_event(&mut self, id: &str, event: ClientEvent) -> Result<Outcome> {
        self.apply(Event::from_client(id.to_string(), event))
    }

    /// Remove a client connection after the transport closed
    pub fn unregister(&mut self, id: &str) -> Result<Outcome> {
        self.clients.remove(id);
        self.apply(Event::Disconnect(id.to_string()))
    }

    /// Apply an event and deliver its effects in order
    pub fn apply(&mut self, event: Event) -> Result<Outcome> {
        let connection_id = event.connection_id().to_string();
        let dispatch = self.state.handle(event);

        if !dispatch.outcome.is_applied() {
            debug!(
                "Ignored event from {}: {:?}",
                connection_id, dispatch.outcome
            );
        }

        for effect in dispatch.effects {
            match effect {
                Effect::Broadcast(event) => {
                    let delivered = self.broadcast(&event)?;
                    debug!("Broadcast {} to {} clients", event_name(&event), delivered);
                }
                Effect::Unicast(target, event) => {
                    self.send_to(&target, &event)?;
                }
            }
        }

        Ok(dispatch.outcome)
    }

    // Broadcast an event to all connected clients
    fn broadcast(&self, event: &ServerEvent) -> Result<usize> {
        let ws_message = WsMessage::text(event.to_json()?);

        let mut success_count = 0;
        for (id, client) in &self.clients {
            if client.sender.send(ws_message.clone()).is_ok() {
                success_count += 1;
            } else {
                warn!("Failed to queue {} for client {}", event_name(event), id);
            }
        }

        Ok(success_count)
    }

    fn send_to(&self, id: &str, event: &ServerEvent) -> Result<bool> {
        let Some(client) = self.clients.get(id) else {
            warn!("No open channel for client {}", id);
            return Ok(false);
        };

        let sent = client.sender.send(WsMessage::text(event.to_json()?)).is_ok();
        if !sent {
            warn!("Failed to queue {} for client {}", event_name(event), client.id);
        }
        Ok(sent)
    }

    // Get current clients count
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

fn event_name(event: &ServerEvent) -> &'static str {
    match event {
        ServerEvent::InitialMessages(_) => "initialMessages",
        ServerEvent::Message(_) => "message",
        ServerEvent::UserList(_) => "userList",
        ServerEvent::DeleteMessage(_) => "deleteMessage",
    }
}

// Thread-safe chat server wrapper
pub type SharedChatServer = Arc<Mutex<ChatServer>>;

// Create a new thread-safe chat server
pub fn create_chat_server() -> SharedChatServer {
    info!("Creating chat server");
    Arc::new(Mutex::new(ChatServer::new()))
}

/// Lock the shared server, mapping poisoning to a crate error
pub fn lock_server(server: &SharedChatServer) -> Result<MutexGuard<'_, ChatServer>> {
    Ok(server.lock()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn drain(rx: &mut mpsc::UnboundedReceiver<WsMessage>) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            let text = msg.to_str().expect("text frame");
            frames.push(serde_json::from_str(text).expect("json frame"));
        }
        frames
    }

    #[test]
    fn test_register_sends_history_only_to_new_client() {
        let mut server = ChatServer::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        server.register("c1".to_string(), tx1).unwrap();
        assert_eq!(drain(&mut rx1).len(), 1);

        server.register("c2".to_string(), tx2).unwrap();
        assert!(drain(&mut rx1).is_empty());

        let frames = drain(&mut rx2);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "initialMessages");
        assert_eq!(server.client_count(), 2);
    }

    #[test]
    fn test_broadcast_reaches_anonymous_clients() {
        let mut server = ChatServer::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        server.register("c1".to_string(), tx1).unwrap();
        server.register("c2".to_string(), tx2).unwrap();
        drain(&mut rx1);
        drain(&mut rx2);

        let outcome = server
            .handle_client_event("c1", ClientEvent::Join("alice".to_string()))
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);

        for rx in [&mut rx1, &mut rx2] {
            let frames = drain(rx);
            assert_eq!(frames.len(), 2);
            assert_eq!(frames[0]["event"], "message");
            assert_eq!(frames[0]["data"]["text"], "alice joined the chat");
            assert_eq!(frames[1]["event"], "userList");
            assert_eq!(frames[1]["data"], serde_json::json!(["alice"]));
        }
    }

    #[test]
    fn test_unregister_notifies_remaining_clients() {
        let mut server = ChatServer::new();
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        server.register("c1".to_string(), tx1).unwrap();
        server.register("c2".to_string(), tx2).unwrap();
        server
            .handle_client_event("c1", ClientEvent::Join("alice".to_string()))
            .unwrap();
        drain(&mut rx2);
        drop(rx1);

        server.unregister("c1").unwrap();
        let frames = drain(&mut rx2);
        assert_eq!(frames[0]["data"]["text"], "alice disconnected");
        assert_eq!(frames[1]["data"], serde_json::json!([]));
        assert_eq!(server.client_count(), 1);
    }

    #[test]
    fn test_closed_receiver_does_not_fail_broadcast() {
        let mut server = ChatServer::new();
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        server.register("c1".to_string(), tx1).unwrap();
        server.register("c2".to_string(), tx2).unwrap();
        drop(rx1);

        let outcome = server
            .handle_client_event("c2", ClientEvent::Join("bob".to_string()))
            .unwrap();
        assert!(outcome.is_applied());
    }

    #[test]
    fn test_discard_forgets_half_registered_client() {
        let mut server = ChatServer::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        server.register("c1".to_string(), tx1).unwrap();
        server.register("c2".to_string(), tx2).unwrap();
        drain(&mut rx1);

        server.discard("c2");
        assert_eq!(server.client_count(), 1);
        assert_eq!(server.state().connection_count(), 1);
        assert!(server.state().connection("c2").is_none());
        assert!(drain(&mut rx1).is_empty());

        // The id can be registered again afterwards
        let (tx3, mut rx3) = mpsc::unbounded_channel();
        assert!(server.register("c2".to_string(), tx3).unwrap().is_applied());
        assert_eq!(drain(&mut rx3)[0]["event"], "initialMessages");
    }

    #[test]
    fn test_lock_server() {
        let shared = create_chat_server();
        let guard = lock_server(&shared).unwrap();
        assert_eq!(guard.client_count(), 0);
    }
}
