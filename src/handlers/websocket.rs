use std::time::Duration;

use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, MissedTickBehavior};
use warp::ws::{Message, WebSocket};

use crate::config::ServerConfig;
use crate::core::connection::new_connection_id;
use crate::core::message_types::ClientEvent;
use crate::core::server::{lock_server, SharedChatServer};

/// Keepalive settings applied to every connection
#[derive(Debug, Clone, Copy)]
pub struct Liveness {
    pub ping_interval: Duration,
    pub idle_timeout: Duration,
}

impl From<&ServerConfig> for Liveness {
    fn from(config: &ServerConfig) -> Self {
        Self {
            ping_interval: config.ping_interval,
            idle_timeout: config.connection_timeout,
        }
    }
}

// Handle a WebSocket connection
pub async fn handle_ws_client(ws: WebSocket, server: SharedChatServer, liveness: Liveness) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Generate a unique client ID
    let client_id = new_connection_id();

    // Forward queued frames to the socket and keep the peer alive with pings
    let writer_id = client_id.clone();
    tokio::task::spawn(async move {
        let mut ticker = interval(liveness.ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                queued = rx.recv() => match queued {
                    Some(message) => {
                        if let Err(e) = ws_tx.send(message).await {
                            error!("Failed to send WebSocket message to {}: {}", writer_id, e);
                            break;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if let Err(e) = ws_tx.send(Message::ping(Vec::new())).await {
                        debug!("Ping to {} failed: {}", writer_id, e);
                        break;
                    }
                }
            }
        }

        let _ = ws_tx.close().await;
    });

    // Register the client; this also replays history to it
    match lock_server(&server) {
        Ok(mut guard) => {
            if let Err(e) = guard.register(client_id.clone(), tx) {
                error!("Failed to register client {}: {}", client_id, e);
                return;
            }
            info!("Client connected: {}", client_id);
            info!("Current connections: {}", guard.client_count());
        }
        Err(e) => {
            error!("Failed to acquire server lock for registration: {}", e);
            return;
        }
    }

    // Handle incoming messages until the peer goes away or falls silent
    loop {
        match timeout(liveness.idle_timeout, ws_rx.next()).await {
            Ok(Some(Ok(msg))) => {
                if msg.is_close() {
                    debug!("Client {} sent close frame", client_id);
                    break;
                }
                // Only process text messages; pongs just refresh the timeout
                if msg.is_text() {
                    process_message(msg, &client_id, &server);
                }
            }
            Ok(Some(Err(e))) => {
                warn!("WebSocket error for {}: {}", client_id, e);
                break;
            }
            Ok(None) => break,
            Err(_) => {
                info!(
                    "Client {} silent for {}s, dropping",
                    client_id,
                    liveness.idle_timeout.as_secs()
                );
                break;
            }
        }
    }

    // Client disconnected
    match lock_server(&server) {
        Ok(mut guard) => match guard.unregister(&client_id) {
            Ok(_) => {
                info!("Client disconnected: {}", client_id);
                info!("Current connections: {}", guard.client_count());
            }
            Err(e) => error!("Error unregistering client {}: {}", client_id, e),
        },
        Err(e) => {
            error!("Failed to acquire server lock for unregistration: {}", e);
        }
    }
}

// Process an incoming WebSocket text frame
fn process_message(msg: Message, client_id: &str, server: &SharedChatServer) {
    let Ok(text) = msg.to_str() else {
        warn!("Failed to extract text from message sent by {}", client_id);
        return;
    };

    let event = match ClientEvent::from_json(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("Ignoring frame from {}: {}", client_id, e);
            return;
        }
    };

    match lock_server(server) {
        Ok(mut guard) => {
            if let Err(e) = guard.handle_client_event(client_id, event) {
                error!("Failed to handle event from {}: {}", client_id, e);
            }
        }
        Err(e) => {
            error!("Failed to acquire server lock for message processing: {}", e);
        }
    }
}
