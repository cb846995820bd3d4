//! HTTP surface: WebSocket upgrade, health check and static client assets

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use warp::{Filter, Rejection, Reply};

use crate::config::ServerConfig;
use crate::constants::{HEALTH_PATH, WS_PATH};
use crate::core::server::SharedChatServer;
use crate::error::{ChatError, Result};
use crate::handlers::websocket::{handle_ws_client, Liveness};

/// All routes served by the relay
pub fn routes(
    server: SharedChatServer,
    config: &ServerConfig,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let liveness = Liveness::from(config);

    // Create WebSocket route
    let ws_route = warp::path(WS_PATH)
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_server(server))
        .map(move |ws: warp::ws::Ws, server: SharedChatServer| {
            ws.on_upgrade(move |socket| handle_ws_client(socket, server, liveness))
        });

    // Create health check route
    let health_route = warp::path(HEALTH_PATH).and(warp::path::end()).map(|| "OK");

    // Pre-built client bundle
    let static_route = warp::get().and(warp::fs::dir(config.static_dir.clone()));

    let cors = if config.cors_origin == "*" {
        warp::cors().allow_any_origin()
    } else {
        warp::cors().allow_origin(config.cors_origin.as_str())
    }
    .allow_methods(vec!["GET", "POST"]);

    ws_route
        .or(health_route)
        .or(static_route)
        .with(cors)
        .with(warp::log("rusty_chat::http"))
}

/// Bind the routes to the configured address.
///
/// Returns the bound address (useful with port 0) and the server future.
pub fn serve(
    server: SharedChatServer,
    config: &ServerConfig,
) -> Result<(SocketAddr, impl Future<Output = ()> + 'static)> {
    let addr: SocketAddr = config.bind_addr().parse().map_err(|e| {
        ChatError::ConfigError(format!(
            "invalid listen address {}: {}",
            config.bind_addr(),
            e
        ))
    })?;

    warp::serve(routes(server, config))
        .try_bind_ephemeral(addr)
        .map_err(|e| ChatError::BindError(format!("{}: {}", addr, e)))
}

// Helper function to include server state in request
fn with_server(
    server: SharedChatServer,
) -> impl Filter<Extract = (SharedChatServer,), Error = Infallible> + Clone {
    warp::any().map(move || server.clone())
}
