use log::{error, info, warn};

use rusty_chat::config::ServerConfig;
use rusty_chat::core::server::create_chat_server;
use rusty_chat::handlers::serve;

#[tokio::main]
async fn main() {
    // Initialize env
    let dotenv_result = dotenvy::dotenv();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match dotenv_result {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("No .env file loaded: {}", e),
    }

    // Load config from the environment
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, static_dir={}",
        config.host,
        config.port,
        config.static_dir.display()
    );

    let server = create_chat_server();

    let (addr, running) = match serve(server, &config) {
        Ok(bound) => bound,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Server running on {}", addr);
    running.await;
}
