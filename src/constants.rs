// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const WS_PATH: &str = "ws";
pub const HEALTH_PATH: &str = "health";
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_CORS_ORIGIN: &str = "*";

// Connection liveness (seconds)
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 60;

// Author used for server-generated notices
pub const SYSTEM_AUTHOR: &str = "System";
