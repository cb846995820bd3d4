use std::error::Error;
use std::fmt;
use std::sync::PoisonError;

#[derive(Debug)]
pub enum ChatError {
    // Server state errors
    StateLock(String),

    // Wire errors
    MessageParseError(String),
    SerializationError(String),

    // Configuration errors
    ConfigError(String),

    // Startup errors
    BindError(String),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateLock(msg) => write!(f, "State lock error: {}", msg),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::BindError(msg) => write!(f, "Failed to bind listener: {}", msg),
        }
    }
}

impl Error for ChatError {}

// Converting from PoisonError to facilitate poisoned mutex handling
impl<T> From<PoisonError<T>> for ChatError {
    fn from(err: PoisonError<T>) -> Self {
        ChatError::StateLock(format!("Mutex poisoned: {}", err))
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::SerializationError(err.to_string())
    }
}

// Generic result type for the chat relay
pub type Result<T> = std::result::Result<T, ChatError>;
