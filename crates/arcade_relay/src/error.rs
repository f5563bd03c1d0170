//! Error types for the relay.
//!
//! None of these ever cross the host boundary: the entrypoint layer turns
//! every `RelayError` into a log line.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Malformed message: {0}")]
    MalformedMessage(#[source] serde_json::Error),

    #[error("Event encoding error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Text contains an interior NUL byte: {0:?}")]
    InvalidText(String),

    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Handler panicked: {0}")]
    Panic(String),
}

impl RelayError {
    /// Builds a `Panic` error from a `catch_unwind` payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        RelayError::Panic(message)
    }
}
