use lwes_config::ConfigError;
use lwes_listener::ListenerError;
use lwes_protocol::DecodeError;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Invalid hex input: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Listener task failed: {0}")]
    Task(#[from] JoinError),
}
