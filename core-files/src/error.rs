use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilesError {
    /// Request or channel failure. Surfaced to the caller, never retried here.
    #[error("Transport error during {operation}: {message}")]
    Transport { operation: String, message: String },

    /// A payload that is not the JSON shape the server is expected to send.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Change stream already connected for this session")]
    AlreadyConnected,
}

impl FilesError {
    pub fn transport(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        FilesError::Transport {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(message: impl fmt::Display) -> Self {
        FilesError::Decode(message.to_string())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, FilesError::Transport { .. })
    }
}

pub type Result<T> = std::result::Result<T, FilesError>;
