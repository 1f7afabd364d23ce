//! Error types for the arscene server.

use thiserror::Error;

use crate::codec::WireFormat;

/// Errors raised while serving clients.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A frame or state blob could not be encoded or decoded.
    #[error("{format} codec error: {message}")]
    Codec {
        format: WireFormat,
        message: String,
    },

    /// The connection to a client failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The runtime refused a request.
    #[error(transparent)]
    Runtime(#[from] arscene_runtime::RuntimeError),

    /// Bad command line or configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn codec(format: WireFormat, message: impl std::fmt::Display) -> Self {
        ServerError::Codec {
            format,
            message: message.to_string(),
        }
    }

    pub fn transport(message: impl std::fmt::Display) -> Self {
        ServerError::Transport(message.to_string())
    }
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
