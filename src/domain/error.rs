//! Error types for exec-on-mcode.

use thiserror::Error;

/// Main error type for host communication and configuration loading.
#[derive(Debug, Error)]
pub enum McodeError {
    /// The host answered with something we did not expect
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The host refused a request
    #[error("{kind}: {message}")]
    Rejected { kind: String, message: String },

    /// The host closed the connection
    #[error("Connection closed by host")]
    ConnectionClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
