//! Upload error types.

use crosspost_protocol::ProtocolError;

/// Errors produced while submitting a file or talking to the service.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),
}
