//! Client error types.

use tdfs_net::NetError;
use tdfs_types::Status;

/// Errors that can occur during client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A network-level error (connection, framing, transport).
    #[error("network error: {0}")]
    Net(#[from] NetError),

    /// A service returned a non-OK status.
    #[error("status error: {0}")]
    Status(#[from] Status),

    /// An internal / unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Return the service status code if this error carries one.
    pub fn status_code(&self) -> Option<tdfs_types::status_code::status_code_t> {
        match self {
            ClientError::Status(s) => Some(s.code()),
            _ => None,
        }
    }
}

/// Convenience result type.
pub type ClientResult<T> = std::result::Result<T, ClientError>;
