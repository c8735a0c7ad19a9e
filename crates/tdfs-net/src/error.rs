use thiserror::Error;

/// Errors that can occur in the networking layer.
#[derive(Debug, Error)]
pub enum NetError {
    /// The connection was closed by the remote peer.
    #[error("connection closed")]
    ConnectionClosed,

    /// An I/O error from the underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The message checksum did not match the computed CRC32C.
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// The received message is not a valid tdfs message (bad magic number).
    #[error("invalid message: not a tdfs message (checksum low byte: {0:#04x})")]
    InvalidMagic(u8),

    /// The message size exceeds the maximum allowed.
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The message header is incomplete (not enough bytes for the 8-byte
    /// header).
    #[error("incomplete header: need {need} bytes, have {have}")]
    IncompleteHeader { need: usize, have: usize },

    /// The server is shutting down and not accepting new requests.
    #[error("server shutting down")]
    ShuttingDown,

    /// A serialization/deserialization error from the wire format.
    #[error("wire error: {0}")]
    Wire(#[from] tdfs_proto::WireError),

    /// An error propagated from a service handler.
    #[error("service error: {0}")]
    Service(#[from] tdfs_types::Status),
}
