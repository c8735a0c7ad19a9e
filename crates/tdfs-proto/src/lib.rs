//! RPC message definitions and the wire codec for tdfs.
//!
//! Message bodies are encoded with a compact little-endian format via the
//! [`WireSerialize`]/[`WireDeserialize`] traits. Each RPC response is wrapped
//! in a `[status: u16][body]` envelope (see [`envelope`]) so callers can
//! distinguish service errors from successful payloads without a side
//! channel.

pub mod envelope;
pub mod meta;
pub mod storage;
pub mod types;
pub mod wire;

pub use types::FileInfo;
pub use wire::{WireDeserialize, WireError, WireSerialize};

/// Serialize a wire message into a fresh buffer.
pub fn to_wire<T: WireSerialize>(msg: &T) -> Result<Vec<u8>, WireError> {
    let mut buf = Vec::new();
    msg.wire_serialize(&mut buf)?;
    Ok(buf)
}

/// Deserialize a wire message from a buffer, requiring all bytes consumed.
pub fn from_wire<T: WireDeserialize>(buf: &[u8]) -> Result<T, WireError> {
    let mut offset = 0;
    let msg = T::wire_deserialize(buf, &mut offset)?;
    if offset != buf.len() {
        return Err(WireError::TrailingData {
            consumed: offset,
            total: buf.len(),
        });
    }
    Ok(msg)
}
