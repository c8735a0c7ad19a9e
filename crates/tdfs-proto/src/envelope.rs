//! The `[status: u16 LE][body]` response envelope.
//!
//! Every RPC response payload starts with the numeric status code of the
//! handler result. On success (code 0) the message body follows directly;
//! on error an optional length-prefixed message string follows instead.

use crate::wire::{WireDeserialize, WireError, WireSerialize};
use tdfs_types::status_code::StatusCode;
use tdfs_types::{Result, Status};

/// Encode a handler result as a response payload.
pub fn encode_reply(result: Result<Vec<u8>>) -> Vec<u8> {
    match result {
        Ok(body) => {
            let mut buf = Vec::with_capacity(2 + body.len());
            // Infallible for u16 into a Vec.
            let _ = StatusCode::OK.wire_serialize(&mut buf);
            buf.extend_from_slice(&body);
            buf
        }
        Err(status) => {
            let mut buf = Vec::new();
            let _ = status.code().wire_serialize(&mut buf);
            let msg = status.message().unwrap_or_default().to_string();
            let _ = msg.wire_serialize(&mut buf);
            buf
        }
    }
}

/// Decode a response payload into either the message body or a `Status`.
pub fn decode_reply(payload: &[u8]) -> Result<Vec<u8>> {
    let mut offset = 0;
    let code = u16::wire_deserialize(payload, &mut offset)
        .map_err(|e| Status::with_message(StatusCode::INVALID_FORMAT, e.to_string()))?;

    if code == StatusCode::OK {
        return Ok(payload[offset..].to_vec());
    }

    // A malformed error message still surfaces the original status code.
    match String::wire_deserialize(payload, &mut offset) {
        Ok(msg) if msg.is_empty() => Err(Status::new(code)),
        Ok(msg) => Err(Status::with_message(code, msg)),
        Err(_) => Err(Status::new(code)),
    }
}

/// Map a wire decoding failure to the status returned to remote callers.
pub fn decode_error(err: WireError) -> Status {
    Status::with_message(StatusCode::INVALID_FORMAT, err.to_string())
}
