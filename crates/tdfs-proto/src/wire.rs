//! Little-endian wire serialization traits and implementations for the
//! primitive building blocks of RPC messages.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

/// Strings and vectors larger than this are rejected at encode and decode
/// time. Keeps a corrupt length prefix from triggering a huge allocation.
pub const MAX_FIELD_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("insufficient data: need {need} bytes but only {have} remain")]
    InsufficientData { need: usize, have: usize },
    #[error("invalid enum variant for {enum_name}: {value}")]
    InvalidEnumVariant {
        enum_name: &'static str,
        value: u64,
    },
    #[error("invalid UTF-8 string")]
    InvalidUtf8,
    #[error("field too large: {size} bytes")]
    FieldTooLarge { size: usize },
    #[error("trailing data after message: consumed {consumed} of {total} bytes")]
    TrailingData { consumed: usize, total: usize },
}

pub trait WireSerialize {
    fn wire_serialize(&self, buf: &mut Vec<u8>) -> Result<(), WireError>;
}

pub trait WireDeserialize: Sized {
    fn wire_deserialize(buf: &[u8], offset: &mut usize) -> Result<Self, WireError>;
}

fn read_bytes<'a>(buf: &'a [u8], offset: &mut usize, n: usize) -> Result<&'a [u8], WireError> {
    if buf.len() - *offset < n {
        return Err(WireError::InsufficientData {
            need: n,
            have: buf.len() - *offset,
        });
    }
    let slice = &buf[*offset..*offset + n];
    *offset += n;
    Ok(slice)
}

// ---------------------------------------------------------------------------
// Integer types
// ---------------------------------------------------------------------------

macro_rules! impl_wire_for_int {
    ($ty:ty, $size:expr, $read:ident, $write:ident) => {
        impl WireSerialize for $ty {
            fn wire_serialize(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
                let mut tmp = [0u8; $size];
                LittleEndian::$write(&mut tmp, *self);
                buf.extend_from_slice(&tmp);
                Ok(())
            }
        }

        impl WireDeserialize for $ty {
            fn wire_deserialize(buf: &[u8], offset: &mut usize) -> Result<Self, WireError> {
                let bytes = read_bytes(buf, offset, $size)?;
                Ok(LittleEndian::$read(bytes))
            }
        }
    };
}

impl_wire_for_int!(u16, 2, read_u16, write_u16);
impl_wire_for_int!(u32, 4, read_u32, write_u32);
impl_wire_for_int!(u64, 8, read_u64, write_u64);
impl_wire_for_int!(i16, 2, read_i16, write_i16);
impl_wire_for_int!(i32, 4, read_i32, write_i32);
impl_wire_for_int!(i64, 8, read_i64, write_i64);

// u8 is single-byte, no endianness needed.

impl WireSerialize for u8 {
    fn wire_serialize(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        buf.push(*self);
        Ok(())
    }
}

impl WireDeserialize for u8 {
    fn wire_deserialize(buf: &[u8], offset: &mut usize) -> Result<Self, WireError> {
        let bytes = read_bytes(buf, offset, 1)?;
        Ok(bytes[0])
    }
}

// ---------------------------------------------------------------------------
// bool
// ---------------------------------------------------------------------------

impl WireSerialize for bool {
    fn wire_serialize(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        buf.push(*self as u8);
        Ok(())
    }
}

impl WireDeserialize for bool {
    fn wire_deserialize(buf: &[u8], offset: &mut usize) -> Result<Self, WireError> {
        let bytes = read_bytes(buf, offset, 1)?;
        match bytes[0] {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(WireError::InvalidEnumVariant {
                enum_name: "bool",
                value: v as u64,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// String: u32 length prefix + UTF-8 bytes
// ---------------------------------------------------------------------------

impl WireSerialize for String {
    fn wire_serialize(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        if self.len() > MAX_FIELD_LEN {
            return Err(WireError::FieldTooLarge { size: self.len() });
        }
        (self.len() as u32).wire_serialize(buf)?;
        buf.extend_from_slice(self.as_bytes());
        Ok(())
    }
}

impl WireDeserialize for String {
    fn wire_deserialize(buf: &[u8], offset: &mut usize) -> Result<Self, WireError> {
        let len = u32::wire_deserialize(buf, offset)? as usize;
        if len > MAX_FIELD_LEN {
            return Err(WireError::FieldTooLarge { size: len });
        }
        let bytes = read_bytes(buf, offset, len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8)
    }
}

// ---------------------------------------------------------------------------
// Vec<T>: u32 count prefix + items
// ---------------------------------------------------------------------------

impl<T: WireSerialize> WireSerialize for Vec<T> {
    fn wire_serialize(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        if self.len() > MAX_FIELD_LEN {
            return Err(WireError::FieldTooLarge { size: self.len() });
        }
        (self.len() as u32).wire_serialize(buf)?;
        for item in self {
            item.wire_serialize(buf)?;
        }
        Ok(())
    }
}

impl<T: WireDeserialize> WireDeserialize for Vec<T> {
    fn wire_deserialize(buf: &[u8], offset: &mut usize) -> Result<Self, WireError> {
        let count = u32::wire_deserialize(buf, offset)? as usize;
        if count > MAX_FIELD_LEN {
            return Err(WireError::FieldTooLarge { size: count });
        }
        // An item takes at least one byte, so the count cannot legitimately
        // exceed the remaining buffer length.
        if count > buf.len() - *offset {
            return Err(WireError::InsufficientData {
                need: count,
                have: buf.len() - *offset,
            });
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::wire_deserialize(buf, offset)?);
        }
        Ok(items)
    }
}

// ---------------------------------------------------------------------------
// Option<T>: u8 presence flag + value
// ---------------------------------------------------------------------------

impl<T: WireSerialize> WireSerialize for Option<T> {
    fn wire_serialize(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        match self {
            Some(v) => {
                buf.push(1);
                v.wire_serialize(buf)
            }
            None => {
                buf.push(0);
                Ok(())
            }
        }
    }
}

impl<T: WireDeserialize> WireDeserialize for Option<T> {
    fn wire_deserialize(buf: &[u8], offset: &mut usize) -> Result<Self, WireError> {
        let flag = u8::wire_deserialize(buf, offset)?;
        match flag {
            0 => Ok(None),
            1 => Ok(Some(T::wire_deserialize(buf, offset)?)),
            v => Err(WireError::InvalidEnumVariant {
                enum_name: "Option",
                value: v as u64,
            }),
        }
    }
}

/// Implement the wire traits for a struct by serializing its fields in
/// declaration order. Works for empty structs too.
#[macro_export]
macro_rules! impl_wire_struct {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::wire::WireSerialize for $ty {
            fn wire_serialize(
                &self,
                buf: &mut Vec<u8>,
            ) -> std::result::Result<(), $crate::wire::WireError> {
                $($crate::wire::WireSerialize::wire_serialize(&self.$field, buf)?;)*
                let _ = buf;
                Ok(())
            }
        }

        impl $crate::wire::WireDeserialize for $ty {
            fn wire_deserialize(
                buf: &[u8],
                offset: &mut usize,
            ) -> std::result::Result<Self, $crate::wire::WireError> {
                let _ = (buf, &offset);
                Ok(Self {
                    $($field: $crate::wire::WireDeserialize::wire_deserialize(buf, offset)?),*
                })
            }
        }
    };
}
