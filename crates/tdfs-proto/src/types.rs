//! Records shared between the metadata and storage protocols.

use serde::{Deserialize, Serialize};

use crate::wire::{WireDeserialize, WireError, WireSerialize};
use tdfs_types::Address;

// Addresses travel on the wire in their packed u64 form.
impl WireSerialize for Address {
    fn wire_serialize(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        self.to_u64().wire_serialize(buf)
    }
}

impl WireDeserialize for Address {
    fn wire_deserialize(buf: &[u8], offset: &mut usize) -> Result<Self, WireError> {
        let packed = u64::wire_deserialize(buf, offset)?;
        Address::from_u64(packed).ok_or(WireError::InvalidEnumVariant {
            enum_name: "AddressType",
            value: packed & 0xFFFF,
        })
    }
}

/// A flat directory-entry record as returned by the metadata service.
///
/// `owner` is the storage node holding the file's bytes; directories carry
/// no owner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileInfo {
    /// Final path segment.
    pub name: String,
    /// Canonical full path, usable as a directory handle when `is_dir`.
    pub path: String,
    /// Size in bytes (files only, 0 for directories).
    pub size: u64,
    /// Unix-style mode bits.
    pub mode: u32,
    /// Modification time in nanoseconds since the epoch.
    pub mtime_ns: i64,
    /// Whether this entry is a directory.
    pub is_dir: bool,
    /// Storage node holding the file bytes (files only).
    pub owner: Option<Address>,
}

crate::impl_wire_struct!(FileInfo {
    name,
    path,
    size,
    mode,
    mtime_ns,
    is_dir,
    owner,
});
