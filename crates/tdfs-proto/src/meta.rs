//! Metadata service request/response types.

use serde::{Deserialize, Serialize};

use crate::types::FileInfo;
use tdfs_types::Address;

/// Service id of the metadata service.
pub const SERVICE_ID: u16 = 1;

/// Method ids within the metadata service.
pub mod method {
    pub const PING: u16 = 0;
    pub const MKDIR: u16 = 1;
    pub const REGISTER_FILE_CREATION: u16 = 2;
    pub const GET_LOCATION: u16 = 3;
    pub const OPEN_DIR: u16 = 4;
    pub const READ_DIR_ENTRY: u16 = 5;
    pub const READ_DIR_ALL: u16 = 6;
    pub const DELETE_ALL_DATA: u16 = 7;
}

// ---- Ping ----

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PingReq {
    pub challenge: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PingRsp {
    pub challenge: u64,
}

// ---- MakeDirectory ----

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MkdirReq {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MkdirRsp {
    /// Canonical path of the directory (also returned on the idempotent
    /// already-exists path).
    pub path: String,
}

// ---- RegisterFileCreation ----

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterFileReq {
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFileRsp {
    /// Storage node chosen for the file; the caller performs the byte
    /// transfer against it out of band.
    pub node: Address,
}

// ---- GetLocation ----

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetLocationReq {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLocationRsp {
    pub node: Address,
}

// ---- OpenDirectory ----

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenDirReq {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenDirRsp {
    /// The canonical path doubles as the directory handle.
    pub handle: String,
}

// ---- ReadDirEntry ----

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadDirEntryReq {
    pub handle: String,
    pub index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadDirEntryRsp {
    pub entry: FileInfo,
}

// ---- ReadDirAll ----

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadDirAllReq {
    pub handle: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadDirAllRsp {
    pub entries: Vec<FileInfo>,
}

// ---- DeleteAllData ----

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteAllReq {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteAllRsp {}

crate::impl_wire_struct!(PingReq { challenge });
crate::impl_wire_struct!(PingRsp { challenge });
crate::impl_wire_struct!(MkdirReq { path });
crate::impl_wire_struct!(MkdirRsp { path });
crate::impl_wire_struct!(RegisterFileReq { path, size });
crate::impl_wire_struct!(RegisterFileRsp { node });
crate::impl_wire_struct!(GetLocationReq { path });
crate::impl_wire_struct!(GetLocationRsp { node });
crate::impl_wire_struct!(OpenDirReq { path });
crate::impl_wire_struct!(OpenDirRsp { handle });
crate::impl_wire_struct!(ReadDirEntryReq { handle, index });
crate::impl_wire_struct!(ReadDirEntryRsp { entry });
crate::impl_wire_struct!(ReadDirAllReq { handle });
crate::impl_wire_struct!(ReadDirAllRsp { entries });
crate::impl_wire_struct!(DeleteAllReq {});
crate::impl_wire_struct!(DeleteAllRsp {});
