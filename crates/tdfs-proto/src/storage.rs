//! Storage node request/response types.

use serde::{Deserialize, Serialize};

/// Service id of the storage node service.
pub const SERVICE_ID: u16 = 2;

/// Method ids within the storage node service.
pub mod method {
    pub const PING: u16 = 0;
    pub const CREATE_FILE: u16 = 1;
    pub const GET_FILE: u16 = 2;
    pub const GREP: u16 = 3;
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

// ---- CreateFile ----

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateFileReq {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateFileRsp {
    pub bytes_written: u64,
}

// ---- GetFile ----

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetFileReq {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetFileRsp {
    pub data: Vec<u8>,
}

// ---- Grep ----

/// Count occurrences of a whitespace-delimited word in a stored file,
/// server side. The "compute near data" primitive used by distributed grep.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GrepReq {
    pub name: String,
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GrepRsp {
    pub count: u64,
}

crate::impl_wire_struct!(PingReq { challenge });
crate::impl_wire_struct!(PingRsp { challenge });
crate::impl_wire_struct!(CreateFileReq { name, data });
crate::impl_wire_struct!(CreateFileRsp { bytes_written });
crate::impl_wire_struct!(GetFileReq { name });
crate::impl_wire_struct!(GetFileRsp { data });
crate::impl_wire_struct!(GrepReq { name, word });
crate::impl_wire_struct!(GrepRsp { count });
