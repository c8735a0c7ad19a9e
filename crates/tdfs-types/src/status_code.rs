/// Numeric status code type carried by [`crate::Status`].
#[allow(non_camel_case_types)]
pub type status_code_t = u16;

/// Common status codes (0-999).
#[allow(non_snake_case)]
pub mod StatusCode {
    use super::status_code_t;

    pub const OK: status_code_t = 0;
    pub const NOT_IMPLEMENTED: status_code_t = 1;
    pub const INVALID_ARG: status_code_t = 3;
    pub const INVALID_FORMAT: status_code_t = 33;
    pub const IO_ERROR: status_code_t = 69;
    pub const UNKNOWN: status_code_t = 999;
}

/// RPC status codes (2xxx).
#[allow(non_snake_case)]
pub mod RPCCode {
    use super::status_code_t;

    pub const TIMEOUT: status_code_t = 2005;
    pub const INVALID_ADDR: status_code_t = 2006;
    pub const SEND_FAILED: status_code_t = 2007;
    pub const INVALID_SERVICE_ID: status_code_t = 2008;
    pub const INVALID_METHOD_ID: status_code_t = 2009;
    pub const SOCKET_ERROR: status_code_t = 2010;
    pub const LISTEN_FAILED: status_code_t = 2011;
    pub const SOCKET_CLOSED: status_code_t = 2013;
    pub const CONNECT_FAILED: status_code_t = 2014;
}

/// Metadata service status codes (3xxx).
#[allow(non_snake_case)]
pub mod MetaCode {
    use super::status_code_t;

    pub const NOT_FOUND: status_code_t = 3000;
    pub const NOT_DIRECTORY: status_code_t = 3001;
    pub const IS_DIRECTORY: status_code_t = 3002;
    pub const EXISTS: status_code_t = 3003;
    pub const FILE_NOT_FOUND: status_code_t = 3004;
    pub const NO_NODES_REGISTERED: status_code_t = 3005;
    pub const NEGATIVE_INDEX: status_code_t = 3006;
    /// Sentinel: directory-listing index exhausted. Normal loop termination
    /// for callers iterating a directory, not a user-facing error.
    pub const END_OF_DIRECTORY: status_code_t = 3007;
    pub const CHALLENGE_MISMATCH: status_code_t = 3008;
    pub const INVALID_PATH: status_code_t = 3009;
}

/// Storage node status codes (4xxx).
#[allow(non_snake_case)]
pub mod StorageCode {
    use super::status_code_t;

    pub const INVALID_NAME: status_code_t = 4000;
    pub const FILE_NOT_FOUND: status_code_t = 4001;
    pub const READ_FAILED: status_code_t = 4002;
    pub const WRITE_FAILED: status_code_t = 4003;
}

/// Return a human-readable name for a status code.
pub fn to_string(code: status_code_t) -> &'static str {
    match code {
        StatusCode::OK => "OK",
        StatusCode::NOT_IMPLEMENTED => "NotImplemented",
        StatusCode::INVALID_ARG => "InvalidArg",
        StatusCode::INVALID_FORMAT => "InvalidFormat",
        StatusCode::IO_ERROR => "IoError",
        StatusCode::UNKNOWN => "Unknown",

        RPCCode::TIMEOUT => "RPC::Timeout",
        RPCCode::INVALID_ADDR => "RPC::InvalidAddr",
        RPCCode::SEND_FAILED => "RPC::SendFailed",
        RPCCode::INVALID_SERVICE_ID => "RPC::InvalidServiceId",
        RPCCode::INVALID_METHOD_ID => "RPC::InvalidMethodId",
        RPCCode::SOCKET_ERROR => "RPC::SocketError",
        RPCCode::LISTEN_FAILED => "RPC::ListenFailed",
        RPCCode::SOCKET_CLOSED => "RPC::SocketClosed",
        RPCCode::CONNECT_FAILED => "RPC::ConnectFailed",

        MetaCode::NOT_FOUND => "Meta::NotFound",
        MetaCode::NOT_DIRECTORY => "Meta::NotDirectory",
        MetaCode::IS_DIRECTORY => "Meta::IsDirectory",
        MetaCode::EXISTS => "Meta::Exists",
        MetaCode::FILE_NOT_FOUND => "Meta::FileNotFound",
        MetaCode::NO_NODES_REGISTERED => "Meta::NoNodesRegistered",
        MetaCode::NEGATIVE_INDEX => "Meta::NegativeIndex",
        MetaCode::END_OF_DIRECTORY => "Meta::EndOfDirectory",
        MetaCode::CHALLENGE_MISMATCH => "Meta::ChallengeMismatch",
        MetaCode::INVALID_PATH => "Meta::InvalidPath",

        StorageCode::INVALID_NAME => "Storage::InvalidName",
        StorageCode::FILE_NOT_FOUND => "Storage::FileNotFound",
        StorageCode::READ_FAILED => "Storage::ReadFailed",
        StorageCode::WRITE_FAILED => "Storage::WriteFailed",

        _ => "Unrecognized",
    }
}
