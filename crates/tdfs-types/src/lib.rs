//! Shared primitive types for tdfs: network addresses, status codes, and the
//! `Status`-based result type used by every service in the system.

pub mod address;
pub mod result;
pub mod status;
pub mod status_code;

pub use address::{Address, AddressParseError, AddressType};
pub use result::{make_error, make_error_msg, Result};
pub use status::Status;
