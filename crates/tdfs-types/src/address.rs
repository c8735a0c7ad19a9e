use std::fmt;
use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Network address type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize,
)]
#[repr(u16)]
pub enum AddressType {
    TCP = 0,
    /// In-process address used by tests and mock transports.
    LOCAL = 1,
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressType::TCP => write!(f, "TCP"),
            AddressType::LOCAL => write!(f, "LOCAL"),
        }
    }
}

/// Network address combining an IPv4 address, port, and transport type.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    /// IPv4 address in network byte order (big-endian).
    pub ip: u32,
    /// Port number.
    pub port: u16,
    /// Transport type.
    pub addr_type: AddressType,
}

impl Address {
    /// Create a new address.
    pub fn new(ip: u32, port: u16, addr_type: AddressType) -> Self {
        Self {
            ip,
            port,
            addr_type,
        }
    }

    /// Create an address from four octets, a port, and a type.
    pub fn from_octets(a: u8, b: u8, c: u8, d: u8, port: u16, addr_type: AddressType) -> Self {
        let ip = u32::from_be_bytes([a, b, c, d]);
        Self {
            ip,
            port,
            addr_type,
        }
    }

    /// Convenience constructor for a loopback TCP address.
    pub fn localhost(port: u16) -> Self {
        Self::from_octets(127, 0, 0, 1, port, AddressType::TCP)
    }

    /// Return the four IP octets.
    pub fn octets(&self) -> [u8; 4] {
        self.ip.to_be_bytes()
    }

    /// Pack into a u64 for compact storage and wire transfer.
    ///
    /// Layout: `[ip:32][port:16][addr_type:16]`
    pub fn to_u64(&self) -> u64 {
        let ty: u16 = self.addr_type.into();
        ((self.ip as u64) << 32) | ((self.port as u64) << 16) | (ty as u64)
    }

    /// Unpack from a u64. Returns `None` for an unknown address type.
    pub fn from_u64(val: u64) -> Option<Self> {
        let ip = (val >> 32) as u32;
        let port = ((val >> 16) & 0xFFFF) as u16;
        let ty = (val & 0xFFFF) as u16;
        let addr_type = AddressType::try_from(ty).ok()?;
        Some(Self {
            ip,
            port,
            addr_type,
        })
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets();
        write!(f, "{}://{}.{}.{}.{}:{}", self.addr_type, a, b, c, d, self.port)
    }
}

/// Errors from parsing an address string.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("missing scheme separator '://'")]
    MissingScheme,
    #[error("unknown address type: {0}")]
    UnknownType(String),
    #[error("missing port")]
    MissingPort,
    #[error("invalid IP address: {0}")]
    InvalidIp(String),
    #[error("invalid port: {0}")]
    InvalidPort(String),
}

impl FromStr for Address {
    type Err = AddressParseError;

    /// Parse an address string like `"TCP://192.168.1.1:8080"`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (type_str, rest) = s.split_once("://").ok_or(AddressParseError::MissingScheme)?;

        let addr_type = match type_str {
            "TCP" => AddressType::TCP,
            "LOCAL" => AddressType::LOCAL,
            _ => return Err(AddressParseError::UnknownType(type_str.to_string())),
        };

        let (ip_str, port_str) = rest.rsplit_once(':').ok_or(AddressParseError::MissingPort)?;

        let mut octets = [0u8; 4];
        let mut parts = ip_str.split('.');
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| AddressParseError::InvalidIp(ip_str.to_string()))?;
            *octet = part
                .parse()
                .map_err(|_| AddressParseError::InvalidIp(ip_str.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(AddressParseError::InvalidIp(ip_str.to_string()));
        }

        let port = port_str
            .parse()
            .map_err(|_| AddressParseError::InvalidPort(port_str.to_string()))?;

        Ok(Self::from_octets(
            octets[0], octets[1], octets[2], octets[3], port, addr_type,
        ))
    }
}
