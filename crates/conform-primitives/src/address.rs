//! Ethereum account address

use thiserror::Error;

use crate::fixed::fixed_bytes;

/// Why text or bytes are not an address
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// Not hex
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    /// Decoded to the wrong number of bytes
    #[error("invalid address length: expected 20 bytes, got {0}")]
    InvalidLength(usize),
}

fixed_bytes! {
    /// 20-byte account or contract address
    Address, 20, AddressError
}
