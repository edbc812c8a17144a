//! 32-byte hashes: block and transaction hashes, roots, log topics

use thiserror::Error;

use crate::fixed::fixed_bytes;

/// Why text or bytes are not a 32-byte hash
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    /// Not hex
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    /// Decoded to the wrong number of bytes
    #[error("invalid hash length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

fixed_bytes! {
    /// 256-bit hash
    H256, 32, HashError
}
