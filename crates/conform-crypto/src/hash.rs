//! Keccak-256, the pre-standard SHA-3 variant Ethereum hashes with

use conform_primitives::H256;
use sha3::{Digest, Keccak256};

/// Keccak-256 of `data`
pub fn keccak256(data: &[u8]) -> H256 {
    H256::from_bytes(Keccak256::digest(data).into())
}
