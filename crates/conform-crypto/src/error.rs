//! Errors from signing and recovery

use thiserror::Error;

/// Failure of a secp256k1 operation
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The key refused to sign the prehash
    #[error("cannot sign: {0}")]
    Sign(#[source] k256::ecdsa::Error),

    /// `r` or `s` is not a valid scalar
    #[error("malformed signature scalars: {0}")]
    Scalars(#[source] k256::ecdsa::Error),

    /// Parity byte outside 0..=3
    #[error("recovery id {0} out of range")]
    Parity(u8),

    /// No public key matches the signature and hash
    #[error("no key recovers from signature: {0}")]
    Unrecoverable(#[source] k256::ecdsa::Error),
}
