//! # conform-crypto
//!
//! What the harness needs to act as a transaction sender and to check what a
//! node reports back: Keccak-256 for hashes, selectors and topics, and
//! secp256k1 signing with address recovery so a submitted transaction's
//! `from` can be predicted.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod signature;

pub use error::CryptoError;
pub use hash::keccak256;
pub use signature::{
    public_key_to_address, recover_address, recover_public_key, sign, PrivateKey, PublicKey,
    Signature,
};
