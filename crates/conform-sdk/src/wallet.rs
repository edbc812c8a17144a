//! Signing account
//!
//! A [`Wallet`] owns one secp256k1 key and the address derived from it. It
//! is deliberately not `Clone` and its `Debug` output only shows the address,
//! so configured keys do not leak into logs or reports.

use conform_crypto::{public_key_to_address, sign, PrivateKey, Signature};
use conform_primitives::{Address, H256};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::SdkError;

/// Key pair used to sign outgoing transactions
pub struct Wallet {
    key: PrivateKey,
    address: Address,
}

impl Wallet {
    fn with_key(key: PrivateKey) -> Self {
        let address = public_key_to_address(key.verifying_key());
        Self { key, address }
    }

    /// Fresh key from the OS RNG
    pub fn new_random() -> Self {
        Self::with_key(SigningKey::random(&mut OsRng))
    }

    /// Key from its 32 raw bytes; zero and values at or above the curve
    /// order are rejected
    pub fn from_private_key(bytes: &[u8; 32]) -> Result<Self, SdkError> {
        SigningKey::from_slice(bytes)
            .map(Self::with_key)
            .map_err(|e| SdkError::InvalidPrivateKey(e.to_string()))
    }

    /// Key from hex text, `0x` prefix optional
    pub fn from_private_key_hex(text: &str) -> Result<Self, SdkError> {
        let digits = text.strip_prefix("0x").unwrap_or(text);
        let decoded = Zeroizing::new(
            hex::decode(digits).map_err(|e| SdkError::InvalidPrivateKey(e.to_string()))?,
        );
        let bytes: Zeroizing<[u8; 32]> = Zeroizing::new(
            decoded.as_slice().try_into().map_err(|_| {
                SdkError::InvalidPrivateKey(format!("expected 32 bytes, got {}", decoded.len()))
            })?,
        );
        Self::from_private_key(&bytes)
    }

    /// Address the node will see as `from`
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Sign a prehashed message (low-s, parity in 0..=1)
    pub fn sign_hash(&self, hash: &H256) -> Result<Signature, SdkError> {
        Ok(sign(hash, &self.key)?)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conform_crypto::{keccak256, recover_address};

    const FAITH_KEY: &str = "0xb9d2ea9a615f3165812e8d44de0d24da9bbd164b65c4f0573e1ce2c8dbd9c8df";

    #[test]
    fn test_random_wallets_differ() {
        let a = Wallet::new_random();
        let b = Wallet::new_random();
        assert_ne!(a.address(), &Address::ZERO);
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn test_hex_key_with_and_without_prefix() {
        let prefixed = Wallet::from_private_key_hex(FAITH_KEY).unwrap();
        let bare = Wallet::from_private_key_hex(&FAITH_KEY[2..]).unwrap();
        assert_eq!(prefixed.address().to_hex(), "0xc0f0f4ab324c46e55d02d0033343b4be8a55532d");
        assert_eq!(prefixed.address(), bare.address());
    }

    #[test]
    fn test_rejects_malformed_keys() {
        for bad in ["0x1234", "0xzz", ""] {
            assert!(
                matches!(Wallet::from_private_key_hex(bad), Err(SdkError::InvalidPrivateKey(_))),
                "{:?}",
                bad
            );
        }
        assert!(Wallet::from_private_key(&[0u8; 32]).is_err());
        assert!(Wallet::from_private_key(&[0xff; 32]).is_err());
    }

    #[test]
    fn test_signature_recovers_to_wallet_address() {
        let wallet = Wallet::new_random();
        let hash = keccak256(b"conformance");
        let signature = wallet.sign_hash(&hash).unwrap();
        assert_eq!(&recover_address(&hash, &signature).unwrap(), wallet.address());
    }

    #[test]
    fn test_debug_shows_only_address() {
        let wallet = Wallet::from_private_key_hex(FAITH_KEY).unwrap();
        let debug = format!("{:?}", wallet);
        assert!(debug.contains("address"));
        assert!(!debug.contains("b9d2ea9a"));
    }
}
