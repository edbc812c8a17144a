//! Legacy transaction builder with EIP-155 replay protection

use bytes::Bytes;
use conform_crypto::keccak256;
use conform_primitives::{Address, H256, U256};
use rlp::RlpStream;

use crate::{SdkError, Wallet};

/// Transaction builder with fluent API
#[derive(Debug, Clone, Default)]
pub struct TxBuilder {
    chain_id: u64,
    nonce: Option<u64>,
    gas_limit: Option<u64>,
    gas_price: Option<U256>,
    to: Option<Address>,
    value: U256,
    data: Bytes,
}

impl TxBuilder {
    /// Create a new transaction builder
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Default::default()
        }
    }

    /// Set the nonce
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Set the gas limit
    pub fn gas_limit(mut self, limit: u64) -> Self {
        self.gas_limit = Some(limit);
        self
    }

    /// Set the gas price in wei
    pub fn gas_price(mut self, price: impl Into<U256>) -> Self {
        self.gas_price = Some(price.into());
        self
    }

    /// Set the recipient address; leave unset to create a contract
    pub fn to(mut self, address: Address) -> Self {
        self.to = Some(address);
        self
    }

    /// Set the value to transfer (in wei)
    pub fn value(mut self, value: impl Into<U256>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the input data
    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    fn fields(&self) -> Result<(u64, u64, U256), SdkError> {
        let nonce = self.nonce.ok_or(SdkError::MissingField("nonce".to_string()))?;
        let gas_limit = self
            .gas_limit
            .ok_or(SdkError::MissingField("gas_limit".to_string()))?;
        let gas_price = self
            .gas_price
            .ok_or(SdkError::MissingField("gas_price".to_string()))?;
        Ok((nonce, gas_limit, gas_price))
    }

    /// Append `[nonce, gasPrice, gas, to, value, data]`
    fn append_body(&self, stream: &mut RlpStream) -> Result<(), SdkError> {
        let (nonce, gas_limit, gas_price) = self.fields()?;
        stream.append(&nonce);
        stream.append(&gas_price);
        stream.append(&gas_limit);
        match &self.to {
            Some(to) => stream.append(&to.as_bytes().to_vec()),
            None => stream.append_empty_data(),
        };
        stream.append(&self.value);
        stream.append(&self.data.to_vec());
        Ok(())
    }

    /// EIP-155 signing hash: `keccak256(rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0]))`
    pub fn signing_hash(&self) -> Result<H256, SdkError> {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream)?;
        stream.append(&self.chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        Ok(keccak256(&stream.out()))
    }

    /// Sign and encode
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required fields are missing (nonce, gas_limit, gas_price)
    /// - Chain ID is 0 (replay protection requires valid chain ID)
    pub fn sign(&self, wallet: &Wallet) -> Result<SignedTx, SdkError> {
        if self.chain_id == 0 {
            return Err(SdkError::InvalidChainId(
                "chain id 0 disables replay protection".to_string(),
            ));
        }

        let hash = self.signing_hash()?;
        let signature = wallet.sign_hash(&hash)?;
        let v = u64::from(signature.recovery_id) + 35 + 2 * self.chain_id;

        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream)?;
        stream.append(&v);
        // U256 encodes without leading zeros
        stream.append(&U256::from_big_endian(&signature.r));
        stream.append(&U256::from_big_endian(&signature.s));

        let raw = Bytes::from(stream.out().to_vec());
        let hash = keccak256(&raw);
        Ok(SignedTx {
            raw,
            hash,
            from: *wallet.address(),
            nonce: self.nonce.unwrap_or_default(),
            to: self.to,
        })
    }
}

/// A signed, RLP-encoded transaction ready for `eth_sendRawTransaction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    raw: Bytes,
    hash: H256,
    from: Address,
    nonce: u64,
    to: Option<Address>,
}

impl SignedTx {
    /// Encoded bytes
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Transaction hash (`keccak256(raw)`)
    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// Signer
    pub fn from(&self) -> Address {
        self.from
    }

    /// Sender nonce
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Whether the transaction deploys a contract
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Address the deployed contract will get, for contract creations
    pub fn created_address(&self) -> Option<Address> {
        self.is_contract_creation()
            .then(|| contract_address(&self.from, self.nonce))
    }
}

/// Address of a contract created by `sender` at `nonce`: `keccak256(rlp([sender, nonce]))[12..]`
pub fn contract_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(&sender.as_bytes().to_vec());
    stream.append(&nonce);
    let hash = keccak256(&stream.out());

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conform_crypto::{recover_address, Signature};

    fn test_wallet() -> Wallet {
        Wallet::from_private_key_hex(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap()
    }

    fn eip155_example() -> TxBuilder {
        TxBuilder::new(1)
            .nonce(9)
            .gas_price(20_000_000_000u64)
            .gas_limit(21_000)
            .to(Address::from_bytes([0x35; 20]))
            .value(1_000_000_000_000_000_000u64)
    }

    #[test]
    fn test_eip155_signing_hash() {
        let hash = eip155_example().signing_hash().unwrap();
        assert_eq!(
            hash.to_hex(),
            "0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_signed_tx_decodes_and_recovers_sender() {
        let wallet = test_wallet();
        let builder = eip155_example();
        let signed = builder.sign(&wallet).unwrap();

        let rlp = rlp::Rlp::new(signed.raw());
        assert_eq!(rlp.item_count().unwrap(), 9);
        assert_eq!(rlp.val_at::<u64>(0).unwrap(), 9);
        assert_eq!(rlp.val_at::<Vec<u8>>(3).unwrap(), vec![0x35; 20]);

        let v: u64 = rlp.val_at(6).unwrap();
        assert!(v == 37 || v == 38);

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        rlp.val_at::<U256>(7).unwrap().to_big_endian(&mut r);
        rlp.val_at::<U256>(8).unwrap().to_big_endian(&mut s);
        let signature = Signature {
            r,
            s,
            recovery_id: (v - 37) as u8,
        };
        let hash = builder.signing_hash().unwrap();
        assert_eq!(&recover_address(&hash, &signature).unwrap(), wallet.address());
        assert_eq!(signed.hash(), keccak256(signed.raw()));
    }

    #[test]
    fn test_missing_fields() {
        let wallet = test_wallet();
        let err = TxBuilder::new(1).gas_limit(21_000).gas_price(1u64).sign(&wallet).unwrap_err();
        assert!(matches!(err, SdkError::MissingField(ref f) if f == "nonce"));

        let err = TxBuilder::new(1).nonce(0).gas_price(1u64).sign(&wallet).unwrap_err();
        assert!(matches!(err, SdkError::MissingField(ref f) if f == "gas_limit"));

        let err = TxBuilder::new(1).nonce(0).gas_limit(21_000).sign(&wallet).unwrap_err();
        assert!(matches!(err, SdkError::MissingField(ref f) if f == "gas_price"));
    }

    #[test]
    fn test_rejects_zero_chain_id() {
        let result = TxBuilder::new(0)
            .nonce(0)
            .gas_limit(21_000)
            .gas_price(1u64)
            .sign(&test_wallet());
        assert!(matches!(result, Err(SdkError::InvalidChainId(_))));
    }

    #[test]
    fn test_contract_creation_has_empty_to() {
        let wallet = test_wallet();
        let signed = TxBuilder::new(43)
            .nonce(0)
            .gas_limit(1_000_000)
            .gas_price(1u64)
            .data(vec![0x60, 0x80, 0x60, 0x40])
            .sign(&wallet)
            .unwrap();

        assert!(signed.is_contract_creation());
        let rlp = rlp::Rlp::new(signed.raw());
        assert!(rlp.at(3).unwrap().is_empty());
        assert_eq!(
            signed.created_address().unwrap().to_hex(),
            "0x5fbdb2315678afecb367f032d93f642f64180aa3"
        );
    }

    #[test]
    fn test_contract_address_known_vector() {
        let sender = Address::from_hex("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap();
        assert_eq!(
            contract_address(&sender, 0).to_hex(),
            "0x5fbdb2315678afecb367f032d93f642f64180aa3"
        );
        assert_ne!(contract_address(&sender, 1), contract_address(&sender, 0));
    }
}
