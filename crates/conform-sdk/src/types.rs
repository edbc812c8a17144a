//! RPC request and response types

use bytes::Bytes;
use conform_crypto::keccak256;
use conform_primitives::quantity::{self, bytes_hex, opt_u256_hex, opt_u64_hex, u64_hex};
use conform_primitives::{Address, H256, U256};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Block identifier for RPC queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockId {
    /// Block number
    Number(u64),
    /// Block hash
    Hash(H256),
    /// Latest block
    #[default]
    Latest,
    /// Pending block (includes pending transactions)
    Pending,
    /// Earliest block (genesis)
    Earliest,
}

impl Serialize for BlockId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            BlockId::Number(n) => serializer.serialize_str(&quantity::format_u64(*n)),
            BlockId::Hash(h) => serializer.serialize_str(&h.to_hex()),
            BlockId::Latest => serializer.serialize_str("latest"),
            BlockId::Pending => serializer.serialize_str("pending"),
            BlockId::Earliest => serializer.serialize_str("earliest"),
        }
    }
}

impl From<u64> for BlockId {
    fn from(n: u64) -> Self {
        BlockId::Number(n)
    }
}

impl From<H256> for BlockId {
    fn from(h: H256) -> Self {
        BlockId::Hash(h)
    }
}

/// Call request for `eth_call`
#[derive(Debug, Clone, Default)]
pub struct CallRequest {
    /// Sender address
    pub from: Option<Address>,
    /// Recipient address
    pub to: Option<Address>,
    /// Gas limit
    pub gas: Option<u64>,
    /// Gas price
    pub gas_price: Option<U256>,
    /// Value to transfer
    pub value: Option<U256>,
    /// Input data
    pub data: Option<Bytes>,
}

impl CallRequest {
    /// A call to `to` with `data` as input
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to: Some(to),
            data: Some(data.into()),
            ..Default::default()
        }
    }

    /// Set the sender
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }
}

impl Serialize for CallRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;

        if let Some(from) = &self.from {
            map.serialize_entry("from", &from.to_hex())?;
        }
        if let Some(to) = &self.to {
            map.serialize_entry("to", &to.to_hex())?;
        }
        if let Some(gas) = self.gas {
            map.serialize_entry("gas", &quantity::format_u64(gas))?;
        }
        if let Some(gas_price) = &self.gas_price {
            map.serialize_entry("gasPrice", &quantity::format_u256(gas_price))?;
        }
        if let Some(value) = &self.value {
            map.serialize_entry("value", &quantity::format_u256(value))?;
        }
        if let Some(data) = &self.data {
            map.serialize_entry("data", &quantity::format_bytes(data))?;
        }

        map.end()
    }
}

/// 2048-bit log bloom filter
///
/// Each input sets three bits taken from the first six bytes of its keccak-256
/// hash: every big-endian byte pair, masked to 11 bits, indexes a bit counted
/// from the low end of the 256-byte array.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bloom([u8; Bloom::LEN]);

impl Bloom {
    /// Byte length
    pub const LEN: usize = 256;

    /// Bloom with no bits set
    pub const EMPTY: Bloom = Bloom([0u8; Bloom::LEN]);

    /// Wrap raw bytes
    pub const fn from_bytes(bytes: [u8; Bloom::LEN]) -> Self {
        Self(bytes)
    }

    /// Build from a slice that must be exactly 256 bytes
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; Bloom::LEN] = slice.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; Bloom::LEN] {
        &self.0
    }

    /// Bit positions (byte index, mask) derived from `input`
    fn positions(input: &[u8]) -> [(usize, u8); 3] {
        let hash = keccak256(input);
        let h = hash.as_bytes();
        let mut out = [(0usize, 0u8); 3];
        for (i, slot) in out.iter_mut().enumerate() {
            let bit = ((usize::from(h[2 * i]) << 8) | usize::from(h[2 * i + 1])) & 0x7FF;
            *slot = (Self::LEN - 1 - bit / 8, 1u8 << (bit % 8));
        }
        out
    }

    /// Add `input` (an address or topic) to the filter
    pub fn accrue(&mut self, input: &[u8]) {
        for (byte, mask) in Self::positions(input) {
            self.0[byte] |= mask;
        }
    }

    /// Whether every bit derived from `input` is set
    pub fn contains_input(&self, input: &[u8]) -> bool {
        Self::positions(input)
            .iter()
            .all(|&(byte, mask)| self.0[byte] & mask == mask)
    }

    /// OR another bloom into this one
    pub fn accrue_bloom(&mut self, other: &Bloom) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a |= *b;
        }
    }

    /// Whether no bit is set
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Hex text with `0x` prefix
    pub fn to_hex(&self) -> String {
        quantity::format_bytes(&self.0)
    }
}

impl Default for Bloom {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Bloom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = self.0.iter().map(|b| b.count_ones()).sum::<u32>();
        write!(f, "Bloom({} bits set)", set)
    }
}

impl Serialize for Bloom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Bloom {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = quantity::parse_bytes(&s).map_err(de::Error::custom)?;
        Bloom::from_slice(&bytes).ok_or_else(|| {
            de::Error::custom(format!("bloom must be {} bytes, got {}", Bloom::LEN, bytes.len()))
        })
    }
}

/// Transactions of a block: hashes, or full objects when requested
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BlockTransactions {
    /// Transaction hashes only
    Hashes(Vec<H256>),
    /// Full transaction objects
    Full(Vec<Value>),
}

impl BlockTransactions {
    /// Number of transactions
    pub fn len(&self) -> usize {
        match self {
            BlockTransactions::Hashes(h) => h.len(),
            BlockTransactions::Full(t) => t.len(),
        }
    }

    /// Whether the block carries no transactions
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transaction hashes, read from the objects when full
    pub fn hashes(&self) -> Vec<H256> {
        match self {
            BlockTransactions::Hashes(h) => h.clone(),
            BlockTransactions::Full(txs) => txs
                .iter()
                .filter_map(|tx| tx.get("hash")?.as_str())
                .filter_map(|h| H256::from_hex(h).ok())
                .collect(),
        }
    }
}

impl Default for BlockTransactions {
    fn default() -> Self {
        BlockTransactions::Hashes(Vec::new())
    }
}

/// Block as returned by `eth_getBlockByNumber` / `eth_getBlockByHash`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    /// Block number (`None` for pending blocks)
    #[serde(default, with = "opt_u64_hex")]
    pub number: Option<u64>,
    /// Block hash (`None` for pending blocks)
    #[serde(default)]
    pub hash: Option<H256>,
    /// Parent block hash
    pub parent_hash: H256,
    /// PoW nonce, kept as the node's text
    #[serde(default)]
    pub nonce: Option<String>,
    /// Ommers hash
    pub sha3_uncles: H256,
    /// Logs bloom
    #[serde(default)]
    pub logs_bloom: Option<Bloom>,
    /// Transactions trie root
    pub transactions_root: H256,
    /// State trie root
    pub state_root: H256,
    /// Receipts trie root
    pub receipts_root: H256,
    /// Beneficiary
    #[serde(default)]
    pub miner: Option<Address>,
    /// Beneficiary as reported by some node implementations
    #[serde(default)]
    pub author: Option<Address>,
    /// Difficulty
    #[serde(default, with = "opt_u256_hex")]
    pub difficulty: Option<U256>,
    /// Total difficulty
    #[serde(default, with = "opt_u256_hex")]
    pub total_difficulty: Option<U256>,
    /// Extra data
    #[serde(with = "bytes_hex")]
    pub extra_data: Bytes,
    /// Size in bytes
    #[serde(default, with = "opt_u64_hex")]
    pub size: Option<u64>,
    /// Gas limit
    #[serde(with = "u64_hex")]
    pub gas_limit: u64,
    /// Gas used
    #[serde(with = "u64_hex")]
    pub gas_used: u64,
    /// Unix timestamp
    #[serde(with = "u64_hex")]
    pub timestamp: u64,
    /// Transactions
    #[serde(default)]
    pub transactions: BlockTransactions,
    /// Uncle hashes
    #[serde(default)]
    pub uncles: Vec<H256>,
}

impl RpcBlock {
    /// Block author: `miner`, falling back to `author`
    pub fn beneficiary(&self) -> Option<Address> {
        self.miner.or(self.author)
    }
}

/// Log entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics
    pub topics: Vec<H256>,
    /// Non-indexed data
    #[serde(with = "bytes_hex")]
    pub data: Bytes,
    /// Block number
    #[serde(default, with = "opt_u64_hex")]
    pub block_number: Option<u64>,
    /// Transaction hash
    #[serde(default)]
    pub transaction_hash: Option<H256>,
    /// Index within the block
    #[serde(default, with = "opt_u64_hex")]
    pub log_index: Option<u64>,
    /// Removed by a reorg
    #[serde(default)]
    pub removed: Option<bool>,
}

/// Transaction receipt
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    /// Transaction hash
    pub transaction_hash: H256,
    /// Index within the block
    #[serde(default, with = "opt_u64_hex")]
    pub transaction_index: Option<u64>,
    /// Including block hash
    #[serde(default)]
    pub block_hash: Option<H256>,
    /// Including block number
    #[serde(default, with = "opt_u64_hex")]
    pub block_number: Option<u64>,
    /// Sender
    #[serde(default)]
    pub from: Option<Address>,
    /// Recipient (`None` for contract creation)
    #[serde(default)]
    pub to: Option<Address>,
    /// Cumulative gas used in the block
    #[serde(default, with = "opt_u64_hex")]
    pub cumulative_gas_used: Option<u64>,
    /// Gas used by this transaction
    #[serde(with = "u64_hex")]
    pub gas_used: u64,
    /// Created contract
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// Emitted logs
    #[serde(default)]
    pub logs: Vec<RpcLog>,
    /// Bloom over the logs
    pub logs_bloom: Bloom,
    /// `1` success, `0` failure (post-Byzantium)
    #[serde(default, with = "opt_u64_hex")]
    pub status: Option<u64>,
}

impl RpcReceipt {
    /// Execution outcome, when the node reports one
    pub fn succeeded(&self) -> Option<bool> {
        self.status.map(|s| s == 1)
    }
}
