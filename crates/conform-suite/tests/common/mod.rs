//! In-process node speaking just enough JSON-RPC for the built-in scenarios

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use conform_crypto::{keccak256, recover_address, Signature};
use conform_harness::fixtures::constants;
use conform_harness::{FixtureRegistry, PollPolicy, Runner, RunnerConfig};
use conform_primitives::quantity::{format_bytes as hex_bytes, format_u256, format_u64 as hex_u64};
use conform_primitives::{Address, H256, U256};
use conform_sdk::{contract_address, Bloom, RpcClient, SdkError, Transport, TxBuilder};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const CHAIN_ID: u64 = 43;
pub const GAS_PRICE: u64 = 1_000_000_000;
pub const BLOCK_GAS_LIMIT: u64 = 9_375_000;
pub const DEFAULT_GAS: u64 = 4_000_000;
pub const FAITH: &str = "0xC0F0f4ab324C46e55D02D0033343B4Be8A55532d";
pub const FAITH_KEY: &str = "0xb9d2ea9a615f3165812e8d44de0d24da9bbd164b65c4f0573e1ce2c8dbd9c8df";

const EMPTY_TRIE_ROOT: &str = "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421";
const EMPTY_OMMERS_HASH: &str =
    "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347";

const INCREMENTER_HEX: &str = include_str!("../../contracts/incrementer.hex");
const OPCODES_HEX: &str = include_str!("../../contracts/opcodes.hex");

/// Ways the node can misbehave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Credits the recipient one wei too much
    InflatedCredit,
    /// Mined receipts carry no logs and an empty bloom
    DropLogs,
    /// `eth_sendRawTransaction` answers with a different hash
    WrongTxHash,
    /// Receipts never become available
    NeverMine,
    /// Aborted transactions still commit their storage writes
    CommitOnAbort,
    /// Genesis reports a non-zero timestamp
    GenesisTimestamp,
    /// Charges one gas unit more than the receipt reports
    Overcharge,
    /// Reports the sender barely able to afford the transfer value until it
    /// has sent anything
    UnderReportedSender,
}

enum Program {
    Incrementer { number: U256 },
    Opcodes { value: U256 },
}

struct Deployed {
    code: Bytes,
    program: Program,
}

struct Block {
    number: u64,
    hash: H256,
    parent_hash: H256,
    timestamp: u64,
    gas_used: u64,
    bloom: Bloom,
    transactions: Vec<H256>,
}

struct Chain {
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    contracts: HashMap<Address, Deployed>,
    blocks: Vec<Block>,
    receipts: HashMap<H256, (u32, Value)>,
    faults: Vec<Fault>,
}

/// Decoded legacy transaction
struct RawTx {
    nonce: u64,
    gas_price: U256,
    gas: u64,
    to: Option<Address>,
    value: U256,
    data: Vec<u8>,
    from: Address,
    hash: H256,
}

struct Outcome {
    success: bool,
    gas_used: u64,
    created: Option<Address>,
    logs: Vec<(Address, Vec<H256>, Vec<u8>)>,
}

pub struct FakeNode {
    chain: Mutex<Chain>,
}

pub fn bytecode(text: &str) -> Vec<u8> {
    let text = text.trim();
    hex::decode(text.strip_prefix("0x").unwrap_or(text)).unwrap()
}

fn word(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

fn block_hash(number: u64, transactions: &[H256]) -> H256 {
    let mut seed = number.to_be_bytes().to_vec();
    for tx in transactions {
        seed.extend_from_slice(tx.as_bytes());
    }
    keccak256(&seed)
}

fn rpc_error(code: i64, message: &str) -> SdkError {
    SdkError::Rpc {
        code,
        message: message.to_string(),
    }
}

fn param_str(params: &[Value], index: usize) -> Result<&str, SdkError> {
    params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| rpc_error(-32602, "invalid params"))
}

fn param_address(params: &[Value], index: usize) -> Result<Address, SdkError> {
    Address::from_hex(param_str(params, index)?).map_err(|e| rpc_error(-32602, &e.to_string()))
}

fn param_hash(params: &[Value], index: usize) -> Result<H256, SdkError> {
    H256::from_hex(param_str(params, index)?).map_err(|e| rpc_error(-32602, &e.to_string()))
}

fn decode_raw(raw: &[u8]) -> Result<RawTx, SdkError> {
    let bad = |e: rlp::DecoderError| rpc_error(-32602, &format!("bad transaction: {}", e));
    let rlp = rlp::Rlp::new(raw);
    let nonce: u64 = rlp.val_at(0).map_err(bad)?;
    let gas_price = U256::from_big_endian(&rlp.val_at::<Vec<u8>>(1).map_err(bad)?);
    let gas: u64 = rlp.val_at(2).map_err(bad)?;
    let to_bytes: Vec<u8> = rlp.val_at(3).map_err(bad)?;
    let value = U256::from_big_endian(&rlp.val_at::<Vec<u8>>(4).map_err(bad)?);
    let data: Vec<u8> = rlp.val_at(5).map_err(bad)?;
    let v: u64 = rlp.val_at(6).map_err(bad)?;
    let r = U256::from_big_endian(&rlp.val_at::<Vec<u8>>(7).map_err(bad)?);
    let s = U256::from_big_endian(&rlp.val_at::<Vec<u8>>(8).map_err(bad)?);

    let to = if to_bytes.is_empty() {
        None
    } else {
        Some(Address::from_slice(&to_bytes).map_err(|e| rpc_error(-32602, &e.to_string()))?)
    };

    let chain_id = v
        .checked_sub(35)
        .map(|x| x / 2)
        .ok_or_else(|| rpc_error(-32000, "pre-EIP-155 transactions are not accepted"))?;
    if chain_id != CHAIN_ID {
        return Err(rpc_error(-32000, "invalid chain id"));
    }
    let recovery_id = (v - 35 - 2 * CHAIN_ID) as u8;

    let mut builder = TxBuilder::new(CHAIN_ID)
        .nonce(nonce)
        .gas_limit(gas)
        .gas_price(gas_price)
        .value(value)
        .data(data.clone());
    if let Some(to) = to {
        builder = builder.to(to);
    }
    let signing_hash = builder.signing_hash()?;
    let signature = Signature {
        r: word(r),
        s: word(s),
        recovery_id,
    };
    let from = recover_address(&signing_hash, &signature)
        .map_err(|e| rpc_error(-32000, &format!("invalid signature: {}", e)))?;

    Ok(RawTx {
        nonce,
        gas_price,
        gas,
        to,
        value,
        data,
        from,
        hash: keccak256(raw),
    })
}

impl FakeNode {
    /// Node with genesis plus two empty blocks and a funded `faith` account
    pub fn new() -> Self {
        Self::with_faults(&[])
    }

    pub fn with_faults(faults: &[Fault]) -> Self {
        let faith = Address::from_hex(FAITH).unwrap();
        let mut balances = HashMap::new();
        balances.insert(faith, U256::exp10(24));

        let mut chain = Chain {
            balances,
            nonces: HashMap::new(),
            contracts: HashMap::new(),
            blocks: Vec::new(),
            receipts: HashMap::new(),
            faults: faults.to_vec(),
        };
        let genesis_timestamp = if chain.faults.contains(&Fault::GenesisTimestamp) { 1 } else { 0 };
        chain.blocks.push(Block {
            number: 0,
            hash: block_hash(0, &[]),
            parent_hash: H256::ZERO,
            timestamp: genesis_timestamp,
            gas_used: 0,
            bloom: Bloom::EMPTY,
            transactions: Vec::new(),
        });
        chain.seal(0, Bloom::EMPTY, Vec::new());
        chain.seal(0, Bloom::EMPTY, Vec::new());

        Self {
            chain: Mutex::new(chain),
        }
    }

    pub fn head(&self) -> u64 {
        self.chain.lock().blocks.len() as u64 - 1
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.chain.lock().nonces.get(address).copied().unwrap_or_default()
    }

    fn handle(&self, method: &str, params: &[Value]) -> Result<Value, SdkError> {
        let mut chain = self.chain.lock();
        match method {
            "eth_chainId" => Ok(json!(hex_u64(CHAIN_ID))),
            "eth_gasPrice" => Ok(json!(hex_u64(GAS_PRICE))),
            "eth_blockNumber" => Ok(json!(hex_u64(chain.blocks.len() as u64 - 1))),
            "eth_getBalance" => {
                let address = param_address(params, 0)?;
                let mut balance = chain.balances.get(&address).copied().unwrap_or_default();
                let faith = Address::from_hex(FAITH).unwrap();
                if chain.faults.contains(&Fault::InflatedCredit) && address != faith && !balance.is_zero() {
                    balance += U256::one();
                }
                let untouched = !chain.nonces.contains_key(&faith);
                if chain.faults.contains(&Fault::UnderReportedSender) && address == faith && untouched {
                    balance = U256::from(0x201);
                }
                Ok(json!(format_u256(&balance)))
            }
            "eth_getTransactionCount" => {
                let address = param_address(params, 0)?;
                Ok(json!(hex_u64(chain.nonces.get(&address).copied().unwrap_or_default())))
            }
            "eth_getCode" => {
                let address = param_address(params, 0)?;
                let code = chain
                    .contracts
                    .get(&address)
                    .map(|c| c.code.to_vec())
                    .unwrap_or_default();
                Ok(json!(hex_bytes(&code)))
            }
            "eth_getBlockByNumber" => {
                let index = chain.block_index(params.first())?;
                Ok(index.map(|i| chain.block_json(i)).unwrap_or(Value::Null))
            }
            "eth_getBlockByHash" => {
                let hash = param_hash(params, 0)?;
                let index = chain.blocks.iter().position(|b| b.hash == hash);
                Ok(index.map(|i| chain.block_json(i)).unwrap_or(Value::Null))
            }
            "eth_getBlockTransactionCountByHash" => {
                let hash = param_hash(params, 0)?;
                Ok(chain
                    .blocks
                    .iter()
                    .find(|b| b.hash == hash)
                    .map(|b| json!(hex_u64(b.transactions.len() as u64)))
                    .unwrap_or(Value::Null))
            }
            "eth_getUncleByBlockNumberAndIndex" => Ok(Value::Null),
            "eth_getTransactionReceipt" => {
                let hash = param_hash(params, 0)?;
                let never = chain.faults.contains(&Fault::NeverMine);
                match chain.receipts.get_mut(&hash) {
                    Some(_) if never => Ok(Value::Null),
                    Some((pending, _)) if *pending > 0 => {
                        *pending -= 1;
                        Ok(Value::Null)
                    }
                    Some((_, receipt)) => Ok(receipt.clone()),
                    None => Ok(Value::Null),
                }
            }
            "eth_sendRawTransaction" => {
                let raw = bytecode(param_str(params, 0)?);
                let tx = decode_raw(&raw)?;
                let hash = chain.execute(tx)?;
                if chain.faults.contains(&Fault::WrongTxHash) {
                    Ok(json!(H256::from_bytes([0x11; 32]).to_hex()))
                } else {
                    Ok(json!(hash.to_hex()))
                }
            }
            "eth_call" => {
                let request = params.first().ok_or_else(|| rpc_error(-32602, "missing call"))?;
                let to = request
                    .get("to")
                    .and_then(Value::as_str)
                    .ok_or_else(|| rpc_error(-32602, "missing to"))?;
                let to = Address::from_hex(to).map_err(|e| rpc_error(-32602, &e.to_string()))?;
                let data = request
                    .get("data")
                    .and_then(Value::as_str)
                    .map(bytecode)
                    .unwrap_or_default();
                let output = chain.call(&to, &data)?;
                Ok(json!(hex_bytes(&output)))
            }
            _ => Err(rpc_error(-32601, &format!("method not found: {}", method))),
        }
    }
}

impl Default for FakeNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for FakeNode {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        self.handle(method, &params)
    }
}

impl Chain {
    fn seal(&mut self, gas_used: u64, bloom: Bloom, transactions: Vec<H256>) -> H256 {
        let number = self.blocks.len() as u64;
        let parent_hash = self.blocks.last().map(|b| b.hash).unwrap_or(H256::ZERO);
        let hash = block_hash(number, &transactions);
        self.blocks.push(Block {
            number,
            hash,
            parent_hash,
            timestamp: number * 6,
            gas_used,
            bloom,
            transactions,
        });
        hash
    }

    fn block_index(&self, tag: Option<&Value>) -> Result<Option<usize>, SdkError> {
        let tag = tag.and_then(Value::as_str).unwrap_or("latest");
        let last = self.blocks.len() - 1;
        Ok(match tag {
            "latest" | "pending" | "safe" | "finalized" => Some(last),
            "earliest" => Some(0),
            quantity => {
                let number = u64::from_str_radix(quantity.trim_start_matches("0x"), 16)
                    .map_err(|e| rpc_error(-32602, &e.to_string()))?;
                let index = number as usize;
                (index <= last).then_some(index)
            }
        })
    }

    fn block_json(&self, index: usize) -> Value {
        let block = &self.blocks[index];
        let tx_root = if block.transactions.is_empty() {
            EMPTY_TRIE_ROOT.to_string()
        } else {
            block_hash(u64::MAX, &block.transactions).to_hex()
        };
        json!({
            "number": hex_u64(block.number),
            "hash": block.hash.to_hex(),
            "parentHash": block.parent_hash.to_hex(),
            "nonce": "0x0000000000000000",
            "sha3Uncles": EMPTY_OMMERS_HASH,
            "logsBloom": block.bloom.to_hex(),
            "transactionsRoot": tx_root,
            "stateRoot": keccak256(block.hash.as_bytes()).to_hex(),
            "receiptsRoot": tx_root,
            "miner": Address::ZERO.to_hex(),
            "difficulty": "0x0",
            "totalDifficulty": "0x0",
            "extraData": "0x",
            "size": "0x220",
            "gasLimit": hex_u64(BLOCK_GAS_LIMIT),
            "gasUsed": hex_u64(block.gas_used),
            "timestamp": hex_u64(block.timestamp),
            "transactions": block.transactions.iter().map(|h| h.to_hex()).collect::<Vec<_>>(),
            "uncles": [],
        })
    }

    fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, SdkError> {
        let reverted = || rpc_error(3, "execution reverted");
        let contract = self.contracts.get(to).ok_or_else(reverted)?;
        let selector = data.get(..4).ok_or_else(reverted)?;
        match (&contract.program, selector) {
            (Program::Incrementer { number }, [0x83, 0x81, 0xf5, 0x8a]) => Ok(word(*number).to_vec()),
            (Program::Opcodes { .. }, [0xf8, 0xa8, 0xfd, 0x6d]) => Ok(word(U256::from(42)).to_vec()),
            (Program::Opcodes { .. }, [0x55, 0x31, 0x3d, 0xea]) => Ok(Vec::new()),
            (Program::Opcodes { value }, [0x3f, 0xa4, 0xf2, 0x45]) => Ok(word(*value).to_vec()),
            (Program::Opcodes { .. }, [0xb9, 0xd1, 0xe5, 0xaa]) => {
                Err(rpc_error(-32015, "invalid opcode: INVALID"))
            }
            _ => Err(reverted()),
        }
    }

    fn execute(&mut self, tx: RawTx) -> Result<H256, SdkError> {
        let expected_nonce = self.nonces.get(&tx.from).copied().unwrap_or_default();
        if tx.nonce != expected_nonce {
            return Err(rpc_error(-32000, "invalid nonce"));
        }
        let max_fee = tx.gas_price * U256::from(tx.gas) + tx.value;
        let balance = self.balances.get(&tx.from).copied().unwrap_or_default();
        if balance < max_fee {
            return Err(rpc_error(-32000, "insufficient funds for gas * price + value"));
        }

        let outcome = match tx.to {
            None => self.create(&tx),
            Some(to) if self.contracts.contains_key(&to) => self.invoke(&tx, to),
            Some(_) => Outcome {
                success: true,
                gas_used: 21_000,
                created: None,
                logs: Vec::new(),
            },
        };

        let charged = outcome.gas_used + u64::from(self.faults.contains(&Fault::Overcharge));
        let fee = tx.gas_price * U256::from(charged);
        let moved = if outcome.success { tx.value } else { U256::zero() };
        *self.balances.entry(tx.from).or_default() = balance - fee - moved;
        if let Some(to) = tx.to {
            *self.balances.entry(to).or_default() += moved;
        }
        self.nonces.insert(tx.from, tx.nonce + 1);

        let drop_logs = self.faults.contains(&Fault::DropLogs);
        let logs = if drop_logs { Vec::new() } else { outcome.logs };
        let mut bloom = Bloom::EMPTY;
        for (address, topics, _) in &logs {
            bloom.accrue(address.as_bytes());
            for topic in topics {
                bloom.accrue(topic.as_bytes());
            }
        }

        let log_objects: Vec<Value> = logs
            .iter()
            .enumerate()
            .map(|(i, (address, topics, data))| {
                json!({
                    "address": address.to_hex(),
                    "topics": topics.iter().map(|t| t.to_hex()).collect::<Vec<_>>(),
                    "data": hex_bytes(data),
                    "blockNumber": hex_u64(self.blocks.len() as u64),
                    "transactionHash": tx.hash.to_hex(),
                    "logIndex": hex_u64(i as u64),
                    "removed": false,
                })
            })
            .collect();
        let status = if outcome.success { "0x1" } else { "0x0" };

        let number = self.blocks.len() as u64;
        let block_hash = self.seal(outcome.gas_used, bloom, vec![tx.hash]);
        let receipt = json!({
            "transactionHash": tx.hash.to_hex(),
            "transactionIndex": "0x0",
            "blockHash": block_hash.to_hex(),
            "blockNumber": hex_u64(number),
            "from": tx.from.to_hex(),
            "to": tx.to.map(|a| a.to_hex()),
            "cumulativeGasUsed": hex_u64(outcome.gas_used),
            "gasUsed": hex_u64(outcome.gas_used),
            "contractAddress": outcome.created.map(|a| a.to_hex()),
            "logs": log_objects,
            "logsBloom": bloom.to_hex(),
            "status": status,
        });
        // first lookup sees nothing yet
        self.receipts.insert(tx.hash, (1, receipt));
        Ok(tx.hash)
    }

    fn create(&mut self, tx: &RawTx) -> Outcome {
        let address = contract_address(&tx.from, tx.nonce);
        let incrementer = bytecode(INCREMENTER_HEX);
        let opcodes = bytecode(OPCODES_HEX);

        let deployed = if tx.data.starts_with(&incrementer) {
            let initial = tx
                .data
                .get(incrementer.len()..incrementer.len() + 32)
                .map(U256::from_big_endian)
                .unwrap_or_default();
            Some(Deployed {
                code: Bytes::copy_from_slice(&incrementer[0x5b..0x5b + 0x131]),
                program: Program::Incrementer { number: initial },
            })
        } else if tx.data.starts_with(&opcodes) {
            Some(Deployed {
                code: Bytes::copy_from_slice(&opcodes[16..]),
                program: Program::Opcodes {
                    value: U256::from(7),
                },
            })
        } else {
            None
        };

        match deployed {
            Some(deployed) => {
                self.contracts.insert(address, deployed);
                Outcome {
                    success: true,
                    gas_used: 180_000,
                    created: Some(address),
                    logs: Vec::new(),
                }
            }
            None => Outcome {
                success: false,
                gas_used: tx.gas,
                created: None,
                logs: Vec::new(),
            },
        }
    }

    fn invoke(&mut self, tx: &RawTx, to: Address) -> Outcome {
        let commit_on_abort = self.faults.contains(&Fault::CommitOnAbort);
        let failed = |gas_used| Outcome {
            success: false,
            gas_used,
            created: None,
            logs: Vec::new(),
        };
        let Some(contract) = self.contracts.get_mut(&to) else {
            return failed(tx.gas);
        };
        let selector: [u8; 4] = match tx.data.get(..4).and_then(|s| s.try_into().ok()) {
            Some(selector) => selector,
            None => return failed(23_000),
        };

        match (&mut contract.program, selector) {
            (Program::Incrementer { number }, [0x7c, 0xf5, 0xda, 0xb0]) => {
                let amount = tx
                    .data
                    .get(4..36)
                    .map(U256::from_big_endian)
                    .unwrap_or_default();
                *number += amount;
                let increment_topic = keccak256(b"Increment(address,uint256)");
                let mut sender = [0u8; 32];
                sender[12..].copy_from_slice(tx.from.as_bytes());
                Outcome {
                    success: true,
                    gas_used: 28_000,
                    created: None,
                    logs: vec![(
                        to,
                        vec![increment_topic, H256::from_bytes(sender)],
                        word(amount).to_vec(),
                    )],
                }
            }
            (Program::Incrementer { number }, [0xd8, 0x26, 0xf0, 0x8f]) => {
                *number = U256::zero();
                Outcome {
                    success: true,
                    gas_used: 14_000,
                    created: None,
                    logs: Vec::new(),
                }
            }
            (Program::Opcodes { value }, [0xb9, 0xd1, 0xe5, 0xaa]) => {
                if commit_on_abort {
                    *value = U256::one();
                }
                failed(tx.gas)
            }
            (Program::Opcodes { value }, [0x6d, 0x3d, 0x14, 0x16]) => {
                if commit_on_abort {
                    *value = U256::one();
                }
                failed(26_000)
            }
            _ => failed(23_000),
        }
    }
}

/// Fixtures matching the fake node's chain
pub fn fixtures() -> Arc<FixtureRegistry> {
    let builder = FixtureRegistry::builder()
        .account("faith", FAITH_KEY, Some(FAITH))
        .constant(constants::CHAIN_ID, CHAIN_ID)
        .constant(constants::BLOCK_GAS_LIMIT, BLOCK_GAS_LIMIT)
        .constant(constants::BLOCK_TIME_SECS, 6u64)
        .constant(constants::DEFAULT_GAS, DEFAULT_GAS)
        .constant(constants::GAS_PRICE, GAS_PRICE)
        .constant(constants::SENDER, "faith");
    Arc::new(conform_suite::contracts::register(builder).build().unwrap())
}

/// Runner over `node` with quick polling
pub fn runner(node: Arc<FakeNode>) -> Runner {
    let config = RunnerConfig {
        step_timeout: Duration::from_secs(5),
        poll: PollPolicy {
            timeout: Duration::from_secs(2),
            initial_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(20),
            multiplier: 2,
        },
        ..RunnerConfig::default()
    };
    Runner::new(RpcClient::new(node), fixtures(), config)
}
