//! Block RPC conformance

use conform_harness::assertions::{
    assert_compare, assert_empty, assert_equal, assert_hex_len, assert_none, assert_not_equal,
    assert_some, CompareOp,
};
use conform_harness::fixtures::constants;
use conform_harness::{Scenario, Step, StepError, StepScope};
use conform_primitives::{Address, H256, U256};
use conform_sdk::types::{BlockId, RpcBlock};
use conform_sdk::Bloom;
use serde_json::Value;

/// Root of an empty Merkle-Patricia trie
pub const EMPTY_TRIE_ROOT: &str =
    "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421";

/// keccak-256 of the RLP encoding of an empty uncle list
pub const EMPTY_OMMERS_HASH: &str =
    "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347";

/// Scenario name
pub const NAME: &str = "block";

/// Block queries: head, lookups by hash and number, genesis values, tags
pub fn scenario() -> Scenario {
    Scenario::new(NAME)
        .describe("block number, lookups by hash/number/tag and genesis block values")
        .step(Step::new("block number is not zero", |s| Box::pin(head_not_zero(s))))
        .step(Step::new("get block by hash", |s| Box::pin(by_hash(s))))
        .step(Step::new("get block by number", |s| Box::pin(by_number(s))))
        .step(Step::new("genesis block", |s| Box::pin(genesis(s))))
        .step(Step::new("parent hash links blocks", |s| Box::pin(parent_link(s))))
        .step(
            Step::new("block time spacing", |s| Box::pin(block_time(s)))
                .skip("timestamps are not spaced by the block time on the target chain"),
        )
        .step(Step::new("tagged blocks", |s| Box::pin(tagged(s))))
        .step(Step::new("unknown block has no transaction count", |s| {
            Box::pin(unknown_block_count(s))
        }))
        .step(Step::new("missing uncle is null", |s| Box::pin(missing_uncle(s))))
}

async fn fetch(scope: &StepScope, block: BlockId) -> Result<RpcBlock, StepError> {
    scope
        .client()
        .get_block(block, false)
        .await?
        .ok_or_else(|| StepError::Other(format!("node returned no block for {:?}", block)))
}

async fn head_not_zero(scope: &mut StepScope) -> Result<(), StepError> {
    let head = scope.client().block_number().await?;
    scope.require(assert_compare("block number", U256::from(head), CompareOp::Gt, U256::zero()))
}

async fn by_hash(scope: &mut StepScope) -> Result<(), StepError> {
    let latest = fetch(scope, BlockId::Latest).await?;
    let hash = latest
        .hash
        .ok_or_else(|| StepError::Other("latest block has no hash".into()))?;
    let block = fetch(scope, BlockId::Hash(hash)).await?;
    scope.require(assert_equal("block hash", &block.hash, &Some(hash)))
}

async fn by_number(scope: &mut StepScope) -> Result<(), StepError> {
    let block = fetch(scope, BlockId::Number(1)).await?;
    scope.require(assert_some("block number", &block.number))
}

async fn genesis(scope: &mut StepScope) -> Result<(), StepError> {
    let gas_limit = scope.fixtures().constant_u64(constants::BLOCK_GAS_LIMIT)?;
    let empty_trie = H256::from_hex(EMPTY_TRIE_ROOT).map_err(|e| StepError::Other(e.to_string()))?;
    let empty_ommers =
        H256::from_hex(EMPTY_OMMERS_HASH).map_err(|e| StepError::Other(e.to_string()))?;
    let block = fetch(scope, BlockId::Number(0)).await?;

    scope.check(assert_equal("number", &block.number, &Some(0)));
    scope.check(assert_equal("miner", &block.beneficiary(), &Some(Address::ZERO)));
    scope.check(assert_equal("difficulty", &block.difficulty.unwrap_or_default(), &U256::zero()));
    scope.check(assert_empty("extraData", &block.extra_data));
    scope.check(assert_equal("gasLimit", &block.gas_limit, &gas_limit));
    scope.check(assert_equal("gasUsed", &block.gas_used, &0));
    scope.check(assert_equal(
        "logsBloom",
        &block.logs_bloom.unwrap_or(Bloom::EMPTY),
        &Bloom::EMPTY,
    ));
    scope.check(assert_equal("receiptsRoot", &block.receipts_root, &empty_trie));
    scope.check(assert_equal("transactionsRoot", &block.transactions_root, &empty_trie));
    scope.check(assert_equal("timestamp", &block.timestamp, &0));
    scope.check(assert_equal(
        "nonce",
        &block.nonce.as_deref(),
        &Some("0x0000000000000000"),
    ));
    scope.check(assert_empty("transactions", &block.transactions.hashes()));
    scope.check(assert_empty("uncles", &block.uncles));
    scope.check(assert_equal("sha3Uncles", &block.sha3_uncles, &empty_ommers));
    scope.check(assert_equal("parentHash", &block.parent_hash, &H256::ZERO));

    // hash widths are checked on the node's own text
    let raw = scope
        .client()
        .raw_request(
            "eth_getBlockByNumber",
            vec![Value::String("0x0".into()), Value::Bool(false)],
        )
        .await?;
    for field in ["hash", "parentHash"] {
        let text = raw.get(field).and_then(Value::as_str).unwrap_or_default();
        scope.check(assert_hex_len(field, text, 66));
    }
    Ok(())
}

async fn parent_link(scope: &mut StepScope) -> Result<(), StepError> {
    let latest = fetch(scope, BlockId::Latest).await?;
    let number = latest
        .number
        .ok_or_else(|| StepError::Other("latest block has no number".into()))?;
    let previous = fetch(scope, BlockId::Number(number.saturating_sub(1))).await?;

    scope.check(assert_not_equal("hash", &latest.hash, &previous.hash));
    scope.require(assert_equal("parentHash", &Some(latest.parent_hash), &previous.hash))
}

async fn block_time(scope: &mut StepScope) -> Result<(), StepError> {
    let block_time = scope.fixtures().constant_u64(constants::BLOCK_TIME_SECS)?;
    let latest = fetch(scope, BlockId::Latest).await?;
    let number = latest.number.unwrap_or_default();
    let previous = fetch(scope, BlockId::Number(number.saturating_sub(1))).await?;
    scope.require(assert_equal(
        "timestamp delta",
        &latest.timestamp.saturating_sub(previous.timestamp),
        &block_time,
    ))
}

async fn tagged(scope: &mut StepScope) -> Result<(), StepError> {
    let earliest = fetch(scope, BlockId::Earliest).await?;
    let latest = fetch(scope, BlockId::Latest).await?;
    scope.check(assert_equal("earliest number", &earliest.number, &Some(0)));
    scope.require(assert_compare(
        "latest number",
        U256::from(latest.number.unwrap_or_default()),
        CompareOp::Gt,
        U256::zero(),
    ))
}

async fn unknown_block_count(scope: &mut StepScope) -> Result<(), StepError> {
    let unknown = H256::from_bytes([0xff; 32]);
    let count = scope
        .client()
        .get_block_transaction_count_by_hash(&unknown)
        .await?;
    scope.require(assert_none("transaction count", &count))
}

async fn missing_uncle(scope: &mut StepScope) -> Result<(), StepError> {
    let uncle = scope
        .client()
        .get_uncle_by_block_number_and_index(BlockId::Number(0), 0)
        .await?;
    scope.require(assert_none("uncle", &uncle))
}
