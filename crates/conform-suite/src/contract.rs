//! Contract deployment, calls, transactions and log blooms

use conform_harness::assertions::{
    assert_bloom_contains, assert_compare, assert_equal, assert_matches, assert_some, CompareOp,
};
use conform_harness::{Scenario, Step, StepError, StepScope};
use conform_primitives::{Address, U256};
use conform_sdk::abi::Token;
use conform_sdk::types::{BlockId, RpcReceipt};
use conform_sdk::{Bloom, Contract};

use crate::contracts::INCREMENTER;
use crate::tx::{self, Outgoing};

/// Scenario name
pub const NAME: &str = "contract";

/// Constructor argument
pub const INITIAL_NUMBER: u64 = 5;

/// Argument of `increment`
pub const INCREMENT_BY: u64 = 3;

const ADDRESS: &str = "incrementer_address";
const INCREMENT_RECEIPT: &str = "increment_receipt";

/// Incrementer lifecycle: deploy, read, increment, check logs, reset
pub fn scenario() -> Scenario {
    Scenario::new(NAME)
        .describe("deploy the incrementer, call and transact against it, check log blooms")
        .step(Step::new("deploy contract", |s| Box::pin(deploy(s))))
        .step(Step::new("get contract code", |s| Box::pin(code(s))))
        .step(Step::new("get default number", |s| Box::pin(default_number(s))))
        .step(Step::new("increase number", |s| Box::pin(increment(s))))
        .step(Step::new("transaction bloom and block bloom", |s| Box::pin(blooms(s))))
        .step(Step::new("reset number", |s| Box::pin(reset(s))))
}

fn interface(scope: &StepScope) -> Result<Contract, StepError> {
    Ok(scope.fixtures().contract(INCREMENTER)?.interface())
}

async fn number(scope: &StepScope, address: Address) -> Result<U256, StepError> {
    let contract = interface(scope)?;
    tx::call_uint(scope, &contract, address, "number", &[]).await
}

async fn deploy(scope: &mut StepScope) -> Result<(), StepError> {
    let address = tx::deploy(scope, INCREMENTER, &[Token::Uint(U256::from(INITIAL_NUMBER))]).await?;
    scope.set(ADDRESS, address)
}

async fn code(scope: &mut StepScope) -> Result<(), StepError> {
    let address: Address = scope.get(ADDRESS)?;
    let fixtures = scope.fixtures().clone();
    let init = fixtures.contract(INCREMENTER)?.bytecode();
    let code = scope.client().get_code(&address, BlockId::Latest).await?;

    scope.check(assert_matches("code", &code, |c| !c.is_empty(), "non-empty code"));
    scope.require(assert_matches(
        "code",
        &code,
        |c| !c.is_empty() && init.windows(c.len()).any(|w| w == &c[..]),
        "runtime code embedded in the init bytecode",
    ))
}

async fn default_number(scope: &mut StepScope) -> Result<(), StepError> {
    let address: Address = scope.get(ADDRESS)?;
    let value = number(scope, address).await?;
    scope.require(assert_compare("number()", value, CompareOp::Eq, U256::from(INITIAL_NUMBER)))
}

async fn increment(scope: &mut StepScope) -> Result<(), StepError> {
    let address: Address = scope.get(ADDRESS)?;
    let data = interface(scope)?.encode_call("increment", &[Token::Uint(U256::from(INCREMENT_BY))])?;
    let receipt = tx::send(scope, Outgoing::call(address, data)).await?;
    scope.require(assert_equal("status", &receipt.succeeded(), &Some(true)))?;
    scope.set(INCREMENT_RECEIPT, receipt)?;

    let value = number(scope, address).await?;
    scope.require(assert_compare(
        "number()",
        value,
        CompareOp::Eq,
        U256::from(INITIAL_NUMBER + INCREMENT_BY),
    ))
}

fn check_bloom(scope: &mut StepScope, which: &str, bloom: &Bloom, receipt: &RpcReceipt) {
    for log in &receipt.logs {
        scope.check(assert_bloom_contains(
            &format!("{} bloom has log address", which),
            bloom,
            log.address.as_bytes(),
        ));
        for topic in &log.topics {
            scope.check(assert_bloom_contains(
                &format!("{} bloom has topic {}", which, topic),
                bloom,
                topic.as_bytes(),
            ));
        }
    }
}

async fn blooms(scope: &mut StepScope) -> Result<(), StepError> {
    let receipt: RpcReceipt = scope.get(INCREMENT_RECEIPT)?;
    let address: Address = scope.get(ADDRESS)?;
    let topic = interface(scope)?.event_topic("Increment")?;

    let first = receipt.logs.first().cloned();
    scope.require(assert_some("log", &first))?;
    if let Some(log) = first {
        scope.check(assert_equal("log address", &log.address, &address));
        scope.check(assert_equal("topic0", &log.topics.first(), &Some(&topic)));
    }

    check_bloom(scope, "receipt", &receipt.logs_bloom, &receipt);

    let block_hash = receipt
        .block_hash
        .ok_or_else(|| StepError::Other("receipt has no block hash".into()))?;
    let block = scope
        .client()
        .get_block(BlockId::Hash(block_hash), false)
        .await?
        .ok_or_else(|| StepError::Other(format!("block {} not found", block_hash)))?;
    let block_bloom = block.logs_bloom.unwrap_or(Bloom::EMPTY);
    check_bloom(scope, "block", &block_bloom, &receipt);
    Ok(())
}

async fn reset(scope: &mut StepScope) -> Result<(), StepError> {
    let address: Address = scope.get(ADDRESS)?;
    let data = interface(scope)?.encode_call("reset", &[])?;
    let receipt = tx::send(scope, Outgoing::call(address, data)).await?;
    scope.check(assert_equal("status", &receipt.succeeded(), &Some(true)));

    let value = number(scope, address).await?;
    scope.require(assert_compare("number()", value, CompareOp::Eq, U256::zero()))
}
