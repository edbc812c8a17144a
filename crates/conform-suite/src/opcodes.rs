//! Halting opcodes: `STOP`, `INVALID`, `REVERT`

use conform_harness::assertions::{assert_compare, assert_empty, assert_equal, CompareOp};
use conform_harness::{Scenario, Step, StepError, StepScope};
use conform_primitives::{Address, U256};
use conform_sdk::types::{BlockId, CallRequest};
use conform_sdk::Contract;

use crate::contracts::OPCODES;
use crate::tx::{self, Outgoing};

/// Scenario name
pub const NAME: &str = "opcodes";

/// Value returned by `test()`
pub const TEST_RESULT: u64 = 42;

/// Slot 0 after construction
pub const STORED_VALUE: u64 = 7;

const ADDRESS: &str = "opcodes_address";

/// Aborting transactions are mined as failures and leave storage untouched
pub fn scenario() -> Scenario {
    Scenario::new(NAME)
        .describe("STOP, INVALID and REVERT through calls and transactions")
        .step(Step::new("deploy contract", |s| Box::pin(deploy(s))))
        .step(Step::new("opcodes work in calls", |s| Box::pin(calls(s))))
        .step(Step::new("invalid opcode fails the transaction", |s| {
            Box::pin(aborting(s, "test_invalid"))
        }))
        .step(Step::new("revert opcode fails the transaction", |s| {
            Box::pin(aborting(s, "test_revert"))
        }))
}

fn interface(scope: &StepScope) -> Result<Contract, StepError> {
    Ok(scope.fixtures().contract(OPCODES)?.interface())
}

async fn deploy(scope: &mut StepScope) -> Result<(), StepError> {
    let address = tx::deploy(scope, OPCODES, &[]).await?;
    scope.set(ADDRESS, address)
}

async fn calls(scope: &mut StepScope) -> Result<(), StepError> {
    let address: Address = scope.get(ADDRESS)?;
    let contract = interface(scope)?;

    let result = tx::call_uint(scope, &contract, address, "test", &[]).await?;
    scope.check(assert_compare("test()", result, CompareOp::Eq, U256::from(TEST_RESULT)));

    let data = contract.encode_call("test_stop", &[])?;
    let output = scope
        .client()
        .call(&CallRequest::new(address, data), BlockId::Latest)
        .await?;
    scope.require(assert_empty("test_stop() output", &output))
}

async fn aborting(scope: &mut StepScope, function: &'static str) -> Result<(), StepError> {
    let address: Address = scope.get(ADDRESS)?;
    let contract = interface(scope)?;
    let data = contract.encode_call(function, &[])?;

    let receipt = tx::send(scope, Outgoing::call(address, data)).await?;
    scope.check(assert_equal("status", &receipt.succeeded(), &Some(false)));

    let value = tx::call_uint(scope, &contract, address, "value", &[]).await?;
    scope.require(assert_compare(
        "value()",
        value,
        CompareOp::Eq,
        U256::from(STORED_VALUE),
    ))
}
