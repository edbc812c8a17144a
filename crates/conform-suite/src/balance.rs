//! Balance accounting across a plain transfer

use conform_harness::assertions::{assert_compare, assert_equal, CompareOp};
use conform_harness::fixtures::constants;
use conform_harness::{Scenario, Step, StepError, StepScope, Verdict};
use conform_primitives::{Address, U256};
use conform_sdk::types::BlockId;

use crate::tx::{self, Outgoing};

/// Scenario name
pub const NAME: &str = "balance";

/// Wei moved by the transfer
pub const TRANSFER_VALUE: u64 = 0x200;

/// Gas charged for a plain value transfer
pub const TRANSFER_GAS: u64 = 21_000;

const INITIAL_BALANCE: &str = "initial_balance";
const RECIPIENT: &str = "recipient";
const GAS_USED: &str = "gas_used";

/// Sender pays `value + gasUsed * gasPrice`, recipient receives `value`
pub fn scenario() -> Scenario {
    Scenario::new(NAME)
        .describe("balances after a signed legacy transfer")
        .step(Step::new("sender has funds", |s| Box::pin(sender_has_funds(s))))
        .step(Step::new("transfer is mined", |s| Box::pin(transfer(s))))
        .step(Step::new("sender is debited", |s| Box::pin(sender_debited(s))))
        .step(Step::new("recipient is credited", |s| Box::pin(recipient_credited(s))))
}

async fn sender_has_funds(scope: &mut StepScope) -> Result<(), StepError> {
    let from = *tx::sender(scope)?.address();
    let balance = scope.client().get_balance(&from, BlockId::Latest).await?;
    scope.set(INITIAL_BALANCE, balance)?;
    scope.require(assert_compare(
        "sender balance",
        balance,
        CompareOp::Gt,
        U256::from(TRANSFER_VALUE),
    ))
}

async fn transfer(scope: &mut StepScope) -> Result<(), StepError> {
    let recipient = Address::from_bytes(rand::random());
    tracing::debug!(%recipient, "transfer recipient");
    scope.set(RECIPIENT, recipient)?;

    let receipt = tx::send(scope, Outgoing::transfer(recipient, U256::from(TRANSFER_VALUE))).await?;
    scope.set(GAS_USED, receipt.gas_used)?;

    scope.check(assert_equal("status", &receipt.succeeded(), &Some(true)));
    scope.require(assert_equal("gasUsed", &receipt.gas_used, &TRANSFER_GAS))
}

async fn sender_debited(scope: &mut StepScope) -> Result<(), StepError> {
    let initial: U256 = scope.get(INITIAL_BALANCE)?;
    let gas_used: u64 = scope.get(GAS_USED)?;
    let gas_price = scope.fixtures().constant_u64(constants::GAS_PRICE)?;
    let from = *tx::sender(scope)?.address();

    let fee = U256::from(gas_used).checked_mul(U256::from(gas_price));
    let expected = fee
        .and_then(|fee| initial.checked_sub(fee))
        .and_then(|rest| rest.checked_sub(U256::from(TRANSFER_VALUE)));
    let Some(expected) = expected else {
        return scope.require(Verdict::fail(
            "sender balance",
            format!("{} wei", initial),
            format!(">= {} + {} * {} wei", TRANSFER_VALUE, gas_used, gas_price),
            "expected balance underflows: initial balance cannot cover value and fee",
        ));
    };

    let balance = scope.client().get_balance(&from, BlockId::Latest).await?;
    scope.require(assert_compare("sender balance", balance, CompareOp::Eq, expected))
}

async fn recipient_credited(scope: &mut StepScope) -> Result<(), StepError> {
    let recipient: Address = scope.get(RECIPIENT)?;
    let balance = scope.client().get_balance(&recipient, BlockId::Latest).await?;
    scope.require(assert_compare(
        "recipient balance",
        balance,
        CompareOp::Eq,
        U256::from(TRANSFER_VALUE),
    ))
}
