//! Transaction and call helpers shared by the scenarios

use bytes::Bytes;
use conform_harness::assertions::assert_equal;
use conform_harness::fixtures::constants;
use conform_harness::{StepError, StepScope};
use conform_primitives::{Address, U256};
use conform_sdk::abi::Token;
use conform_sdk::types::{BlockId, CallRequest, RpcReceipt};
use conform_sdk::{contract_address, Contract, SignedTx, TxBuilder, Wallet};

/// Signing wallet of the configured sender account
pub fn sender(scope: &StepScope) -> Result<Wallet, StepError> {
    let fixtures = scope.fixtures();
    let name = fixtures.constant_text(constants::SENDER)?;
    Ok(fixtures.account(name)?.wallet()?)
}

/// What to send
#[derive(Debug, Clone, Default)]
pub struct Outgoing {
    /// Recipient; `None` creates a contract
    pub to: Option<Address>,
    /// Wei to transfer
    pub value: U256,
    /// Input data
    pub data: Bytes,
}

impl Outgoing {
    /// Contract creation with `data` as init code
    pub fn create(data: Bytes) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Call into `to` with `data`
    pub fn call(to: Address, data: Bytes) -> Self {
        Self {
            to: Some(to),
            data,
            ..Self::default()
        }
    }

    /// Plain value transfer
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to: Some(to),
            value,
            ..Self::default()
        }
    }
}

/// Sign `outgoing` with the fixture gas settings and the pending nonce
pub async fn sign(
    scope: &StepScope,
    wallet: &Wallet,
    outgoing: &Outgoing,
) -> Result<SignedTx, StepError> {
    let fixtures = scope.fixtures();
    let chain_id = fixtures.constant_u64(constants::CHAIN_ID)?;
    let gas = fixtures.constant_u64(constants::DEFAULT_GAS)?;
    let gas_price = fixtures.constant_u64(constants::GAS_PRICE)?;
    let nonce = scope
        .client()
        .get_transaction_count(wallet.address(), BlockId::Pending)
        .await?;

    let mut builder = TxBuilder::new(chain_id)
        .nonce(nonce)
        .gas_limit(gas)
        .gas_price(gas_price)
        .value(outgoing.value)
        .data(outgoing.data.clone());
    if let Some(to) = outgoing.to {
        builder = builder.to(to);
    }
    Ok(builder.sign(wallet)?)
}

/// Submit a signed transaction and wait until it is mined
///
/// The node must answer with the locally computed hash.
pub async fn submit(scope: &mut StepScope, tx: &SignedTx) -> Result<RpcReceipt, StepError> {
    let hash = scope.client().send_raw_transaction(tx.raw()).await?;
    scope.require(assert_equal("transaction hash", &hash, &tx.hash()))?;
    tracing::debug!(%hash, nonce = tx.nonce(), "transaction submitted");
    scope.await_receipt(&hash).await
}

/// Sign, submit and await in one go
pub async fn send(scope: &mut StepScope, outgoing: Outgoing) -> Result<RpcReceipt, StepError> {
    let wallet = sender(scope)?;
    let tx = sign(scope, &wallet, &outgoing).await?;
    submit(scope, &tx).await
}

/// Deploy the named contract fixture and return its address
///
/// The receipt must report success and the address derived from the sender
/// and nonce.
pub async fn deploy(
    scope: &mut StepScope,
    contract: &str,
    args: &[Token],
) -> Result<Address, StepError> {
    let fixtures = scope.fixtures().clone();
    let fixture = fixtures.contract(contract)?;
    let init = fixture.interface().encode_deploy(fixture.bytecode(), args)?;

    let wallet = sender(scope)?;
    let tx = sign(scope, &wallet, &Outgoing::create(init)).await?;
    let predicted = contract_address(wallet.address(), tx.nonce());
    let receipt = submit(scope, &tx).await?;

    scope.check(assert_equal("deploy status", &receipt.succeeded(), &Some(true)));
    scope.require(assert_equal(
        "contract address",
        &receipt.contract_address,
        &Some(predicted),
    ))?;
    tracing::info!(contract, address = %predicted, "contract deployed");
    Ok(predicted)
}

/// Read-only call returning the first output as an integer
pub async fn call_uint(
    scope: &StepScope,
    contract: &Contract,
    address: Address,
    function: &str,
    args: &[Token],
) -> Result<U256, StepError> {
    let data = contract.encode_call(function, args)?;
    let output = scope
        .client()
        .call(&CallRequest::new(address, data), BlockId::Latest)
        .await?;
    contract
        .decode_output(function, &output)?
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| StepError::Other(format!("{} returned no integer", function)))
}
