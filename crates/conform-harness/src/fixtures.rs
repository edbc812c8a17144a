//! Fixture registry: accounts, contracts and chain constants
//!
//! Everything is validated when the registry is built, so a malformed fixture
//! stops the run before any scenario starts. After that the registry is
//! read-only and shared behind an `Arc`.

use bytes::Bytes;
use conform_primitives::Address;
use conform_sdk::{Abi, Contract, SdkError, Wallet};
use std::collections::HashMap;
use zeroize::Zeroizing;

use crate::error::{FixtureError, FixtureKind};

/// Well-known constant names
pub mod constants {
    /// EIP-155 chain id
    pub const CHAIN_ID: &str = "chain_id";
    /// Gas limit of every block
    pub const BLOCK_GAS_LIMIT: &str = "block_gas_limit";
    /// Target seconds between blocks
    pub const BLOCK_TIME_SECS: &str = "block_time_secs";
    /// Gas limit for harness transactions
    pub const DEFAULT_GAS: &str = "default_gas";
    /// Gas price for harness transactions, in wei
    pub const GAS_PRICE: &str = "gas_price";
    /// Name of the account fixture that signs transactions
    pub const SENDER: &str = "sender";
}

/// Pre-funded account
pub struct AccountFixture {
    name: String,
    address: Address,
    private_key: Zeroizing<String>,
}

impl AccountFixture {
    /// Fixture name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Account address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signing wallet for this account
    pub fn wallet(&self) -> Result<Wallet, SdkError> {
        Wallet::from_private_key_hex(&self.private_key)
    }
}

impl std::fmt::Debug for AccountFixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountFixture")
            .field("name", &self.name)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Precompiled contract
#[derive(Debug, Clone)]
pub struct ContractFixture {
    name: String,
    bytecode: Bytes,
    abi: Abi,
}

impl ContractFixture {
    /// Fixture name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation bytecode
    pub fn bytecode(&self) -> &Bytes {
        &self.bytecode
    }

    /// Parsed ABI
    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// Call encoder/decoder for this contract
    pub fn interface(&self) -> Contract {
        Contract::from_abi(self.abi.clone())
    }
}

/// Chain constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantValue {
    /// Integer constant
    U64(u64),
    /// Free-form text (URLs, names)
    Text(String),
}

impl From<u64> for ConstantValue {
    fn from(v: u64) -> Self {
        ConstantValue::U64(v)
    }
}

impl From<&str> for ConstantValue {
    fn from(v: &str) -> Self {
        ConstantValue::Text(v.to_string())
    }
}

impl From<String> for ConstantValue {
    fn from(v: String) -> Self {
        ConstantValue::Text(v)
    }
}

struct PendingAccount {
    name: String,
    private_key: Zeroizing<String>,
    declared: Option<String>,
}

struct PendingContract {
    name: String,
    bytecode: String,
    abi: String,
}

/// Collects raw fixtures; [`build`](Self::build) validates them all
#[derive(Default)]
pub struct FixtureRegistryBuilder {
    accounts: Vec<PendingAccount>,
    contracts: Vec<PendingContract>,
    constants: Vec<(String, ConstantValue)>,
}

impl FixtureRegistryBuilder {
    /// Add an account; when `address` is given the key must derive it
    pub fn account(
        mut self,
        name: impl Into<String>,
        private_key: impl Into<String>,
        address: Option<&str>,
    ) -> Self {
        self.accounts.push(PendingAccount {
            name: name.into(),
            private_key: Zeroizing::new(private_key.into()),
            declared: address.map(str::to_string),
        });
        self
    }

    /// Add a contract from hex bytecode and JSON ABI text
    pub fn contract(
        mut self,
        name: impl Into<String>,
        bytecode_hex: impl Into<String>,
        abi_json: impl Into<String>,
    ) -> Self {
        self.contracts.push(PendingContract {
            name: name.into(),
            bytecode: bytecode_hex.into(),
            abi: abi_json.into(),
        });
        self
    }

    /// Add a chain constant
    pub fn constant(mut self, name: impl Into<String>, value: impl Into<ConstantValue>) -> Self {
        self.constants.push((name.into(), value.into()));
        self
    }

    /// Validate every fixture, failing on the first bad one
    pub fn build(self) -> Result<FixtureRegistry, FixtureError> {
        let mut registry = FixtureRegistry::default();

        for pending in self.accounts {
            let account = validate_account(pending)?;
            if registry.accounts.contains_key(&account.name) {
                return Err(duplicate(FixtureKind::Account, account.name));
            }
            registry.accounts.insert(account.name.clone(), account);
        }

        for pending in self.contracts {
            let contract = validate_contract(pending)?;
            if registry.contracts.contains_key(&contract.name) {
                return Err(duplicate(FixtureKind::Contract, contract.name));
            }
            registry.contracts.insert(contract.name.clone(), contract);
        }

        for (name, value) in self.constants {
            if registry.constants.contains_key(&name) {
                return Err(duplicate(FixtureKind::Constant, name));
            }
            registry.constants.insert(name, value);
        }

        tracing::debug!(
            accounts = registry.accounts.len(),
            contracts = registry.contracts.len(),
            constants = registry.constants.len(),
            "fixtures loaded"
        );
        Ok(registry)
    }
}

fn duplicate(kind: FixtureKind, name: String) -> FixtureError {
    FixtureError::Invalid {
        kind,
        name,
        reason: "defined more than once".to_string(),
    }
}

fn validate_account(pending: PendingAccount) -> Result<AccountFixture, FixtureError> {
    let invalid = |reason: String| FixtureError::Invalid {
        kind: FixtureKind::Account,
        name: pending.name.clone(),
        reason,
    };

    let wallet = Wallet::from_private_key_hex(&pending.private_key)
        .map_err(|e| invalid(e.to_string()))?;
    let address = *wallet.address();

    if let Some(declared) = &pending.declared {
        let declared = Address::from_hex(declared).map_err(|e| invalid(e.to_string()))?;
        if declared != address {
            return Err(invalid(format!(
                "private key derives {}, not the declared {}",
                address, declared
            )));
        }
    }

    Ok(AccountFixture {
        name: pending.name,
        address,
        private_key: pending.private_key,
    })
}

fn validate_contract(pending: PendingContract) -> Result<ContractFixture, FixtureError> {
    let invalid = |reason: String| FixtureError::Invalid {
        kind: FixtureKind::Contract,
        name: pending.name.clone(),
        reason,
    };

    let text = pending.bytecode.trim();
    let text = text.strip_prefix("0x").unwrap_or(text);
    if text.is_empty() {
        return Err(invalid("bytecode is empty".to_string()));
    }
    let bytecode = hex::decode(text).map_err(|e| invalid(format!("bytecode: {}", e)))?;
    let abi = Abi::from_json(&pending.abi).map_err(|e| invalid(format!("abi: {}", e)))?;

    Ok(ContractFixture {
        name: pending.name,
        bytecode: Bytes::from(bytecode),
        abi,
    })
}

/// Validated, read-only fixtures
#[derive(Debug, Default)]
pub struct FixtureRegistry {
    accounts: HashMap<String, AccountFixture>,
    contracts: HashMap<String, ContractFixture>,
    constants: HashMap<String, ConstantValue>,
}

impl FixtureRegistry {
    /// Start collecting fixtures
    pub fn builder() -> FixtureRegistryBuilder {
        FixtureRegistryBuilder::default()
    }

    /// Account by exact name
    pub fn account(&self, name: &str) -> Result<&AccountFixture, FixtureError> {
        self.accounts.get(name).ok_or_else(|| FixtureError::NotFound {
            kind: FixtureKind::Account,
            name: name.to_string(),
        })
    }

    /// Contract by exact name
    pub fn contract(&self, name: &str) -> Result<&ContractFixture, FixtureError> {
        self.contracts.get(name).ok_or_else(|| FixtureError::NotFound {
            kind: FixtureKind::Contract,
            name: name.to_string(),
        })
    }

    /// Constant by exact name
    pub fn constant(&self, name: &str) -> Result<&ConstantValue, FixtureError> {
        self.constants.get(name).ok_or_else(|| FixtureError::NotFound {
            kind: FixtureKind::Constant,
            name: name.to_string(),
        })
    }

    /// Integer constant by exact name
    pub fn constant_u64(&self, name: &str) -> Result<u64, FixtureError> {
        match self.constant(name)? {
            ConstantValue::U64(v) => Ok(*v),
            ConstantValue::Text(_) => Err(FixtureError::Invalid {
                kind: FixtureKind::Constant,
                name: name.to_string(),
                reason: "not an integer".to_string(),
            }),
        }
    }

    /// Text constant by exact name
    pub fn constant_text(&self, name: &str) -> Result<&str, FixtureError> {
        match self.constant(name)? {
            ConstantValue::Text(v) => Ok(v),
            ConstantValue::U64(_) => Err(FixtureError::Invalid {
                kind: FixtureKind::Constant,
                name: name.to_string(),
                reason: "not text".to_string(),
            }),
        }
    }

    /// Names of all accounts, sorted
    pub fn account_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.accounts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
