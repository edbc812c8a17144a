//! Harness configuration
//!
//! Read from `--config <path>`, else `~/.conform/config.toml`, else built-in
//! defaults that target a local development node.

use conform_harness::fixtures::constants;
use conform_harness::{FixtureRegistry, PollPolicy, RunnerConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::CliError;

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Account that signs transactions
    #[serde(default = "default_sender")]
    pub sender: String,
    /// Chain parameters
    #[serde(default)]
    pub chain: ChainConfig,
    /// Runner settings
    #[serde(default)]
    pub runner: RunnerSection,
    /// Receipt polling
    #[serde(default)]
    pub finality: FinalityConfig,
    /// Pre-funded accounts by name
    #[serde(default = "default_accounts")]
    pub accounts: BTreeMap<String, AccountConfig>,
}

/// `[chain]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// EIP-155 chain id
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Gas limit of every block
    #[serde(default = "default_block_gas_limit")]
    pub block_gas_limit: u64,
    /// Seconds between blocks
    #[serde(default = "default_block_time_secs")]
    pub block_time_secs: u64,
    /// Gas limit of harness transactions
    #[serde(default = "default_gas")]
    pub default_gas: u64,
    /// Gas price of harness transactions, in wei
    #[serde(default = "default_gas_price")]
    pub gas_price: u64,
}

/// `[runner]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSection {
    /// Step timeout
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    /// Optional ceiling per scenario
    #[serde(default)]
    pub scenario_timeout_secs: Option<u64>,
    /// Scenarios running at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Scenario names never to run
    #[serde(default)]
    pub skip: Vec<String>,
}

/// `[finality]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalityConfig {
    /// Give up waiting after this long
    #[serde(default = "default_finality_timeout_secs")]
    pub timeout_secs: u64,
    /// First poll delay
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,
    /// Largest poll delay
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    /// Delay growth per poll
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

/// `[accounts.<name>]`
#[derive(Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Expected address; checked against the key when given
    #[serde(default)]
    pub address: Option<String>,
    /// Hex private key
    pub private_key: String,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Development account pre-funded in the target chain's genesis
pub const FAITH: &str = "faith";
const FAITH_ADDRESS: &str = "0xC0F0f4ab324C46e55D02D0033343B4Be8A55532d";
const FAITH_KEY: &str = "0xb9d2ea9a615f3165812e8d44de0d24da9bbd164b65c4f0573e1ce2c8dbd9c8df";

fn default_rpc_url() -> String {
    "http://127.0.0.1:9933".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_sender() -> String {
    FAITH.to_string()
}

fn default_chain_id() -> u64 {
    43
}

fn default_block_gas_limit() -> u64 {
    9_375_000
}

fn default_block_time_secs() -> u64 {
    12
}

fn default_gas() -> u64 {
    4_000_000
}

fn default_gas_price() -> u64 {
    1_000_000_000
}

fn default_step_timeout_secs() -> u64 {
    60
}

fn default_max_concurrency() -> usize {
    1
}

fn default_finality_timeout_secs() -> u64 {
    60
}

fn default_initial_interval_ms() -> u64 {
    500
}

fn default_max_interval_ms() -> u64 {
    6_000
}

fn default_multiplier() -> u32 {
    2
}

fn default_accounts() -> BTreeMap<String, AccountConfig> {
    let mut accounts = BTreeMap::new();
    accounts.insert(
        FAITH.to_string(),
        AccountConfig {
            address: Some(FAITH_ADDRESS.to_string()),
            private_key: FAITH_KEY.to_string(),
        },
    );
    accounts
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            block_gas_limit: default_block_gas_limit(),
            block_time_secs: default_block_time_secs(),
            default_gas: default_gas(),
            gas_price: default_gas_price(),
        }
    }
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            step_timeout_secs: default_step_timeout_secs(),
            scenario_timeout_secs: None,
            max_concurrency: default_max_concurrency(),
            skip: Vec::new(),
        }
    }
}

impl Default for FinalityConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_finality_timeout_secs(),
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            request_timeout_secs: default_request_timeout_secs(),
            sender: default_sender(),
            chain: ChainConfig::default(),
            runner: RunnerSection::default(),
            finality: FinalityConfig::default(),
            accounts: default_accounts(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".conform"))
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Load `path`, or the default file when it exists, or the defaults
    ///
    /// An explicit path must exist; the default path may be missing.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse config text
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Runner settings
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            step_timeout: Duration::from_secs(self.runner.step_timeout_secs),
            scenario_timeout: self.runner.scenario_timeout_secs.map(Duration::from_secs),
            max_concurrency: self.runner.max_concurrency.max(1),
            skip: self.runner.skip.clone(),
            poll: PollPolicy {
                timeout: Duration::from_secs(self.finality.timeout_secs),
                initial_interval: Duration::from_millis(self.finality.initial_interval_ms),
                max_interval: Duration::from_millis(self.finality.max_interval_ms),
                multiplier: self.finality.multiplier,
            },
        }
    }

    /// Accounts, chain constants and built-in contracts, validated
    pub fn fixtures(&self) -> Result<FixtureRegistry, CliError> {
        if !self.accounts.contains_key(&self.sender) {
            return Err(CliError::InvalidInput(format!(
                "sender {:?} is not a configured account",
                self.sender
            )));
        }

        let mut builder = FixtureRegistry::builder();
        for (name, account) in &self.accounts {
            builder = builder.account(
                name.as_str(),
                account.private_key.as_str(),
                account.address.as_deref(),
            );
        }
        let builder = builder
            .constant(constants::CHAIN_ID, self.chain.chain_id)
            .constant(constants::BLOCK_GAS_LIMIT, self.chain.block_gas_limit)
            .constant(constants::BLOCK_TIME_SECS, self.chain.block_time_secs)
            .constant(constants::DEFAULT_GAS, self.chain.default_gas)
            .constant(constants::GAS_PRICE, self.chain.gas_price)
            .constant(constants::SENDER, self.sender.as_str());
        Ok(conform_suite::contracts::register(builder).build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.rpc_url, "http://127.0.0.1:9933");
        assert_eq!(config.chain.chain_id, 43);
        assert_eq!(config.chain.block_gas_limit, 9_375_000);
        assert_eq!(config.runner.max_concurrency, 1);
        assert_eq!(config.sender, FAITH);
        assert!(config.accounts.contains_key(FAITH));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            rpc_url = "http://node:8545"

            [chain]
            chain_id = 5

            [runner]
            skip = ["opcodes"]
            "#,
        )
        .unwrap();
        assert_eq!(config.rpc_url, "http://node:8545");
        assert_eq!(config.chain.chain_id, 5);
        assert_eq!(config.chain.gas_price, 1_000_000_000);
        assert_eq!(config.runner.skip, vec!["opcodes".to_string()]);
        assert_eq!(config.runner.step_timeout_secs, 60);
        assert_eq!(config.finality.multiplier, 2);
        assert!(config.accounts.contains_key(FAITH));
    }

    #[test]
    fn test_runner_config() {
        let mut config = Config::default();
        config.runner.scenario_timeout_secs = Some(300);
        config.runner.max_concurrency = 0;
        config.finality.initial_interval_ms = 250;

        let runner = config.runner_config();
        assert_eq!(runner.step_timeout, Duration::from_secs(60));
        assert_eq!(runner.scenario_timeout, Some(Duration::from_secs(300)));
        assert_eq!(runner.max_concurrency, 1);
        assert_eq!(runner.poll.initial_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_default_fixtures_validate() {
        let fixtures = Config::default().fixtures().unwrap();
        assert_eq!(fixtures.constant_u64(constants::CHAIN_ID).unwrap(), 43);
        assert_eq!(fixtures.constant_text(constants::SENDER).unwrap(), FAITH);
        assert_eq!(
            fixtures.account(FAITH).unwrap().address().to_hex().to_lowercase(),
            FAITH_ADDRESS.to_lowercase()
        );
        assert!(fixtures.contract(conform_suite::contracts::INCREMENTER).is_ok());
    }

    #[test]
    fn test_unknown_sender_rejected() {
        let config = Config {
            sender: "alice".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.fixtures(), Err(CliError::InvalidInput(_))));
    }

    #[test]
    fn test_mismatched_account_address_rejected() {
        let mut config = Config::default();
        config.accounts.insert(
            FAITH.to_string(),
            AccountConfig {
                address: Some("0x1111111111111111111111111111111111111111".to_string()),
                private_key: FAITH_KEY.to_string(),
            },
        );
        assert!(matches!(config.fixtures(), Err(CliError::Fixture(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "request_timeout_secs = 5\n[finality]\ntimeout_secs = 120").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.finality.timeout_secs, 120);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(CliError::ReadConfig { .. })));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(matches!(
            Config::from_toml("rpc_url = [1, 2"),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_account_debug_hides_key() {
        let account = &Config::default().accounts[FAITH];
        assert!(!format!("{:?}", account).contains("b9d2ea"));
    }
}
