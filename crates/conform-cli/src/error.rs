//! CLI error types

use conform_harness::FixtureError;
use conform_sdk::SdkError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// Config file could not be read
    #[error("Cannot read config {path}: {source}")]
    ReadConfig {
        /// File that was read
        path: PathBuf,
        /// Underlying failure
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),

    /// Fixtures built from the config did not validate
    #[error("Fixture error: {0}")]
    Fixture(#[from] FixtureError),

    /// Transport could not be constructed
    #[error("SDK error: {0}")]
    Sdk(#[from] SdkError),

    /// `--scenario` named something the suite does not have
    #[error("Unknown scenario(s): {}", .0.join(", "))]
    UnknownScenario(Vec<String>),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
