//! Harness error types

use conform_sdk::SdkError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Kind of fixture a lookup was for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureKind {
    /// Account (address + key)
    Account,
    /// Contract (bytecode + ABI)
    Contract,
    /// Chain constant
    Constant,
}

impl fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureKind::Account => write!(f, "account"),
            FixtureKind::Contract => write!(f, "contract"),
            FixtureKind::Constant => write!(f, "constant"),
        }
    }
}

/// Fixture lookup or validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixtureError {
    /// No fixture registered under this name
    #[error("{kind} fixture {name:?} not found")]
    NotFound {
        /// Fixture kind
        kind: FixtureKind,
        /// Requested name
        name: String,
    },

    /// Fixture failed validation
    #[error("{kind} fixture {name:?} is invalid: {reason}")]
    Invalid {
        /// Fixture kind
        kind: FixtureKind,
        /// Fixture name
        name: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Scenario context error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// Key written twice
    #[error("context key {0:?} is already set")]
    AlreadySet(String),

    /// Key never written by an earlier step
    #[error("context key {0:?} is not set")]
    Missing(String),

    /// Key holds a value of another type
    #[error("context key {key:?} holds {actual}, not {expected}")]
    TypeMismatch {
        /// Key
        key: String,
        /// Requested type
        expected: &'static str,
        /// Stored type
        actual: &'static str,
    },
}

/// Why a step failed
#[derive(Debug, Error)]
pub enum StepError {
    /// Transport or JSON-RPC error from the node
    #[error(transparent)]
    Sdk(#[from] SdkError),

    /// Context misuse
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Fixture lookup failed
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    /// A required verdict failed
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// Step exceeded its allotted time
    #[error("step timed out after {0:?}")]
    Timeout(Duration),

    /// Node did not reach the awaited state in time
    #[error("{what} not available after {waited:?}")]
    FinalityTimeout {
        /// What was awaited
        what: String,
        /// How long we waited
        waited: Duration,
    },

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl StepError {
    /// Connection-level failure, the only kind a step may retry
    pub fn is_transport(&self) -> bool {
        matches!(self, StepError::Sdk(e) if e.is_transport())
    }
}
