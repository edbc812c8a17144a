//! # conform-suite
//!
//! Built-in Ethereum JSON-RPC conformance scenarios.
//!
//! | scenario   | covers                                                        |
//! |------------|---------------------------------------------------------------|
//! | `block`    | head number, lookups by hash/number/tag, genesis field values |
//! | `balance`  | sender and recipient balances around a signed transfer        |
//! | `contract` | deploy, `eth_call`, state-changing calls, log blooms          |
//! | `opcodes`  | `STOP`, `INVALID` and `REVERT` in calls and transactions      |
//!
//! Scenarios sign with the account named by the `sender` constant and expect
//! the [built-in contracts](contracts) in the fixture registry.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod balance;
pub mod block;
pub mod contract;
pub mod contracts;
pub mod opcodes;
pub mod tx;

use conform_harness::Scenario;

/// Every built-in scenario, in run order
pub fn all_scenarios() -> Vec<Scenario> {
    vec![
        block::scenario(),
        balance::scenario(),
        contract::scenario(),
        opcodes::scenario(),
    ]
}

/// Names of the built-in scenarios, in run order
pub fn scenario_names() -> Vec<&'static str> {
    vec![block::NAME, balance::NAME, contract::NAME, opcodes::NAME]
}

/// Built-in scenarios whose names appear in `names`, in run order
///
/// Unknown names are returned as the error.
pub fn select(names: &[String]) -> Result<Vec<Scenario>, Vec<String>> {
    let unknown: Vec<String> = names
        .iter()
        .filter(|n| !scenario_names().contains(&n.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(unknown);
    }
    Ok(all_scenarios()
        .into_iter()
        .filter(|s| names.is_empty() || names.iter().any(|n| n == s.name()))
        .collect())
}
