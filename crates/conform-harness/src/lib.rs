//! # conform-harness
//!
//! Stepwise orchestration for JSON-RPC conformance scenarios.
//!
//! - [`FixtureRegistry`]: accounts, contracts and chain constants, validated up front
//! - [`Scenario`] / [`Step`]: ordered steps sharing a write-once [`Context`]
//! - [`Runner`]: per-step timeouts, fail-fast within a scenario, isolation between scenarios
//! - [`assertions`]: pure checks producing [`Verdict`]s
//! - [`ReportAggregator`] / [`RunReport`]: totals and first failures
//!
//! ```rust,ignore
//! use conform_harness::{assertions::assert_matches, Scenario, Step, StepError, StepScope};
//!
//! async fn head_advances(scope: &mut StepScope) -> Result<(), StepError> {
//!     let head = scope.client().block_number().await?;
//!     scope.require(assert_matches("head", &head, |n| *n > 0, "non-zero"))
//! }
//!
//! let scenario = Scenario::new("head").step(Step::new("advances", |s| Box::pin(head_advances(s))));
//! let report = runner.run_all(vec![scenario]).await;
//! assert!(report.success());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assertions;
mod context;
mod error;
pub mod finality;
pub mod fixtures;
mod report;
mod runner;
mod scenario;
mod step;

pub use assertions::{Outcome, Verdict};
pub use context::Context;
pub use error::{ContextError, FixtureError, FixtureKind, StepError};
pub use finality::PollPolicy;
pub use fixtures::{AccountFixture, ConstantValue, ContractFixture, FixtureRegistry};
pub use report::{
    FailureSummary, ReportAggregator, RunReport, ScenarioResult, ScenarioStatus, StepReport,
    StepStatus, Totals,
};
pub use runner::{Runner, RunnerConfig};
pub use scenario::Scenario;
pub use step::{Step, StepFuture, StepScope};
