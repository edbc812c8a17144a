//! Per-scenario results and the run summary

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::assertions::Verdict;

/// Terminal status of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Completed with every verdict passing
    Passed,
    /// Returned an error, timed out or recorded a failed verdict
    Failed,
    /// Never executed
    Skipped,
}

/// Terminal status of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    /// Every executed step passed
    Passed,
    /// A step failed
    Failed,
    /// Not run
    Skipped,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Outcome of one step
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// Step name
    pub name: String,
    /// Terminal status
    pub status: StepStatus,
    /// Verdicts in the order they were recorded
    pub verdicts: Vec<Verdict>,
    /// Wall time spent in the step
    #[serde(rename = "elapsed_ms", with = "duration_ms")]
    pub elapsed: Duration,
    /// Error message when the step ended with an error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Why the step did not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl StepReport {
    /// Report for a step that never ran
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Skipped,
            verdicts: Vec::new(),
            elapsed: Duration::ZERO,
            error: None,
            skip_reason: Some(reason.into()),
        }
    }

    /// First failed verdict's diagnostic, else the error message
    pub fn diagnostic(&self) -> Option<&str> {
        self.verdicts
            .iter()
            .find(|v| !v.passed())
            .map(|v| v.diagnostic.as_str())
            .or(self.error.as_deref())
    }
}

/// Outcome of one scenario run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Scenario description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Terminal status
    pub status: ScenarioStatus,
    /// One report per declared step, in declared order
    pub steps: Vec<StepReport>,
    /// Wall time of the run
    #[serde(rename = "elapsed_ms", with = "duration_ms")]
    pub elapsed: Duration,
    /// Why the scenario did not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl ScenarioResult {
    /// All verdicts of all steps, in order
    pub fn verdicts(&self) -> impl Iterator<Item = &Verdict> {
        self.steps.iter().flat_map(|s| s.verdicts.iter())
    }

    /// First failed step
    pub fn first_failure(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }

    /// Whether the scenario passed
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }

    /// Failed result for a scenario whose task died mid-run, e.g. after a
    /// panic; `steps` keeps whatever finished before
    pub fn aborted(name: impl Into<String>, description: Option<String>, steps: Vec<StepReport>) -> Self {
        Self {
            name: name.into(),
            description,
            status: ScenarioStatus::Failed,
            steps,
            elapsed: Duration::ZERO,
            skip_reason: None,
        }
    }
}

/// Where a failed scenario first went wrong
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
    /// Scenario name
    pub scenario: String,
    /// First failed step
    pub step: String,
    /// Its diagnostic
    pub diagnostic: String,
}

/// Scenario and step counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// Scenarios passed
    pub passed: usize,
    /// Scenarios failed
    pub failed: usize,
    /// Scenarios skipped
    pub skipped: usize,
    /// Steps passed
    pub steps_passed: usize,
    /// Steps failed
    pub steps_failed: usize,
    /// Steps skipped
    pub steps_skipped: usize,
}

/// Finalized summary of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Results, in declaration order when known
    pub scenarios: Vec<ScenarioResult>,
    /// Counts
    pub totals: Totals,
    /// First failure of each failed scenario
    pub failures: Vec<FailureSummary>,
    /// Wall time of the run
    #[serde(rename = "elapsed_ms", with = "duration_ms")]
    pub elapsed: Duration,
}

impl RunReport {
    /// Build totals and failure summaries from finished results
    pub fn from_results(scenarios: Vec<ScenarioResult>, elapsed: Duration) -> Self {
        let mut totals = Totals::default();
        let mut failures = Vec::new();

        for scenario in &scenarios {
            match scenario.status {
                ScenarioStatus::Passed => totals.passed += 1,
                ScenarioStatus::Failed => totals.failed += 1,
                ScenarioStatus::Skipped => totals.skipped += 1,
            }
            for step in &scenario.steps {
                match step.status {
                    StepStatus::Passed => totals.steps_passed += 1,
                    StepStatus::Failed => totals.steps_failed += 1,
                    StepStatus::Skipped => totals.steps_skipped += 1,
                }
            }
            if let Some(step) = scenario.first_failure() {
                failures.push(FailureSummary {
                    scenario: scenario.name.clone(),
                    step: step.name.clone(),
                    diagnostic: step.diagnostic().unwrap_or("failed").to_string(),
                });
            }
        }

        Self {
            scenarios,
            totals,
            failures,
            elapsed,
        }
    }

    /// True when no scenario failed
    pub fn success(&self) -> bool {
        self.totals.failed == 0
    }

    /// Result of a scenario by name
    pub fn scenario(&self, name: &str) -> Option<&ScenarioResult> {
        self.scenarios.iter().find(|s| s.name == name)
    }
}

#[derive(Default)]
struct Collected {
    results: Vec<ScenarioResult>,
    finalized: bool,
}

/// Collects scenario results as they complete, from any task
pub struct ReportAggregator {
    order: Vec<String>,
    collected: Mutex<Collected>,
    frozen: OnceLock<RunReport>,
    started: Instant,
}

impl ReportAggregator {
    /// Aggregator that reports results in arrival order
    pub fn new() -> Self {
        Self::with_order(Vec::new())
    }

    /// Aggregator that reports results in the given name order
    pub fn with_order(order: Vec<String>) -> Self {
        Self {
            order,
            collected: Mutex::new(Collected::default()),
            frozen: OnceLock::new(),
            started: Instant::now(),
        }
    }

    /// Add a finished scenario; ignored once the report is finalized
    pub fn record(&self, result: ScenarioResult) {
        let mut collected = self.collected.lock();
        if collected.finalized {
            tracing::warn!(scenario = %result.name, "result recorded after finalize, ignored");
            return;
        }
        collected.results.push(result);
    }

    /// Number of results recorded so far
    pub fn len(&self) -> usize {
        self.collected.lock().results.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freeze and return the report; later calls return the same snapshot
    pub fn finalize(&self) -> RunReport {
        self.frozen
            .get_or_init(|| {
                let mut collected = self.collected.lock();
                collected.finalized = true;

                let mut results = collected.results.clone();
                // stable: unknown names keep arrival order after known ones
                results.sort_by_key(|r| {
                    self.order
                        .iter()
                        .position(|n| *n == r.name)
                        .unwrap_or(usize::MAX)
                });
                RunReport::from_results(results, self.started.elapsed())
            })
            .clone()
    }
}

impl Default for ReportAggregator {
    fn default() -> Self {
        Self::new()
    }
}
