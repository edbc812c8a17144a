//! Scenario runner
//!
//! Steps of one scenario run strictly in order over a single [`StepScope`];
//! the first failing step halts the scenario and every later step is
//! reported skipped. Scenarios are independent of each other and may run
//! concurrently.

use conform_sdk::RpcClient;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{sleep, Instant};
use tracing::Instrument;

use crate::assertions::Verdict;
use crate::finality::PollPolicy;
use crate::fixtures::FixtureRegistry;
use crate::report::{
    ReportAggregator, RunReport, ScenarioResult, ScenarioStatus, StepReport, StepStatus,
};
use crate::scenario::Scenario;
use crate::step::{Step, StepScope};
use crate::StepError;

const HALTED: &str = "earlier step failed";

/// Runner settings
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Step timeout when neither step nor scenario sets one
    pub step_timeout: Duration,
    /// Ceiling for scenarios that do not set their own
    pub scenario_timeout: Option<Duration>,
    /// Scenarios running at once
    pub max_concurrency: usize,
    /// Scenario names never to run
    pub skip: Vec<String>,
    /// Finality polling, also the retry backoff
    pub poll: PollPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(60),
            scenario_timeout: None,
            max_concurrency: 1,
            skip: Vec::new(),
            poll: PollPolicy::default(),
        }
    }
}

/// Runs scenarios against one node with one set of fixtures
#[derive(Clone)]
pub struct Runner {
    client: RpcClient,
    fixtures: Arc<FixtureRegistry>,
    config: Arc<RunnerConfig>,
}

impl Runner {
    /// Create a runner
    pub fn new(client: RpcClient, fixtures: Arc<FixtureRegistry>, config: RunnerConfig) -> Self {
        Self {
            client,
            fixtures,
            config: Arc::new(config),
        }
    }

    /// Runner settings
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run one scenario to a terminal status
    pub async fn run(&self, scenario: &Scenario) -> ScenarioResult {
        self.run_recorded(scenario, &Mutex::new(Vec::new())).await
    }

    /// Like [`Runner::run`], leaving each finished step's report in `progress`
    /// until the scenario ends, so a panic does not lose them
    async fn run_recorded(
        &self,
        scenario: &Scenario,
        progress: &Mutex<Vec<StepReport>>,
    ) -> ScenarioResult {
        let span = tracing::info_span!("scenario", scenario = %scenario.name());
        self.run_inner(scenario, progress).instrument(span).await
    }

    async fn run_inner(
        &self,
        scenario: &Scenario,
        progress: &Mutex<Vec<StepReport>>,
    ) -> ScenarioResult {
        let skip = scenario.skip_reason().map(str::to_string).or_else(|| {
            self.config
                .skip
                .iter()
                .any(|s| s == scenario.name())
                .then(|| "excluded by configuration".to_string())
        });
        if let Some(reason) = skip {
            tracing::info!(%reason, "scenario skipped");
            return ScenarioResult {
                name: scenario.name().to_string(),
                description: scenario.description().map(str::to_string),
                status: ScenarioStatus::Skipped,
                steps: scenario
                    .steps()
                    .iter()
                    .map(|s| StepReport::skipped(s.name(), reason.clone()))
                    .collect(),
                elapsed: Duration::ZERO,
                skip_reason: Some(reason),
            };
        }

        let started = Instant::now();
        let ceiling = scenario
            .ceiling()
            .or(self.config.scenario_timeout)
            .map(|d| started + d);
        let mut scope = StepScope::new(
            self.client.clone(),
            self.fixtures.clone(),
            self.config.poll,
            scenario.name(),
        );

        tracing::info!(steps = scenario.steps().len(), "scenario started");
        let mut halted = false;

        for step in scenario.steps() {
            if halted {
                tracing::debug!(step = step.name(), "step skipped after failure");
                progress.lock().push(StepReport::skipped(step.name(), HALTED));
                continue;
            }
            if let Some(reason) = step.skip_reason() {
                tracing::debug!(step = step.name(), reason, "step skipped");
                progress.lock().push(StepReport::skipped(step.name(), reason));
                continue;
            }

            let limit = step
                .timeout_override()
                .or(scenario.default_step_timeout())
                .unwrap_or(self.config.step_timeout);
            let span = tracing::info_span!("step", step = step.name());
            let report = self
                .run_step(step, &mut scope, limit, ceiling)
                .instrument(span)
                .await;
            halted = report.status == StepStatus::Failed;
            progress.lock().push(report);
        }

        let status = if halted {
            ScenarioStatus::Failed
        } else {
            ScenarioStatus::Passed
        };
        let elapsed = started.elapsed();
        let reports = std::mem::take(&mut *progress.lock());
        match status {
            ScenarioStatus::Failed => tracing::warn!(?elapsed, "scenario failed"),
            _ => tracing::info!(?elapsed, "scenario passed"),
        }

        ScenarioResult {
            name: scenario.name().to_string(),
            description: scenario.description().map(str::to_string),
            status,
            steps: reports,
            elapsed,
            skip_reason: None,
        }
    }

    async fn run_step(
        &self,
        step: &Step,
        scope: &mut StepScope,
        limit: Duration,
        ceiling: Option<Instant>,
    ) -> StepReport {
        let started = Instant::now();
        let limit = match ceiling {
            Some(deadline) => limit.min(deadline.saturating_duration_since(started)),
            None => limit,
        };
        scope.begin_step(step.name());
        tracing::debug!(timeout = ?limit, "step started");

        let outcome = if limit.is_zero() {
            Err(StepError::Timeout(limit))
        } else {
            let attempts = async {
                let mut attempt = 0;
                loop {
                    let mark = scope.mark_attempt();
                    match step.invoke(&mut *scope).await {
                        Err(e) if e.is_transport() && attempt < step.retry_limit() => {
                            scope.rollback(&mark);
                            let delay = self.config.poll.delay_for_attempt(attempt);
                            tracing::warn!(attempt, error = %e, ?delay, "transport error, retrying");
                            attempt += 1;
                            sleep(delay).await;
                        }
                        other => break other,
                    }
                }
            };
            // dropping the timed-out future discards whatever it would still have produced
            tokio::time::timeout(limit, attempts)
                .await
                .unwrap_or(Err(StepError::Timeout(limit)))
        };

        let elapsed = started.elapsed();
        let mut verdicts = scope.take_verdicts();
        let (status, error) = match outcome {
            Ok(()) if verdicts.iter().all(Verdict::passed) => (StepStatus::Passed, None),
            Ok(()) => (StepStatus::Failed, None),
            Err(e) => {
                // a failed `require` already left its verdict
                if !matches!(e, StepError::Assertion(_)) {
                    verdicts.push(Verdict::from_error(step.name(), &e));
                }
                (StepStatus::Failed, Some(e.to_string()))
            }
        };

        let report = StepReport {
            name: step.name().to_string(),
            status,
            verdicts,
            elapsed,
            error,
            skip_reason: None,
        };
        match report.status {
            StepStatus::Passed => tracing::info!(?elapsed, verdicts = report.verdicts.len(), "step passed"),
            _ => tracing::warn!(
                ?elapsed,
                diagnostic = report.diagnostic().unwrap_or("failed"),
                "step failed"
            ),
        }
        report
    }

    /// Run every scenario, up to `max_concurrency` at once
    ///
    /// A scenario that panics is reported failed with the reports of the
    /// steps it finished; the others are unaffected.
    /// Results are ordered as declared regardless of completion order.
    pub async fn run_all(&self, scenarios: Vec<Scenario>) -> RunReport {
        let names: Vec<String> = scenarios.iter().map(|s| s.name().to_string()).collect();
        let aggregator = Arc::new(ReportAggregator::with_order(names));
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));

        tracing::info!(
            scenarios = scenarios.len(),
            concurrency = self.config.max_concurrency.max(1),
            "run started"
        );

        let mut tasks = JoinSet::new();
        for scenario in scenarios {
            let runner = self.clone();
            let semaphore = semaphore.clone();
            let aggregator = aggregator.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let name = scenario.name().to_string();
                let description = scenario.description().map(str::to_string);
                let step_names: Vec<String> =
                    scenario.steps().iter().map(|s| s.name().to_string()).collect();
                let progress = Arc::new(Mutex::new(Vec::new()));

                let recorded = progress.clone();
                let handle =
                    tokio::spawn(async move { runner.run_recorded(&scenario, &recorded).await });
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!(scenario = %name, error = %e, "scenario aborted");
                        let finished = std::mem::take(&mut *progress.lock());
                        let steps = aborted_steps(finished, &step_names, format!("scenario aborted: {}", e));
                        ScenarioResult::aborted(name, description, steps)
                    }
                };
                aggregator.record(result);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "scenario task failed");
            }
        }

        let report = aggregator.finalize();
        tracing::info!(
            passed = report.totals.passed,
            failed = report.totals.failed,
            skipped = report.totals.skipped,
            "run finished"
        );
        report
    }
}

/// Reports for a scenario whose task died: the finished steps as recorded,
/// the step that was running failed with `error`, the rest skipped
fn aborted_steps(mut finished: Vec<StepReport>, step_names: &[String], error: String) -> Vec<StepReport> {
    let running = finished.len();
    let name = step_names
        .get(running)
        .cloned()
        .unwrap_or_else(|| "<aborted>".to_string());
    finished.push(StepReport {
        verdicts: vec![Verdict::from_error(&name, &StepError::Other(error.clone()))],
        name,
        status: StepStatus::Failed,
        elapsed: Duration::ZERO,
        error: Some(error),
        skip_reason: None,
    });
    finished.extend(
        step_names
            .iter()
            .skip(running + 1)
            .map(|name| StepReport::skipped(name.as_str(), HALTED)),
    );
    finished
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("client", &self.client)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
