//! Steps and the scope a step's action runs in

use conform_primitives::H256;
use conform_sdk::types::RpcReceipt;
use conform_sdk::RpcClient;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::assertions::Verdict;
use crate::context::Context;
use crate::finality::{self, PollPolicy};
use crate::fixtures::FixtureRegistry;
use crate::StepError;

/// Future returned by a step action, borrowing the scope for `'a`
pub type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<(), StepError>> + Send + 'a>>;

type Action = Arc<dyn for<'a> Fn(&'a mut StepScope) -> StepFuture<'a> + Send + Sync>;

/// One named unit of work in a scenario
///
/// ```rust,ignore
/// async fn read_head(scope: &mut StepScope) -> Result<(), StepError> {
///     let head = scope.client().block_number().await?;
///     scope.set("head", head)
/// }
///
/// let step = Step::new("read head", |s| Box::pin(read_head(s))).timeout(Duration::from_secs(5));
/// ```
#[derive(Clone)]
pub struct Step {
    name: String,
    action: Action,
    timeout: Option<Duration>,
    retries: u32,
    skip: Option<String>,
}

impl Step {
    /// Step running `action`
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: for<'a> Fn(&'a mut StepScope) -> StepFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            action: Arc::new(action),
            timeout: None,
            retries: 0,
            skip: None,
        }
    }

    /// Override the scenario's step timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Re-run up to `retries` more times after a transport error
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Declare the step but never run it
    pub fn skip(mut self, reason: impl Into<String>) -> Self {
        self.skip = Some(reason.into());
        self
    }

    /// Step name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-step timeout, if overridden
    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    /// Maximum number of retries
    pub fn retry_limit(&self) -> u32 {
        self.retries
    }

    /// Why the step is skipped, if it is
    pub fn skip_reason(&self) -> Option<&str> {
        self.skip.as_deref()
    }

    pub(crate) fn invoke<'a>(&self, scope: &'a mut StepScope) -> StepFuture<'a> {
        (self.action)(scope)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("skip", &self.skip)
            .finish_non_exhaustive()
    }
}

/// Everything a step action can reach
///
/// One scope lives for one scenario run: the context persists from step to
/// step, the verdict buffer is drained after each step.
pub struct StepScope {
    client: RpcClient,
    fixtures: Arc<FixtureRegistry>,
    context: Context,
    poll: PollPolicy,
    verdicts: Vec<Verdict>,
    scenario: String,
    step: String,
}

impl StepScope {
    /// Fresh scope with an empty context
    pub fn new(
        client: RpcClient,
        fixtures: Arc<FixtureRegistry>,
        poll: PollPolicy,
        scenario: impl Into<String>,
    ) -> Self {
        Self {
            client,
            fixtures,
            context: Context::new(),
            poll,
            verdicts: Vec::new(),
            scenario: scenario.into(),
            step: String::new(),
        }
    }

    /// Client for the node under test
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Run fixtures
    pub fn fixtures(&self) -> &Arc<FixtureRegistry> {
        &self.fixtures
    }

    /// Scenario context
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Scenario context, writable
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Write a context value for later steps
    pub fn set<T: Any + Send + Sync>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), StepError> {
        Ok(self.context.insert(key, value)?)
    }

    /// Copy of a context value written by an earlier step
    pub fn get<T: Any + Clone>(&self, key: &str) -> Result<T, StepError> {
        Ok(self.context.get::<T>(key)?.clone())
    }

    /// Finality polling policy
    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll
    }

    /// Running scenario's name
    pub fn scenario_name(&self) -> &str {
        &self.scenario
    }

    /// Running step's name
    pub fn step_name(&self) -> &str {
        &self.step
    }

    /// Record a verdict and keep going; returns whether it passed
    pub fn check(&mut self, verdict: Verdict) -> bool {
        let passed = verdict.passed();
        if !passed {
            tracing::debug!(diagnostic = %verdict.diagnostic, "verdict failed");
        }
        self.verdicts.push(verdict);
        passed
    }

    /// Record a verdict; a failure ends the step
    pub fn require(&mut self, verdict: Verdict) -> Result<(), StepError> {
        let diagnostic = verdict.diagnostic.clone();
        if self.check(verdict) {
            Ok(())
        } else {
            Err(StepError::Assertion(diagnostic))
        }
    }

    /// Wait for a receipt using the scope's polling policy
    pub async fn await_receipt(&self, hash: &H256) -> Result<RpcReceipt, StepError> {
        finality::await_receipt(&self.client, hash, &self.poll).await
    }

    pub(crate) fn begin_step(&mut self, name: &str) {
        self.step = name.to_string();
        self.verdicts.clear();
    }

    pub(crate) fn verdict_count(&self) -> usize {
        self.verdicts.len()
    }

    pub(crate) fn discard_verdicts_from(&mut self, mark: usize) {
        self.verdicts.truncate(mark);
    }

    /// Remember what exists before an attempt so a retry can start clean
    pub(crate) fn mark_attempt(&self) -> AttemptMark {
        AttemptMark {
            verdicts: self.verdicts.len(),
            keys: self.context.key_set(),
        }
    }

    /// Forget the verdicts and context writes of a failed attempt
    pub(crate) fn rollback(&mut self, mark: &AttemptMark) {
        self.discard_verdicts_from(mark.verdicts);
        self.context.retain_keys(&mark.keys);
    }

    pub(crate) fn take_verdicts(&mut self) -> Vec<Verdict> {
        std::mem::take(&mut self.verdicts)
    }
}

/// State of a [`StepScope`] before one attempt of a step
pub(crate) struct AttemptMark {
    verdicts: usize,
    keys: HashSet<String>,
}

impl fmt::Debug for StepScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepScope")
            .field("scenario", &self.scenario)
            .field("step", &self.step)
            .field("context", &self.context)
            .field("verdicts", &self.verdicts.len())
            .finish_non_exhaustive()
    }
}
