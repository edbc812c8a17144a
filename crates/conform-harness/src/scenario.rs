//! Scenario: an ordered, named list of steps

use std::time::Duration;

use crate::step::Step;

/// Named, ordered sequence of dependent steps
#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    description: Option<String>,
    steps: Vec<Step>,
    step_timeout: Option<Duration>,
    timeout: Option<Duration>,
    skip: Option<String>,
}

impl Scenario {
    /// Empty scenario
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps: Vec::new(),
            step_timeout: None,
            timeout: None,
            skip: None,
        }
    }

    /// One-line description shown by `list`
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a step
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Default timeout for steps without their own
    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    /// Ceiling on the whole scenario
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Declare the scenario but never run it
    pub fn skip(mut self, reason: impl Into<String>) -> Self {
        self.skip = Some(reason.into());
        self
    }

    /// Scenario name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description, if any
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Steps in declared order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Scenario-level step timeout
    pub fn default_step_timeout(&self) -> Option<Duration> {
        self.step_timeout
    }

    /// Scenario ceiling
    pub fn ceiling(&self) -> Option<Duration> {
        self.timeout
    }

    /// Why the scenario is skipped, if it is
    pub fn skip_reason(&self) -> Option<&str> {
        self.skip.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_declared_order() {
        let scenario = Scenario::new("contract")
            .describe("deploy and call")
            .step(Step::new("deploy", |_| Box::pin(async { Ok(()) })))
            .step(Step::new("call", |_| Box::pin(async { Ok(()) })))
            .step_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30));

        let names: Vec<&str> = scenario.steps().iter().map(Step::name).collect();
        assert_eq!(names, ["deploy", "call"]);
        assert_eq!(scenario.description(), Some("deploy and call"));
        assert_eq!(scenario.default_step_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(scenario.ceiling(), Some(Duration::from_secs(30)));
        assert_eq!(scenario.skip_reason(), None);
    }
}
