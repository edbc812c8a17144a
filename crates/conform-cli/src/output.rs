//! Output formatting

use conform_harness::{RunReport, ScenarioStatus, StepStatus};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Output builder for formatted CLI output
pub struct Output {
    json_mode: bool,
    fields: BTreeMap<String, Value>,
    message: Option<String>,
}

impl Output {
    /// Create a new output builder
    pub fn new(json_mode: bool) -> Self {
        Self {
            json_mode,
            fields: BTreeMap::new(),
            message: None,
        }
    }

    /// Add a string field to the output
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a JSON value field to the output
    pub fn field_value(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Set the human-readable message
    pub fn message(mut self, msg: &str) -> Self {
        self.message = Some(msg.to_string());
        self
    }

    /// Print the output
    pub fn print(self) {
        if self.json_mode {
            let json = json!(self.fields);
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        } else if let Some(msg) = self.message {
            println!("{}", msg);
        }
    }
}

/// Print a run report as text or as the serialized report
pub fn print_report(report: &RunReport, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
    } else {
        print!("{}", render_report(report));
    }
}

/// Human-readable report: one line per scenario, failing steps indented
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();
    for scenario in &report.scenarios {
        let tag = match scenario.status {
            ScenarioStatus::Passed => "PASS",
            ScenarioStatus::Failed => "FAIL",
            ScenarioStatus::Skipped => "SKIP",
        };
        let _ = write!(out, "{} {}", tag, scenario.name);
        match &scenario.skip_reason {
            Some(reason) => {
                let _ = writeln!(out, " ({})", reason);
            }
            None => {
                let _ = writeln!(
                    out,
                    " ({} steps, {:.2}s)",
                    scenario.steps.len(),
                    scenario.elapsed.as_secs_f64()
                );
            }
        }

        for step in &scenario.steps {
            match step.status {
                StepStatus::Failed => {
                    let _ = writeln!(
                        out,
                        "  x {}: {}",
                        step.name,
                        step.diagnostic().unwrap_or("failed")
                    );
                }
                StepStatus::Skipped => {
                    let _ = writeln!(
                        out,
                        "  - {} (skipped: {})",
                        step.name,
                        step.skip_reason.as_deref().unwrap_or("")
                    );
                }
                StepStatus::Passed => {}
            }
        }
    }

    let totals = &report.totals;
    let _ = writeln!(
        out,
        "\n{} passed, {} failed, {} skipped ({} steps passed, {} failed, {} skipped) in {:.2}s",
        totals.passed,
        totals.failed,
        totals.skipped,
        totals.steps_passed,
        totals.steps_failed,
        totals.steps_skipped,
        report.elapsed.as_secs_f64()
    );
    out
}
