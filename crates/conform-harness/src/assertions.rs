//! Assertion evaluator
//!
//! Every function here is pure and returns a [`Verdict`]; a mismatch is a
//! failed verdict, never a panic or an `Err`. A step can therefore evaluate
//! several independent checks and report all of them even when the first fails.

use conform_sdk::{Bloom, U256};
use serde::Serialize;
use std::fmt::Debug;

use crate::StepError;

/// Pass or fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Expectation held
    Pass,
    /// Expectation violated
    Fail,
}

/// Result of one assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// Pass or fail
    pub outcome: Outcome,
    /// What was checked
    pub label: String,
    /// Observed value
    pub actual: String,
    /// Expected value or predicate
    pub expected: String,
    /// Human-readable explanation
    pub diagnostic: String,
}

impl Verdict {
    fn new(passed: bool, label: &str, actual: String, expected: String) -> Self {
        let diagnostic = if passed {
            format!("{}: ok", label)
        } else {
            format!("{}: expected {}, got {}", label, expected, actual)
        };
        Self {
            outcome: if passed { Outcome::Pass } else { Outcome::Fail },
            label: label.to_string(),
            actual,
            expected,
            diagnostic,
        }
    }

    /// Failed verdict standing for a step error
    pub fn from_error(label: &str, error: &StepError) -> Self {
        Self {
            outcome: Outcome::Fail,
            label: label.to_string(),
            actual: "error".to_string(),
            expected: "step completes".to_string(),
            diagnostic: error.to_string(),
        }
    }

    /// Failed verdict for a check that could not be evaluated
    pub fn fail(
        label: &str,
        actual: impl Into<String>,
        expected: impl Into<String>,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self {
            outcome: Outcome::Fail,
            label: label.to_string(),
            actual: actual.into(),
            expected: expected.into(),
            diagnostic: format!("{}: {}", label, diagnostic.into()),
        }
    }

    /// Whether the expectation held
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }
}

/// `actual == expected`
pub fn assert_equal<T: PartialEq + Debug + ?Sized>(label: &str, actual: &T, expected: &T) -> Verdict {
    Verdict::new(
        actual == expected,
        label,
        format!("{:?}", actual),
        format!("{:?}", expected),
    )
}

/// `actual != unexpected`
pub fn assert_not_equal<T: PartialEq + Debug + ?Sized>(
    label: &str,
    actual: &T,
    unexpected: &T,
) -> Verdict {
    Verdict::new(
        actual != unexpected,
        label,
        format!("{:?}", actual),
        format!("anything but {:?}", unexpected),
    )
}

/// `predicate(actual)`, with `description` naming the predicate
pub fn assert_matches<T: Debug + ?Sized>(
    label: &str,
    actual: &T,
    predicate: impl FnOnce(&T) -> bool,
    description: &str,
) -> Verdict {
    Verdict::new(
        predicate(actual),
        label,
        format!("{:?}", actual),
        description.to_string(),
    )
}

/// `actual.is_some()`
pub fn assert_some<T: Debug>(label: &str, actual: &Option<T>) -> Verdict {
    Verdict::new(
        actual.is_some(),
        label,
        format!("{:?}", actual),
        "a value".to_string(),
    )
}

/// `actual.is_none()`
pub fn assert_none<T: Debug>(label: &str, actual: &Option<T>) -> Verdict {
    Verdict::new(
        actual.is_none(),
        label,
        format!("{:?}", actual),
        "None".to_string(),
    )
}

/// `haystack` contains `needle`
pub fn assert_contains<T: PartialEq + Debug>(label: &str, haystack: &[T], needle: &T) -> Verdict {
    Verdict::new(
        haystack.contains(needle),
        label,
        format!("{:?}", haystack),
        format!("a collection containing {:?}", needle),
    )
}

/// `items` is empty
pub fn assert_empty<T: Debug>(label: &str, items: &[T]) -> Verdict {
    Verdict::new(
        items.is_empty(),
        label,
        format!("{:?}", items),
        "[]".to_string(),
    )
}

/// Numeric comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>=`
    Ge,
    /// `>`
    Gt,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Ge => ">=",
            CompareOp::Gt => ">",
        }
    }

    fn holds(self, a: &U256, b: &U256) -> bool {
        match self {
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Ge => a >= b,
            CompareOp::Gt => a > b,
        }
    }
}

/// 256-bit integer comparison (`actual op expected`), rendered in decimal
pub fn assert_compare(label: &str, actual: U256, op: CompareOp, expected: U256) -> Verdict {
    Verdict::new(
        op.holds(&actual, &expected),
        label,
        actual.to_string(),
        format!("{} {}", op.symbol(), expected),
    )
}

/// `text` is exactly `len` characters long (prefix included)
pub fn assert_hex_len(label: &str, text: &str, len: usize) -> Verdict {
    Verdict::new(
        text.len() == len,
        label,
        format!("{:?} ({} chars)", text, text.len()),
        format!("{} chars", len),
    )
}

/// Every bloom bit derived from `input` is set
///
/// May pass for inputs never added (false positive); never fails for an
/// input that was added.
pub fn assert_bloom_contains(label: &str, bloom: &Bloom, input: &[u8]) -> Verdict {
    Verdict::new(
        bloom.contains_input(input),
        label,
        format!("{:?}", bloom),
        format!("bloom containing 0x{}", hex::encode(input)),
    )
}
