//! Parse outcomes, repair attempts and the final result

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Outcome of interpreting one piece of text as structured data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ParseResult {
    /// Successfully decoded value
    Parsed(Value),
    /// Parser or validation diagnostic
    Failed(String),
}

impl ParseResult {
    /// Build a result from a serde decode
    pub fn from_serde(result: Result<Value, serde_json::Error>) -> Self {
        match result {
            Ok(value) => ParseResult::Parsed(value),
            Err(e) => ParseResult::Failed(e.to_string()),
        }
    }

    /// Did this attempt decode successfully?
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseResult::Parsed(_))
    }

    /// Decoded value, if any
    pub fn value(&self) -> Option<&Value> {
        match self {
            ParseResult::Parsed(v) => Some(v),
            ParseResult::Failed(_) => None,
        }
    }

    /// Diagnostic message, if the attempt failed
    pub fn error(&self) -> Option<&str> {
        match self {
            ParseResult::Parsed(_) => None,
            ParseResult::Failed(msg) => Some(msg),
        }
    }
}

/// Repair strategy, in escalation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Direct decode of the candidate
    Strict,
    /// Local syntactic repair
    Structural,
    /// Model asked for the corrected raw content only
    ModelCorrection,
    /// Model asked for the entire structured wrapper
    ModelWrapper,
    /// Deterministic placeholder result
    Fallback,
}

impl Strategy {
    /// Whether this strategy calls the model
    pub fn calls_model(&self) -> bool {
        matches!(self, Strategy::ModelCorrection | Strategy::ModelWrapper)
    }

    /// Short name used in logs and tables
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Strict => "strict",
            Strategy::Structural => "structural",
            Strategy::ModelCorrection => "model_correction",
            Strategy::ModelWrapper => "model_wrapper",
            Strategy::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic record of one strategy run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairAttempt {
    /// Strategy that ran
    pub strategy: Strategy,

    /// What it produced
    pub result: ParseResult,

    /// Free-form detail (e.g. "code payload from <generated_code>")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl RepairAttempt {
    /// Create a new attempt record
    pub fn new(strategy: Strategy, result: ParseResult) -> Self {
        Self {
            strategy,
            result,
            note: None,
        }
    }

    /// Attach a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Did the attempt succeed?
    pub fn succeeded(&self) -> bool {
        self.result.is_parsed()
    }
}

/// The value handed back to the caller
///
/// Always well-formed: when every stage fails, `value` holds the fallback
/// object and `resolved_by` is [`Strategy::Fallback`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    /// Decoded or synthesized value
    pub value: Value,

    /// Strategy that produced `value`
    pub resolved_by: Strategy,

    /// Every attempt, in the order it ran
    pub diagnostics: Vec<RepairAttempt>,
}

impl FinalResult {
    /// Did the pipeline degrade to the placeholder result?
    pub fn is_fallback(&self) -> bool {
        self.resolved_by == Strategy::Fallback
    }

    /// Attempts made with a given strategy
    pub fn attempts(&self, strategy: Strategy) -> impl Iterator<Item = &RepairAttempt> {
        self.diagnostics.iter().filter(move |a| a.strategy == strategy)
    }

    /// Number of attempts that involved a model call
    pub fn model_attempts(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|a| a.strategy.calls_model())
            .count()
    }

    /// Consume the result, keeping only the value
    pub fn into_value(self) -> Value {
        self.value
    }
}
