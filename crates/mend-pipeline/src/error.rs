//! Error types for the repair pipeline
//!
//! Apart from `Config`, none of these leave the pipeline: they are recorded in
//! diagnostics and cause escalation to the next stage.

use thiserror::Error;

/// Errors that can occur while repairing a response
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepairError {
    /// No candidate payload in the raw text
    #[error("No candidate payload found")]
    ExtractionMiss,

    /// Structured decode failed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Output decoded but failed validation
    #[error("Repair inconclusive: {0}")]
    RepairInconclusive(String),

    /// Model call errored
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Model call exceeded its time budget
    #[error("Model call timed out")]
    Timeout,

    /// Model returned nothing usable
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for RepairError {
    fn from(e: serde_json::Error) -> Self {
        RepairError::Parse(e.to_string())
    }
}

impl From<toml::de::Error> for RepairError {
    fn from(e: toml::de::Error) -> Self {
        RepairError::Config(format!("Failed to parse TOML: {}", e))
    }
}

impl From<std::io::Error> for RepairError {
    fn from(e: std::io::Error) -> Self {
        RepairError::Config(format!("Failed to read config: {}", e))
    }
}
