//! Configuration for the repair pipeline

use crate::error::RepairError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the repair pipeline
///
/// Every field has a default, so a TOML file only needs the keys it changes.
///
/// # Examples
///
/// ```
/// use mend_pipeline::PipelineConfig;
///
/// let config = PipelineConfig::from_toml("min_plausible_len = 4").unwrap();
/// assert_eq!(config.min_plausible_len, 4);
/// assert_eq!(config.model_timeout_secs, 15);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// The cleaned model reply must be strictly longer than this
    /// (characters) for a model-repaired result to be accepted
    pub min_plausible_len: usize,

    /// Maximum time for a single model call (seconds)
    pub model_timeout_secs: u64,

    /// Pause before the second model request (milliseconds)
    pub model_retry_backoff_ms: u64,

    /// Allow the model-assisted stages to run
    pub model_repair_enabled: bool,

    /// Candidates longer than this (characters) are not sent to the model
    pub max_model_payload_chars: usize,

    /// Custom `<tag>...</tag>` names, tried in order
    pub tag_names: Vec<String>,

    /// Fence markers accepted as code for the `code` hint
    pub code_languages: Vec<String>,

    /// Name of the field carrying the payload in code wrappers
    pub core_field: String,

    /// Name of the field carrying explanation strings in code wrappers
    pub explanation_field: String,

    /// Core content of the fallback object
    pub fallback_code: String,

    /// Explanation entry of the fallback object
    pub fallback_explanation: String,

    /// Keep the raw response under a `raw` key in the fallback object
    pub fallback_preserve_raw: bool,
}

impl PipelineConfig {
    /// Get the model call timeout as a Duration
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    /// Get the backoff between model requests as a Duration
    pub fn model_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.model_retry_backoff_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RepairError> {
        if self.model_timeout_secs == 0 {
            return Err(RepairError::Config(
                "model_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.max_model_payload_chars == 0 {
            return Err(RepairError::Config(
                "max_model_payload_chars must be greater than 0".to_string(),
            ));
        }
        if self.core_field.trim().is_empty() {
            return Err(RepairError::Config("core_field must not be empty".to_string()));
        }
        if self.explanation_field.trim().is_empty() {
            return Err(RepairError::Config(
                "explanation_field must not be empty".to_string(),
            ));
        }
        if self.core_field == self.explanation_field {
            return Err(RepairError::Config(
                "core_field and explanation_field must differ".to_string(),
            ));
        }
        let valid_name = |s: &String| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '+' || c == '#')
        };
        if let Some(bad) = self.tag_names.iter().find(|t| !valid_name(t)) {
            return Err(RepairError::Config(format!("Invalid tag name: '{}'", bad)));
        }
        if let Some(bad) = self.code_languages.iter().find(|l| !valid_name(l)) {
            return Err(RepairError::Config(format!("Invalid code language: '{}'", bad)));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            min_plausible_len: 10,
            model_timeout_secs: 15,
            model_retry_backoff_ms: 500,
            model_repair_enabled: true,
            max_model_payload_chars: 50_000,
            tag_names: vec![
                "generated_code".to_string(),
                "corrected_code".to_string(),
                "json".to_string(),
            ],
            code_languages: [
                "javascript", "js", "jsx", "typescript", "ts", "tsx", "python", "py", "java",
                "rust", "go", "c", "cpp", "csharp", "ruby", "php", "html", "css",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            core_field: "correct_code".to_string(),
            explanation_field: "explanation".to_string(),
            fallback_code: "// Failed to repair code".to_string(),
            fallback_explanation: "Repair process failed".to_string(),
            fallback_preserve_raw: false,
        }
    }
}

impl PipelineConfig {
    /// Aggressive preset: short timeout, no pause between model requests
    pub fn aggressive() -> Self {
        Self {
            model_timeout_secs: 10,
            model_retry_backoff_ms: 0,
            max_model_payload_chars: 20_000,
            ..Self::default()
        }
    }

    /// Lenient preset: longer timeout and backoff, accept shorter repairs
    pub fn lenient() -> Self {
        Self {
            min_plausible_len: 3,
            model_timeout_secs: 20,
            model_retry_backoff_ms: 1_000,
            max_model_payload_chars: 100_000,
            ..Self::default()
        }
    }

    /// Offline preset: local stages only, never calls the model
    pub fn offline() -> Self {
        Self {
            model_repair_enabled: false,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, RepairError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RepairError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, RepairError> {
        toml::to_string_pretty(self)
            .map_err(|e| RepairError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}
