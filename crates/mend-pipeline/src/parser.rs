//! Strict parsing of candidates and code-payload wrapping

use crate::config::PipelineConfig;
use mend_domain::{Candidate, ParseResult, TaskHint};
use serde_json::{json, Value};

/// Decode `text` as JSON with no repairs
pub fn parse_strict(text: &str) -> ParseResult {
    let trimmed = text.trim_start_matches('\u{FEFF}').trim();
    ParseResult::from_serde(serde_json::from_str::<Value>(trimmed))
}

/// Whether a candidate should be taken as a code payload rather than parsed
///
/// Only explicitly delimited, non-JSON content under the `code` hint
/// qualifies; loose text always goes through parsing and repair.
pub fn is_code_payload(candidate: &Candidate, hint: TaskHint) -> bool {
    hint == TaskHint::Code && candidate.source.is_delimited() && !candidate.is_json_shaped()
}

/// Wrap raw code as `{ core_field: code, explanation_field: [note] }`
pub fn wrap_code(config: &PipelineConfig, code: &str, note: &str) -> Value {
    let mut wrapper = serde_json::Map::new();
    wrapper.insert(config.core_field.clone(), Value::String(code.to_string()));
    wrapper.insert(config.explanation_field.clone(), json!([note]));
    Value::Object(wrapper)
}

/// Check that a value decoded under the `code` hint is a code wrapper
///
/// The core field must be a non-empty string. Snippets such as
/// `const a = [1, 2];` decode to bare arrays or objects and fail here.
pub fn check_code_wrapper(config: &PipelineConfig, value: &Value) -> Result<(), String> {
    match value.get(&config.core_field).and_then(Value::as_str) {
        Some(core) if !core.trim().is_empty() => Ok(()),
        Some(_) => Err(format!("Field '{}' is empty", config.core_field)),
        None => Err(format!("Missing string field '{}'", config.core_field)),
    }
}

/// Check that a model-repaired result carries real content
///
/// `content` is the cleaned text the model returned; it must be longer than
/// `min_plausible_len` characters. Code results also need a non-empty string
/// core field; JSON results must be non-null and non-empty.
pub fn check_plausible(
    config: &PipelineConfig,
    content: &str,
    value: &Value,
    hint: TaskHint,
) -> Result<(), String> {
    let len = content.trim().chars().count();
    if len <= config.min_plausible_len {
        return Err(format!(
            "Content too short ({} chars, need more than {})",
            len, config.min_plausible_len
        ));
    }

    match hint {
        TaskHint::Code => check_code_wrapper(config, value),
        TaskHint::Json => match value {
            Value::Null => Err("Value is null".to_string()),
            Value::Object(map) if map.is_empty() => Err("Object is empty".to_string()),
            Value::Array(items) if items.is_empty() => Err("Array is empty".to_string()),
            Value::String(s) if s.trim().is_empty() => Err("String is empty".to_string()),
            _ => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mend_domain::CandidateSource;

    #[test]
    fn test_parse_strict_ok() {
        let result = parse_strict("  {\"a\": 1}\n");
        assert_eq!(result, ParseResult::Parsed(json!({"a": 1})));
    }

    #[test]
    fn test_parse_strict_with_bom() {
        assert!(parse_strict("\u{FEFF}[1, 2]").is_parsed());
    }

    #[test]
    fn test_parse_strict_failure_reports_position() {
        let result = parse_strict("{\"a\":1,}");
        let msg = result.error().unwrap();
        assert!(msg.contains("line 1"), "unexpected diagnostic: {}", msg);
    }

    #[test]
    fn test_code_payload_detection() {
        let tagged = Candidate::new("function f(){}", CandidateSource::Tag("generated_code".into()));
        let loose = Candidate::new("function f(){}", CandidateSource::Loose);
        let json_tagged = Candidate::new("{\"correct_code\": \"x\"}", CandidateSource::TaggedFence("json".into()));

        assert!(is_code_payload(&tagged, TaskHint::Code));
        assert!(!is_code_payload(&tagged, TaskHint::Json));
        assert!(!is_code_payload(&loose, TaskHint::Code));
        assert!(!is_code_payload(&json_tagged, TaskHint::Code));
    }

    #[test]
    fn test_wrap_code_uses_configured_fields() {
        let config = PipelineConfig {
            core_field: "code".to_string(),
            explanation_field: "notes".to_string(),
            ..PipelineConfig::default()
        };
        let value = wrap_code(&config, "x = 1", "wrapped");
        assert_eq!(value, json!({"code": "x = 1", "notes": ["wrapped"]}));
    }

    #[test]
    fn test_plausibility_length() {
        let config = PipelineConfig::default();
        let value = json!({"correct_code": "x", "explanation": []});

        assert!(check_plausible(&config, "function f() { return 1; }", &value, TaskHint::Code).is_ok());
        assert!(check_plausible(&config, "// fixed", &value, TaskHint::Code).is_err());
        // Exactly at the threshold is still too short
        assert!(check_plausible(&config, "0123456789", &value, TaskHint::Json).is_err());
        assert!(check_plausible(&config, "0123456789a", &value, TaskHint::Json).is_ok());
    }

    #[test]
    fn test_plausibility_threshold_is_configurable() {
        let config = PipelineConfig {
            min_plausible_len: 3,
            ..PipelineConfig::default()
        };
        let value = json!({"correct_code": "// fixed"});
        assert!(check_plausible(&config, "// fixed", &value, TaskHint::Code).is_ok());
    }

    #[test]
    fn test_plausibility_value_shape() {
        let config = PipelineConfig::default();
        let text = "long enough content";
        assert!(check_plausible(&config, text, &json!({"a": 1}), TaskHint::Json).is_ok());
        assert!(check_plausible(&config, text, &json!({"a": 1}), TaskHint::Code).is_err());
        assert!(check_plausible(&config, text, &json!({"correct_code": " "}), TaskHint::Code).is_err());
        assert!(check_plausible(&config, text, &json!({}), TaskHint::Json).is_err());
        assert!(check_plausible(&config, text, &json!([]), TaskHint::Json).is_err());
        assert!(check_plausible(&config, text, &Value::Null, TaskHint::Json).is_err());
    }

    #[test]
    fn test_code_wrapper_shape() {
        let config = PipelineConfig::default();
        assert!(check_code_wrapper(&config, &json!({"correct_code": "x = 1"})).is_ok());
        assert!(check_code_wrapper(&config, &json!([1, 2])).is_err());
        assert!(check_code_wrapper(&config, &json!({"a": 1})).is_err());
        assert!(check_code_wrapper(&config, &json!({"correct_code": 3})).is_err());
    }
}
