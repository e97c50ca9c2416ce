//! Last-resort result when every repair stage fails

use crate::config::PipelineConfig;
use serde_json::{json, Value};

/// Build the placeholder object
///
/// Depends only on configuration (and the raw text when
/// `fallback_preserve_raw` is set), so it cannot fail.
pub fn synthesize(config: &PipelineConfig, raw: &str) -> Value {
    let mut object = serde_json::Map::new();
    object.insert(
        config.core_field.clone(),
        Value::String(config.fallback_code.clone()),
    );
    object.insert(
        config.explanation_field.clone(),
        json!([config.fallback_explanation]),
    );
    if config.fallback_preserve_raw {
        object.insert("raw".to_string(), Value::String(raw.to_string()));
    }
    Value::Object(object)
}
