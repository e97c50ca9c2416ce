//! Prompts for model-assisted repair

use crate::config::PipelineConfig;
use mend_domain::TaskHint;

const CODE_CORRECTION_INSTRUCTIONS: &str = "\
The following code was produced by a previous step but could not be delivered \
because its surrounding formatting was broken. Return ONLY the corrected code. \
Do not wrap it in JSON, do not add markdown fences, do not add any commentary.";

const JSON_CORRECTION_INSTRUCTIONS: &str = "\
The following text was meant to be a single valid JSON document but it does not \
parse. Return ONLY the corrected JSON. Keep every key and value that can be \
recovered. Do not add markdown fences or commentary.";

const WRAPPER_INSTRUCTIONS: &str = "\
Your previous answer could not be parsed. Respond with the complete result as \
strictly valid JSON inside a single ```json fenced block and nothing else.";

/// Builds prompts for the two model-assisted repair requests
pub struct PromptBuilder<'a> {
    config: &'a PipelineConfig,
    hint: TaskHint,
    payload: &'a str,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder for `payload`
    pub fn new(config: &'a PipelineConfig, hint: TaskHint, payload: &'a str) -> Self {
        Self {
            config,
            hint,
            payload,
        }
    }

    /// First request: the corrected raw content only
    pub fn correction(&self) -> String {
        let instructions = match self.hint {
            TaskHint::Code => CODE_CORRECTION_INSTRUCTIONS,
            TaskHint::Json => JSON_CORRECTION_INSTRUCTIONS,
        };

        let mut prompt = String::with_capacity(instructions.len() + self.payload.len() + 32);
        prompt.push_str(instructions);
        prompt.push_str("\n\n---\n");
        prompt.push_str(self.payload);
        prompt.push_str("\n---\n");
        prompt
    }

    /// Second request: the entire structured wrapper
    pub fn wrapper(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str(WRAPPER_INSTRUCTIONS);
        prompt.push_str("\n\n");

        if self.hint == TaskHint::Code {
            prompt.push_str(&format!(
                "Use exactly this shape:\n```json\n{{\"{}\": \"<the complete code as one JSON string>\", \"{}\": [\"<short note>\"]}}\n```\n",
                self.config.core_field, self.config.explanation_field
            ));
            prompt.push_str("Escape newlines and quotes inside the code string.\n\n");
        }

        prompt.push_str("Previous answer:\n---\n");
        prompt.push_str(self.payload);
        prompt.push_str("\n---\n");
        prompt
    }

    /// JSON schema passed along with the wrapper request
    pub fn wrapper_schema(&self) -> String {
        match self.hint {
            TaskHint::Code => format!(
                r#"{{"type":"object","properties":{{"{core}":{{"type":"string"}},"{expl}":{{"type":"array","items":{{"type":"string"}}}}}},"required":["{core}","{expl}"]}}"#,
                core = self.config.core_field,
                expl = self.config.explanation_field
            ),
            TaskHint::Json => r#"{"type":["object","array"]}"#.to_string(),
        }
    }
}

/// Recover the code body from a (possibly broken) code wrapper
///
/// Looks for `"<core_field>": "` and reads up to the closing quote, or to the
/// end of input when the string was cut off. Returns `None` when the field
/// is absent.
pub fn extract_code_body(text: &str, core_field: &str) -> Option<String> {
    let key = format!("\"{}\"", core_field);
    let after_key = &text[text.find(&key)? + key.len()..];
    let after_colon = after_key.trim_start().strip_prefix(':')?.trim_start();
    let body = after_colon.strip_prefix('"')?;

    let mut raw = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => raw.push('\n'),
                Some('t') => raw.push('\t'),
                Some('r') => raw.push('\r'),
                Some('u') => {
                    let hex: String = chars.by_ref().take(4).collect();
                    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        Some(ch) => raw.push(ch),
                        None => {
                            raw.push_str("\\u");
                            raw.push_str(&hex);
                        }
                    }
                }
                Some(other) => raw.push(other),
                None => break,
            },
            '"' => break,
            c => raw.push(c),
        }
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
