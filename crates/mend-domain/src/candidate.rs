//! Candidate payloads extracted from raw model responses

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What kind of payload the caller expects back from the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskHint {
    /// A JSON document
    #[default]
    Json,
    /// Source code, usually wrapped in a `{correct_code, explanation}` object
    Code,
}

impl fmt::Display for TaskHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskHint::Json => write!(f, "json"),
            TaskHint::Code => write!(f, "code"),
        }
    }
}

impl FromStr for TaskHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(TaskHint::Json),
            "code" => Ok(TaskHint::Code),
            other => Err(format!("Unknown task hint: {}", other)),
        }
    }
}

/// Which matcher located a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum CandidateSource {
    /// Fenced block annotated with a known marker (e.g. ```` ```json ````)
    TaggedFence(String),
    /// Custom `<name>...</name>` tag pair
    Tag(String),
    /// Fenced block with no marker, or a marker we do not recognize
    GenericFence,
    /// Whole response with fence markers stripped
    Loose,
}

impl CandidateSource {
    /// True when the payload was set off by an explicit fence or tag
    pub fn is_delimited(&self) -> bool {
        !matches!(self, CandidateSource::Loose)
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateSource::TaggedFence(marker) => write!(f, "```{} fence", marker),
            CandidateSource::Tag(name) => write!(f, "<{}> tag", name),
            CandidateSource::GenericFence => write!(f, "generic fence"),
            CandidateSource::Loose => write!(f, "loose text"),
        }
    }
}

/// A substring of a raw response that probably holds the structured payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Extracted content, trimmed
    pub content: String,

    /// Matcher that produced the content
    pub source: CandidateSource,
}

impl Candidate {
    /// Create a new candidate
    pub fn new(content: impl Into<String>, source: CandidateSource) -> Self {
        Self {
            content: content.into(),
            source,
        }
    }

    /// Whether the content looks like a JSON object or array
    pub fn is_json_shaped(&self) -> bool {
        let trimmed = self.content.trim_start_matches('\u{FEFF}').trim_start();
        trimmed.starts_with('{') || trimmed.starts_with('[')
    }

    /// Length of the content in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}
