//! Locate the structured payload inside a raw model response
//!
//! Matchers run in a fixed order and the first hit wins:
//! tagged fence, custom tag pair, generic fence. With no hit, fence markers
//! are stripped from the whole text and the remainder is used if it passes a
//! sanity check.

use crate::config::PipelineConfig;
use crate::error::RepairError;
use mend_domain::{Candidate, CandidateSource, TaskHint};
use regex::Regex;

/// One way of finding a payload in text
pub trait Matcher: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Return the first payload this matcher recognizes
    fn try_extract(&self, text: &str) -> Option<Candidate>;
}

/// Fenced block annotated with one of a fixed set of markers
struct TaggedFenceMatcher {
    regex: Regex,
}

impl TaggedFenceMatcher {
    fn new(markers: &[String]) -> Result<Self, RepairError> {
        let alternation = markers
            .iter()
            .map(|m| regex::escape(m))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"(?is)```[ \t]*({})[ \t]*\r?\n(.*?)```", alternation);
        Ok(Self {
            regex: compile(&pattern)?,
        })
    }
}

impl Matcher for TaggedFenceMatcher {
    fn name(&self) -> &str {
        "tagged_fence"
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        self.regex.captures_iter(text).find_map(|caps| {
            let body = caps.get(2)?.as_str().trim();
            if body.is_empty() {
                return None;
            }
            let marker = caps.get(1)?.as_str().to_ascii_lowercase();
            Some(Candidate::new(body, CandidateSource::TaggedFence(marker)))
        })
    }
}

/// `<name> ... </name>` tag pair
struct TagMatcher {
    tag: String,
    regex: Regex,
}

impl TagMatcher {
    fn new(tag: &str) -> Result<Self, RepairError> {
        let escaped = regex::escape(tag);
        let pattern = format!(r"(?is)<{0}>(.*?)</{0}>", escaped);
        Ok(Self {
            tag: tag.to_string(),
            regex: compile(&pattern)?,
        })
    }
}

impl Matcher for TagMatcher {
    fn name(&self) -> &str {
        &self.tag
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        self.regex.captures_iter(text).find_map(|caps| {
            let body = strip_fences(caps.get(1)?.as_str());
            if body.is_empty() {
                return None;
            }
            Some(Candidate::new(body, CandidateSource::Tag(self.tag.clone())))
        })
    }
}

/// Any fenced block, with or without a marker
struct GenericFenceMatcher {
    regex: Regex,
}

impl GenericFenceMatcher {
    fn new() -> Result<Self, RepairError> {
        Ok(Self {
            regex: compile(r"(?s)```[\w+#.-]*[ \t]*\r?\n(.*?)```")?,
        })
    }
}

impl Matcher for GenericFenceMatcher {
    fn name(&self) -> &str {
        "generic_fence"
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        self.regex.captures_iter(text).find_map(|caps| {
            let body = caps.get(1)?.as_str().trim();
            if body.is_empty() {
                return None;
            }
            Some(Candidate::new(body, CandidateSource::GenericFence))
        })
    }
}

fn compile(pattern: &str) -> Result<Regex, RepairError> {
    Regex::new(pattern).map_err(|e| RepairError::Config(format!("Invalid pattern: {}", e)))
}

/// Remove every triple-backtick marker (and a marker word glued to it)
fn strip_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find("```") {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 3..];
        let word_len = rest
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '+' | '#' | '.' | '-')))
            .unwrap_or(rest.len());
        // A marker word is only a marker when a line break follows it
        if word_len > 0 && rest[word_len..].trim_start_matches([' ', '\t']).starts_with(['\n', '\r']) {
            rest = &rest[word_len..];
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Loose candidates must at least look like they carry content
fn passes_sanity_check(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .any(|c| c.is_alphanumeric() || matches!(c, '{' | '}' | '[' | ']'))
}

/// Prioritized fence/tag extraction for both task hints
pub struct FenceExtractor {
    json_matchers: Vec<Box<dyn Matcher>>,
    code_matchers: Vec<Box<dyn Matcher>>,
}

impl FenceExtractor {
    /// Build the matcher lists from configuration
    pub fn new(config: &PipelineConfig) -> Result<Self, RepairError> {
        let json_markers = vec!["json".to_string(), "json5".to_string()];
        let mut code_markers = json_markers.clone();
        code_markers.extend(config.code_languages.iter().cloned());

        Ok(Self {
            json_matchers: Self::build(&json_markers, &config.tag_names)?,
            code_matchers: Self::build(&code_markers, &config.tag_names)?,
        })
    }

    fn build(markers: &[String], tags: &[String]) -> Result<Vec<Box<dyn Matcher>>, RepairError> {
        let mut matchers: Vec<Box<dyn Matcher>> = vec![Box::new(TaggedFenceMatcher::new(markers)?)];
        for tag in tags {
            matchers.push(Box::new(TagMatcher::new(tag)?));
        }
        matchers.push(Box::new(GenericFenceMatcher::new()?));
        Ok(matchers)
    }

    /// Find the payload in `text`, or `None` when nothing usable is there
    pub fn extract(&self, text: &str, hint: TaskHint) -> Option<Candidate> {
        let matchers = match hint {
            TaskHint::Json => &self.json_matchers,
            TaskHint::Code => &self.code_matchers,
        };

        if let Some(candidate) = matchers.iter().find_map(|m| m.try_extract(text)) {
            return Some(candidate);
        }

        let loose = strip_fences(text.trim_start_matches('\u{FEFF}'));
        if passes_sanity_check(&loose) {
            Some(Candidate::new(loose, CandidateSource::Loose))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FenceExtractor {
        FenceExtractor::new(&PipelineConfig::default()).unwrap()
    }

    #[test]
    fn test_json_fence() {
        let text = "Here you go:\n```json\n{\"a\":1}\n```";
        let candidate = extractor().extract(text, TaskHint::Json).unwrap();
        assert_eq!(candidate.content, "{\"a\":1}");
        assert_eq!(candidate.source, CandidateSource::TaggedFence("json".into()));
    }

    #[test]
    fn test_json_fence_beats_earlier_generic_fence() {
        let text = "```\nnot this\n```\nand\n```JSON\n[1,2]\n```";
        let candidate = extractor().extract(text, TaskHint::Json).unwrap();
        assert_eq!(candidate.content, "[1,2]");
        assert_eq!(candidate.source, CandidateSource::TaggedFence("json".into()));
    }

    #[test]
    fn test_code_hint_accepts_language_fence() {
        let text = "```javascript\nfunction f() { return 1; }\n```";
        let candidate = extractor().extract(text, TaskHint::Code).unwrap();
        assert_eq!(candidate.content, "function f() { return 1; }");
        assert_eq!(candidate.source, CandidateSource::TaggedFence("javascript".into()));

        // Same text under the json hint is only a generic fence
        let candidate = extractor().extract(text, TaskHint::Json).unwrap();
        assert_eq!(candidate.source, CandidateSource::GenericFence);
    }

    #[test]
    fn test_language_prefix_does_not_shadow_longer_marker() {
        let text = "```cpp\nint main() {}\n```";
        let candidate = extractor().extract(text, TaskHint::Code).unwrap();
        assert_eq!(candidate.source, CandidateSource::TaggedFence("cpp".into()));
    }

    #[test]
    fn test_tag_pair() {
        let text = "<generated_code>\nfunction f(){return 1}\n</generated_code>";
        let candidate = extractor().extract(text, TaskHint::Code).unwrap();
        assert_eq!(candidate.content, "function f(){return 1}");
        assert_eq!(candidate.source, CandidateSource::Tag("generated_code".into()));
    }

    #[test]
    fn test_tag_pair_with_inner_fence() {
        let text = "<corrected_code>\n```python\nprint(1)\n```\n</corrected_code>";
        let candidate = extractor().extract(text, TaskHint::Json).unwrap();
        assert_eq!(candidate.content, "print(1)");
        assert_eq!(candidate.source, CandidateSource::Tag("corrected_code".into()));
    }

    #[test]
    fn test_tag_order_follows_config() {
        let text = "<json>{\"b\":2}</json><generated_code>x = 1</generated_code>";
        let candidate = extractor().extract(text, TaskHint::Code).unwrap();
        assert_eq!(candidate.source, CandidateSource::Tag("generated_code".into()));
    }

    #[test]
    fn test_generic_fence() {
        let text = "Result:\n```\n{\"ok\": true}\n```\nthanks";
        let candidate = extractor().extract(text, TaskHint::Json).unwrap();
        assert_eq!(candidate.content, "{\"ok\": true}");
        assert_eq!(candidate.source, CandidateSource::GenericFence);
    }

    #[test]
    fn test_empty_fence_is_skipped() {
        let text = "```json\n\n```\n<json>{\"a\":1}</json>";
        let candidate = extractor().extract(text, TaskHint::Json).unwrap();
        assert_eq!(candidate.content, "{\"a\":1}");
    }

    #[test]
    fn test_loose_fallback_without_markers() {
        let text = "  {\"a\": 1} is the answer ";
        let candidate = extractor().extract(text, TaskHint::Json).unwrap();
        assert_eq!(candidate.content, "{\"a\": 1} is the answer");
        assert_eq!(candidate.source, CandidateSource::Loose);
    }

    #[test]
    fn test_loose_fallback_strips_unterminated_fence() {
        let text = "```json\n{\"a\": 1,";
        let candidate = extractor().extract(text, TaskHint::Json).unwrap();
        assert_eq!(candidate.content, "{\"a\": 1,");
        assert_eq!(candidate.source, CandidateSource::Loose);
    }

    #[test]
    fn test_inline_fence_stripped_loosely() {
        let candidate = extractor().extract("```{\"a\":1}```", TaskHint::Json).unwrap();
        assert_eq!(candidate.content, "{\"a\":1}");
    }

    #[test]
    fn test_no_candidate() {
        assert!(extractor().extract("", TaskHint::Json).is_none());
        assert!(extractor().extract("   \n ", TaskHint::Json).is_none());
        assert!(extractor().extract("```\n```", TaskHint::Code).is_none());
        assert!(extractor().extract("... !!! ...", TaskHint::Json).is_none());
    }

    #[test]
    fn test_custom_tags_from_config() {
        let config = PipelineConfig {
            tag_names: vec!["answer".to_string()],
            ..PipelineConfig::default()
        };
        let extractor = FenceExtractor::new(&config).unwrap();
        let candidate = extractor.extract("<ANSWER>[1]</ANSWER>", TaskHint::Json).unwrap();
        assert_eq!(candidate.content, "[1]");
        assert_eq!(candidate.source, CandidateSource::Tag("answer".into()));
    }
}
