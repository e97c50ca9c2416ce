//! Local structural repair of near-valid JSON
//!
//! A single forward scan over the input that rewrites the common ways model
//! output misses strict JSON: prose around the document, comments, single
//! quotes, bare keys, Python literals, raw control characters and bad
//! escapes in strings, trailing commas, and unterminated strings or brackets.
//! Each scan is linear in the input. When prose holds several brackets,
//! up to [`MAX_STARTS`] of them are tried as the document start and the
//! widest value that parses wins.

use crate::parser::parse_strict;
use mend_domain::ParseResult;

/// Bracket positions tried as the start of the document
pub const MAX_STARTS: usize = 64;

/// Rewrite `text` into something closer to strict JSON
pub fn repair_json(text: &str) -> String {
    structural_repair(text).0
}

/// Repair then parse strictly
///
/// Every `{` or `[` outside an already scanned value is a possible start.
/// Among the starts whose repair parses, the one spanning the most input
/// is kept, so a stray `[1]` in leading prose loses to the object after it.
/// When nothing parses, the repair from the first start is reported.
pub fn structural_repair(text: &str) -> (String, ParseResult) {
    let input = text.trim_start_matches('\u{FEFF}').trim();
    let starts: Vec<usize> = input
        .match_indices(['{', '['])
        .map(|(idx, _)| idx)
        .take(MAX_STARTS)
        .collect();

    if starts.is_empty() {
        let repaired = Scanner::new(input).run().text;
        let result = parse_strict(&repaired);
        return (repaired, result);
    }

    let mut best: Option<(usize, String, ParseResult)> = None;
    let mut first_failure: Option<(String, ParseResult)> = None;
    let mut covered_until = 0;

    for start in starts {
        if start < covered_until {
            continue;
        }
        let scan = Scanner::new(&input[start..]).run();
        covered_until = start + scan.consumed;
        let result = parse_strict(&scan.text);
        if result.is_parsed() {
            let wider = best.as_ref().is_none_or(|(span, _, _)| scan.consumed > *span);
            if wider {
                best = Some((scan.consumed, scan.text, result));
            }
        } else if first_failure.is_none() {
            first_failure = Some((scan.text, result));
        }
    }

    match (best, first_failure) {
        (Some((_, repaired, result)), _) => (repaired, result),
        (None, Some(failure)) => failure,
        (None, None) => (
            String::new(),
            ParseResult::Failed("No bracket to repair from".to_string()),
        ),
    }
}

struct Scan {
    text: String,
    /// Input bytes read before the scan stopped
    consumed: usize,
}

struct OpenString {
    quote: char,
    /// Byte offset of the opening `"` in the output
    start: usize,
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    out: String,
    /// Closers still owed, innermost last
    stack: Vec<char>,
    string: Option<OpenString>,
}

impl Scanner {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            out: String::with_capacity(input.len() + 8),
            stack: Vec::new(),
            string: None,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(mut self) -> Scan {
        while self.pos < self.chars.len() {
            if self.string.is_some() {
                self.scan_string_char();
            } else if self.scan_structural_char() {
                // Top-level value closed; anything after it is prose
                break;
            }
        }
        let end = self.pos.min(self.chars.len());
        let consumed = self.chars[..end].iter().map(|c| c.len_utf8()).sum();
        Scan {
            text: self.finish(),
            consumed,
        }
    }

    fn scan_string_char(&mut self) {
        let c = self.chars[self.pos];
        let quote = match &self.string {
            Some(s) => s.quote,
            None => return,
        };

        if c == '\\' {
            self.scan_escape();
            return;
        }

        if c == quote {
            self.out.push('"');
            self.string = None;
        } else {
            match c {
                '"' => self.out.push_str("\\\""),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if (c as u32) < 0x20 => self.out.push_str(&format!("\\u{:04x}", c as u32)),
                c => self.out.push(c),
            }
        }
        self.pos += 1;
    }

    fn scan_escape(&mut self) {
        match self.peek(1) {
            Some(n @ ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't')) => {
                self.out.push('\\');
                self.out.push(n);
                self.pos += 2;
            }
            Some('u') if (2..6).all(|k| self.peek(k).is_some_and(|h| h.is_ascii_hexdigit())) => {
                self.out.push_str("\\u");
                for k in 2..6 {
                    if let Some(h) = self.peek(k) {
                        self.out.push(h);
                    }
                }
                self.pos += 6;
            }
            Some('\'') => {
                self.out.push('\'');
                self.pos += 2;
            }
            // Unknown escape or trailing backslash: drop the backslash
            _ => self.pos += 1,
        }
    }

    /// Returns true once the outermost container has been closed
    fn scan_structural_char(&mut self) -> bool {
        let c = self.chars[self.pos];
        match c {
            '"' | '\'' => {
                self.string = Some(OpenString {
                    quote: c,
                    start: self.out.len(),
                });
                self.out.push('"');
                self.pos += 1;
            }
            '{' => {
                self.stack.push('}');
                self.out.push('{');
                self.pos += 1;
            }
            '[' => {
                self.stack.push(']');
                self.out.push('[');
                self.pos += 1;
            }
            '}' | ']' => {
                self.pos += 1;
                if self.stack.contains(&c) {
                    self.close_through(c);
                    return self.stack.is_empty();
                }
                // Stray closer
            }
            '/' if self.peek(1) == Some('/') => {
                while self.pos < self.chars.len() && self.chars[self.pos] != '\n' {
                    self.pos += 1;
                }
            }
            '/' if self.peek(1) == Some('*') => {
                self.pos += 2;
                while self.pos < self.chars.len()
                    && !(self.chars[self.pos] == '*' && self.peek(1) == Some('/'))
                {
                    self.pos += 1;
                }
                self.pos = (self.pos + 2).min(self.chars.len());
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => self.scan_word(),
            c => {
                self.out.push(c);
                self.pos += 1;
            }
        }
        false
    }

    fn scan_word(&mut self) {
        let start = self.pos;
        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        match word.as_str() {
            "true" | "false" | "null" => self.out.push_str(&word),
            "True" => self.out.push_str("true"),
            "False" => self.out.push_str("false"),
            "None" | "undefined" => self.out.push_str("null"),
            _ if self.stack.last() == Some(&'}') && self.next_significant() == Some(':') => {
                self.out.push('"');
                self.out.push_str(&word);
                self.out.push('"');
            }
            _ => self.out.push_str(&word),
        }
    }

    fn next_significant(&self) -> Option<char> {
        self.chars[self.pos..].iter().copied().find(|c| !c.is_whitespace())
    }

    /// Emit closers up to and including `closer`
    fn close_through(&mut self, closer: char) {
        while let Some(top) = self.stack.pop() {
            self.prepare_close();
            self.out.push(top);
            if top == closer {
                break;
            }
        }
    }

    /// Drop a trailing comma and fill a dangling `key:` before a closer
    fn prepare_close(&mut self) {
        let trimmed_len = self.out.trim_end().len();
        self.out.truncate(trimmed_len);
        if self.out.ends_with(',') {
            self.out.pop();
        } else if self.out.ends_with(':') {
            self.out.push_str("null");
        }
    }

    fn finish(mut self) -> String {
        if let Some(open) = self.string.take() {
            self.close_open_string(open);
        }
        while let Some(top) = self.stack.pop() {
            self.prepare_close();
            self.out.push(top);
        }
        self.out
    }

    /// Terminate a string cut off by the end of input
    ///
    /// Closers and commas at the end of the string content were almost
    /// certainly meant as structure, so they are moved back outside.
    fn close_open_string(&mut self, open: OpenString) {
        let content_start = open.start + 1;
        let content = &self.out[content_start..];
        let mut kept = content
            .trim_end_matches(|c: char| c == '}' || c == ']' || c == ',' || c.is_whitespace())
            .len();

        let backslashes = content[..kept].chars().rev().take_while(|&c| c == '\\').count();
        if backslashes % 2 == 1 {
            kept -= 1;
        }

        let tail: String = content[kept..].to_string();
        self.out.truncate(content_start + kept);
        self.out.push('"');

        for c in tail.chars() {
            if (c == '}' || c == ']') && self.stack.contains(&c) {
                self.close_through(c);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn repaired_value(text: &str) -> Value {
        match structural_repair(text).1 {
            ParseResult::Parsed(v) => v,
            ParseResult::Failed(e) => panic!("repair of {:?} failed: {}", text, e),
        }
    }

    #[test]
    fn test_trailing_comma() {
        assert_eq!(repaired_value("{\"a\":1,}"), json!({"a": 1}));
        assert_eq!(repaired_value("[1, 2, 3, ]"), json!([1, 2, 3]));
        assert_eq!(repaired_value("{\"a\": [1,], }"), json!({"a": [1]}));
    }

    #[test]
    fn test_unbalanced_quote() {
        assert_eq!(repaired_value("{\"a\":\"hello}"), json!({"a": "hello"}));
        assert_eq!(repaired_value("{\"a\": [\"x\", \"y]}"), json!({"a": ["x", "y"]}));
    }

    #[test]
    fn test_missing_closers() {
        assert_eq!(repaired_value("{\"a\": {\"b\": [1, 2"), json!({"a": {"b": [1, 2]}}));
        assert_eq!(repaired_value("{\"a\":"), json!({"a": null}));
    }

    #[test]
    fn test_mismatched_closer() {
        assert_eq!(repaired_value("{\"a\": [1, 2}"), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_stray_closer_dropped() {
        assert_eq!(repaired_value("[1, 2]]"), json!([1, 2]));
        assert_eq!(repaired_value("{\"a\": 1}}"), json!({"a": 1}));
    }

    #[test]
    fn test_surrounding_prose() {
        let text = "Sure! Here is the object: {\"a\": 1} Let me know if you need more.";
        assert_eq!(repaired_value(text), json!({"a": 1}));
    }

    #[test]
    fn test_bracket_in_prose_before_document() {
        let text = "See note [1]: the answer is {\"a\": 1, \"b\": 2,}";
        assert_eq!(repaired_value(text), json!({"a": 1, "b": 2}));

        let text = "Per [RFC 8259] the object is {\"ok\": true}";
        assert_eq!(repaired_value(text), json!({"ok": true}));
    }

    #[test]
    fn test_unparseable_start_skipped() {
        let text = "{ see below } then [1, 2, 3,]";
        assert_eq!(repaired_value(text), json!([1, 2, 3]));
    }

    #[test]
    fn test_nested_brackets_not_tried_alone() {
        let text = "Result: {\"items\": [1, 2], \"more\": {\"x\": [3]}} done";
        assert_eq!(
            repaired_value(text),
            json!({"items": [1, 2], "more": {"x": [3]}})
        );
    }

    #[test]
    fn test_single_quotes_and_bare_keys() {
        assert_eq!(
            repaired_value("{name: 'Ada', 'langs': ['en', \"fr\"]}"),
            json!({"name": "Ada", "langs": ["en", "fr"]})
        );
        assert_eq!(repaired_value("{'quote': 'say \"hi\"'}"), json!({"quote": "say \"hi\""}));
        assert_eq!(repaired_value("{'it': 'it\\'s'}"), json!({"it": "it's"}));
    }

    #[test]
    fn test_python_literals() {
        assert_eq!(
            repaired_value("{\"a\": True, \"b\": False, \"c\": None}"),
            json!({"a": true, "b": false, "c": null})
        );
    }

    #[test]
    fn test_comments_removed() {
        let text = "{\n  // the answer\n  \"a\": 1, /* inline */ \"b\": \"http://x\"\n}";
        assert_eq!(repaired_value(text), json!({"a": 1, "b": "http://x"}));
    }

    #[test]
    fn test_control_characters_escaped() {
        let text = "{\"correct_code\": \"function f() {\n\treturn 1;\n}\"}";
        assert_eq!(
            repaired_value(text),
            json!({"correct_code": "function f() {\n\treturn 1;\n}"})
        );
    }

    #[test]
    fn test_invalid_escape_dropped() {
        assert_eq!(repaired_value(r#"{"path": "C:\data\x"}"#), json!({"path": "C:datax"}));
        assert_eq!(repaired_value(r#"{"s": "\u00e9\n"}"#), json!({"s": "é\n"}));
    }

    #[test]
    fn test_numbers_untouched() {
        assert_eq!(repaired_value("{\"n\": -1.5e3, \"m\": 2,}"), json!({"n": -1500.0, "m": 2}));
    }

    #[test]
    fn test_garbage_still_fails() {
        let (_, result) = structural_repair("this is not json at all");
        assert!(!result.is_parsed());
        let (_, result) = structural_repair("");
        assert!(!result.is_parsed());
    }

    #[test]
    fn test_valid_json_unchanged() {
        let text = r#"{"a":[1,2,{"b":"c, d}"}],"e":null}"#;
        assert_eq!(repair_json(text), text);
    }

    fn simple_object() -> impl Strategy<Value = Value> {
        prop::collection::btree_map(
            "[a-z]{1,8}",
            prop_oneof![
                any::<i64>().prop_map(Value::from),
                any::<bool>().prop_map(Value::from),
                "[a-zA-Z0-9 ,:{}\\[\\]']{0,12}".prop_map(Value::from),
            ],
            0..6,
        )
        .prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    proptest! {
        #[test]
        fn prop_repair_never_panics(input in "\\PC{0,200}") {
            let _ = structural_repair(&input);
        }

        #[test]
        fn prop_repair_preserves_valid_json(value in simple_object()) {
            let text = serde_json::to_string(&value).unwrap();
            let (_, result) = structural_repair(&text);
            prop_assert_eq!(result, ParseResult::Parsed(value));
        }

        #[test]
        fn prop_trailing_comma_removed(value in simple_object()) {
            let text = serde_json::to_string(&value).unwrap();
            if text.len() > 2 {
                let broken = format!("{},}}", &text[..text.len() - 1]);
                let (_, result) = structural_repair(&broken);
                prop_assert_eq!(result, ParseResult::Parsed(value));
            }
        }
    }
}
