//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use mend_domain::{FinalResult, ParseResult, RepairAttempt};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Longest detail shown in a table cell
const MAX_DETAIL_CHARS: usize = 60;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a pipeline result.
    pub fn format_result(&self, result: &FinalResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string(&result.value)?),
            OutputFormat::Pretty => self.format_pretty(result),
            OutputFormat::Table => Ok(self.format_attempts_table(&result.diagnostics)),
        }
    }

    fn format_pretty(&self, result: &FinalResult) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&result.value)?;
        out.push_str("\n\n");

        let status = format!("Resolved by {}", result.resolved_by);
        if result.is_fallback() {
            out.push_str(&self.colorize(&status, "yellow"));
        } else {
            out.push_str(&self.colorize(&status, "green"));
        }
        out.push('\n');

        for attempt in &result.diagnostics {
            out.push_str(&self.attempt_line(attempt));
            out.push('\n');
        }
        Ok(out.trim_end().to_string())
    }

    fn attempt_line(&self, attempt: &RepairAttempt) -> String {
        let mark = if attempt.succeeded() {
            self.colorize("✓", "green")
        } else {
            self.colorize("✗", "red")
        };
        let mut line = format!("  {} {}", mark, attempt.strategy);
        if let ParseResult::Failed(msg) = &attempt.result {
            line.push_str(": ");
            line.push_str(msg);
        }
        if let Some(note) = &attempt.note {
            line.push_str(&format!(" ({})", note));
        }
        line
    }

    /// Format attempts as a table.
    fn format_attempts_table(&self, attempts: &[RepairAttempt]) -> String {
        if attempts.is_empty() {
            return self.colorize("No attempts recorded.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["#", "Strategy", "Outcome", "Detail"]);

        for (i, attempt) in attempts.iter().enumerate() {
            let outcome = if attempt.succeeded() { "ok" } else { "failed" };
            let detail = match (&attempt.result, &attempt.note) {
                (ParseResult::Failed(msg), _) => msg.as_str(),
                (ParseResult::Parsed(_), Some(note)) => note.as_str(),
                (ParseResult::Parsed(_), None) => "",
            };
            builder.push_record([
                (i + 1).to_string(),
                attempt.strategy.to_string(),
                outcome.to_string(),
                truncate(detail, MAX_DETAIL_CHARS),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        table.to_string()
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
