//! CLI argument parsing.

use crate::config::{OutputFormat, ProviderKind};
use clap::Parser;
use mend_domain::TaskHint;
use std::path::PathBuf;

/// Mend - Repair malformed JSON and code responses from language models.
///
/// Reads a raw model response from a file or stdin and prints the repaired
/// structured value.
#[derive(Debug, Parser)]
#[command(name = "mend")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// File holding the raw response (stdin when omitted)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Kind of payload the response should contain
    #[arg(long, value_enum, default_value = "json")]
    pub hint: CliHint,

    /// Model provider used for model-assisted repair
    #[arg(short, long, value_enum)]
    pub provider: Option<CliProvider>,

    /// Model name for the provider
    #[arg(short, long)]
    pub model: Option<String>,

    /// Provider endpoint URL
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "MEND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    pub save_config: bool,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Task hint options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliHint {
    /// A JSON document
    Json,
    /// Code, wrapped in a `{correct_code, explanation}` object
    Code,
}

impl From<CliHint> for TaskHint {
    fn from(hint: CliHint) -> Self {
        match hint {
            CliHint::Json => TaskHint::Json,
            CliHint::Code => TaskHint::Code,
        }
    }
}

/// Provider options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliProvider {
    /// Local stages only, no model calls
    Offline,
    /// Local Ollama server
    Ollama,
    /// Google Gemini API
    Gemini,
}

impl From<CliProvider> for ProviderKind {
    fn from(provider: CliProvider) -> Self {
        match provider {
            CliProvider::Offline => ProviderKind::Offline,
            CliProvider::Ollama => ProviderKind::Ollama,
            CliProvider::Gemini => ProviderKind::Gemini,
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Repaired value as compact JSON
    Json,
    /// Repaired value pretty-printed, followed by the attempts
    Pretty,
    /// Attempts as a table
    Table,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Json => OutputFormat::Json,
            CliFormat::Pretty => OutputFormat::Pretty,
            CliFormat::Table => OutputFormat::Table,
        }
    }
}
