//! Repair command implementation.

use crate::cli::Cli;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::provider::AnyProvider;
use mend_domain::{FinalResult, TaskHint};
use mend_pipeline::RepairPipeline;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info};

/// Fold command-line overrides into the loaded configuration.
pub fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(provider) = cli.provider {
        config.provider.kind = provider.into();
    }
    if let Some(model) = &cli.model {
        config.provider.model = Some(model.clone());
    }
    if let Some(endpoint) = &cli.endpoint {
        config.provider.endpoint = Some(endpoint.clone());
    }
    if let Some(format) = cli.format {
        config.settings.format = format.into();
    }
    if cli.no_color {
        config.settings.color = false;
    }
}

/// Read the raw response from a file, or stdin when no file is given.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    let raw = match path {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    if raw.trim().is_empty() {
        return Err(CliError::InvalidInput("Response is empty".to_string()));
    }
    Ok(raw)
}

/// Run `raw` through a pipeline built from `config`.
pub async fn repair(
    raw: &str,
    hint: TaskHint,
    config: &Config,
    api_key: Option<&str>,
) -> Result<FinalResult> {
    let provider = AnyProvider::from_settings(&config.provider, api_key)?;
    info!("Using provider: {}", provider.describe());

    let mut pipeline_config = config.pipeline.clone();
    if provider.is_offline() {
        pipeline_config.model_repair_enabled = false;
    }

    let pipeline = RepairPipeline::new(provider, pipeline_config)?;
    let result = pipeline.run(raw, hint).await;

    debug!(
        "Resolved by {} after {} attempt(s)",
        result.resolved_by,
        result.diagnostics.len()
    );
    Ok(result)
}

/// Execute the repair command.
pub async fn execute_repair(cli: &Cli, config: &Config, formatter: &Formatter) -> Result<()> {
    let raw = read_input(cli.input.as_deref())?;
    let result = repair(&raw, cli.hint.into(), config, cli.api_key.as_deref()).await?;

    println!("{}", formatter.format_result(&result)?);

    if result.is_fallback() {
        eprintln!(
            "{}",
            formatter.warning("Response could not be repaired; printed the fallback object")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputFormat, ProviderKind};
    use clap::Parser;
    use mend_domain::Strategy;
    use serde_json::json;

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "mend", "--provider", "ollama", "--model", "mistral", "--format", "pretty",
            "--no-color",
        ])
        .unwrap();
        let mut config = Config::default();
        apply_overrides(&cli, &mut config);

        assert_eq!(config.provider.kind, ProviderKind::Ollama);
        assert_eq!(config.provider.model.as_deref(), Some("mistral"));
        assert_eq!(config.settings.format, OutputFormat::Pretty);
        assert!(!config.settings.color);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let cli = Cli::try_parse_from(["mend"]).unwrap();
        let mut config = Config::default();
        config.provider.kind = ProviderKind::Gemini;
        apply_overrides(&cli, &mut config);

        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert!(config.settings.color);
    }

    #[test]
    fn test_read_input_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.txt");
        fs::write(&path, "```json\n{\"a\": 1}\n```").unwrap();

        let raw = read_input(Some(&path)).unwrap();
        assert!(raw.contains("\"a\""));

        fs::write(&path, "  \n").unwrap();
        assert!(matches!(read_input(Some(&path)), Err(CliError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_offline_repair() {
        let config = Config::default();

        let result = repair("```json\n{\"a\": 1,}\n```", TaskHint::Json, &config, None)
            .await
            .unwrap();
        assert_eq!(result.value, json!({"a": 1}));
        assert_eq!(result.resolved_by, Strategy::Structural);

        let result = repair("no json here", TaskHint::Json, &config, None).await.unwrap();
        assert!(result.is_fallback());
    }

    #[tokio::test]
    async fn test_gemini_without_key_is_an_error() {
        let mut config = Config::default();
        config.provider.kind = ProviderKind::Gemini;

        let result = repair("{}", TaskHint::Json, &config, None).await;
        assert!(matches!(result, Err(CliError::Provider(_))));
    }
}
