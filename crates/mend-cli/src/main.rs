//! Mend CLI - Repair malformed structured output from language models.

use clap::Parser;
use mend_cli::commands;
use mend_cli::{Cli, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> mend_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Load config: explicit file must exist, default file is optional
    let mut config = match &cli.config {
        Some(path) if path.exists() || !cli.save_config => Config::load_from(path)?,
        Some(_) => Config::default(),
        None => Config::load()?,
    };

    commands::apply_overrides(&cli, &mut config);

    if cli.save_config {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => Config::path()?,
        };
        config.save_to(&path)?;
        eprintln!("Configuration written to {}", path.display());
        return Ok(());
    }

    let formatter = Formatter::new(config.settings.format, config.settings.color);

    commands::execute_repair(&cli, &config, &formatter).await
}

/// Log to stderr so stdout carries only the repaired value
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
