//! Quill command-line interface
//!
//! A thin shell over `quill-core`: one-shot completions, an interactive chat
//! loop, and provider health and listing commands.
//!
//! # Usage
//!
//! ```bash
//! # One-shot completion
//! quill complete "Write a haiku about autumn rain"
//!
//! # Interactive chat, history kept in memory for the session
//! quill chat --system "You are a poet."
//!
//! # Provider health, probing each provider first
//! quill health --probe
//!
//! # Configured providers as JSON
//! quill providers --json
//! ```
//!
//! Configuration is read from `--config` (TOML or JSON) when given, then
//! overridden from `QUILL_*` environment variables. Provider secrets are read
//! from the environment variables named by each provider's `credentials`.

mod args;
mod commands;
mod console;
mod router;
mod signal;

use args::Cli;
use clap::Parser;
use quill_core::config::LogFormat;
use quill_core::{ConfigLoader, QuillConfig};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let config = loader.with_env().load()?;

    init_tracing(&config, cli.verbose);

    router::route(cli, config).await
}

/// Install the global subscriber; RUST_LOG wins over the configured level
fn init_tracing(config: &QuillConfig, verbose: bool) {
    let fallback = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}
