//! Command routing logic for CLI

use crate::args::{Cli, Commands};
use crate::commands;
use quill_core::{AiService, EnvSecretStore, QuillConfig};
use std::process::ExitCode;

/// Build the service from `config` and dispatch the subcommand
pub async fn route(cli: Cli, config: QuillConfig) -> anyhow::Result<ExitCode> {
    let service = AiService::from_config(config, &EnvSecretStore)?;
    tracing::debug!(providers = service.list_providers().len(), "service ready");

    match cli.command {
        Commands::Complete {
            prompt,
            system,
            options,
            json,
        } => commands::complete::run(&service, prompt, system, &options, json).await,
        Commands::Chat { system, options } => commands::chat::run(&service, system, &options).await,
        Commands::Health { probe, json } => commands::health::run(&service, probe, json).await,
        Commands::Providers { json } => commands::providers::run(&service, json),
    }
}
