//! Provider listing

use crate::console::CliConsole;
use colored::*;
use quill_core::AiService;
use std::process::ExitCode;

pub fn run(service: &AiService, json: bool) -> anyhow::Result<ExitCode> {
    let providers = service.list_providers();

    if json {
        println!("{}", serde_json::to_string_pretty(&providers)?);
        return Ok(ExitCode::SUCCESS);
    }

    if providers.is_empty() {
        CliConsole::warn("No providers are enabled; check the configured API keys");
        return Ok(ExitCode::FAILURE);
    }

    CliConsole::print_header("Providers");
    for provider in &providers {
        let capabilities: Vec<String> = provider.capabilities.iter().map(|c| c.to_string()).collect();
        println!(
            "  {:>3}  {:<12} {}",
            provider.priority,
            provider.name.bold(),
            capabilities.join(", ").dimmed()
        );
    }
    println!();
    Ok(ExitCode::SUCCESS)
}
