//! Provider health report

use crate::console::CliConsole;
use colored::*;
use quill_core::health::{HealthStatus, ProviderHealth};
use quill_core::AiService;
use std::process::ExitCode;

pub async fn run(service: &AiService, probe: bool, json: bool) -> anyhow::Result<ExitCode> {
    if probe {
        let timeout = service.config().timeouts.attempt;
        let results = service
            .health_monitor()
            .probe_all(service.registry(), timeout)
            .await;
        if !json {
            for (name, ok) in &results {
                if *ok {
                    CliConsole::success(&format!("{name} answered the probe"));
                } else {
                    CliConsole::warn(&format!("{name} failed the probe"));
                }
            }
        }
    }

    let snapshot = service.get_provider_health();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else if snapshot.is_empty() {
        CliConsole::warn("No providers are configured");
    } else {
        CliConsole::print_header("Provider Health");
        for health in snapshot.values() {
            print_row(health);
        }
        println!();
    }

    let any_usable = snapshot
        .values()
        .any(|h| h.status != HealthStatus::Unhealthy);
    Ok(if any_usable {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn status_icon(status: HealthStatus) -> ColoredString {
    match status {
        HealthStatus::Healthy => "✓".green().bold(),
        HealthStatus::Degraded => "⚠".yellow().bold(),
        HealthStatus::Unhealthy => "✗".red().bold(),
    }
}

fn print_row(health: &ProviderHealth) {
    let latency = health
        .avg_latency_ms
        .map(|ms| format!("{ms} ms avg"))
        .unwrap_or_else(|| "no samples".to_string());
    println!(
        "{} {:<12} {:<10} {:>6.1}% ok  {:<12} {} failures in a row",
        status_icon(health.status),
        health.provider_name.bold(),
        health.status.to_string(),
        health.success_rate() * 100.0,
        latency,
        health.consecutive_failures
    );
    if let Some(kind) = health.last_error_kind {
        println!("    {}", format!("last error: {}", kind.as_str()).dimmed());
    }
}
