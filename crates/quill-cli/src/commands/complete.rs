//! One-shot completion

use crate::args::GenerationArgs;
use crate::console::CliConsole;
use crate::signal::interrupt_token;
use colored::*;
use quill_core::{AiService, Message};
use std::process::ExitCode;

pub async fn run(
    service: &AiService,
    prompt: String,
    system: Option<String>,
    options: &GenerationArgs,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(prompt));

    let cancel = interrupt_token();
    let _listener = cancel.clone().drop_guard();

    match service
        .complete_with_cancel(messages, options.to_options(), cancel)
        .await
    {
        Ok(response) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.content());
                eprintln!(
                    "{}",
                    format!(
                        "[{} · {} · {} tokens · {} ms · {} attempt(s)]",
                        response.provider(),
                        response.model(),
                        response.tokens_used(),
                        response.latency_ms(),
                        response.attempts()
                    )
                    .dimmed()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&error)?);
            } else {
                CliConsole::orchestration_error(&error);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
