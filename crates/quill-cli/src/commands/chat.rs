//! Interactive chat loop

use crate::args::GenerationArgs;
use crate::console::CliConsole;
use crate::signal::interrupt_token;
use colored::*;
use quill_core::{AiService, ConversationContext};
use std::io::Write;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "Commands: /clear resets the conversation, /exit quits";

pub async fn run(
    service: &AiService,
    system: Option<String>,
    options: &GenerationArgs,
) -> anyhow::Result<ExitCode> {
    let mut context = ConversationContext::new();
    if let Some(system) = system {
        context = context.with_system_prompt(system);
    }
    let options = options.to_options();

    CliConsole::info(HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", "you>".cyan().bold());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let input = line.trim();
        match input {
            "" => continue,
            "/exit" | "/quit" => break,
            "/help" => {
                CliConsole::info(HELP);
                continue;
            }
            "/clear" => {
                context.history.clear();
                CliConsole::success("Conversation cleared");
                continue;
            }
            _ => {}
        }

        let cancel = interrupt_token();
        let _listener = cancel.clone().drop_guard();
        match service
            .chat_with_cancel(input, &context, options.clone(), cancel)
            .await
        {
            Ok(response) => {
                println!("{} {}", "ai>".magenta().bold(), response.content());
                context.push_exchange(input, response.content());
            }
            // the turn is dropped from history so it can simply be asked again
            Err(error) => CliConsole::orchestration_error(&error),
        }
    }

    println!("Goodbye!");
    Ok(ExitCode::SUCCESS)
}
