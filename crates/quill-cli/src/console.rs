//! Console output utilities

use colored::*;
use quill_core::{OrchestrationError, UserFriendlyError};

/// Console helper for consistent CLI output
pub struct CliConsole;

impl CliConsole {
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue().bold(), message);
    }

    pub fn success(message: &str) {
        println!("{} {}", "✓".green().bold(), message);
    }

    pub fn warn(message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message);
    }

    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }

    pub fn print_header(title: &str) {
        println!();
        println!("{}", title.bold().underline());
        println!("{}", "=".repeat(title.chars().count().max(20)).dimmed());
    }

    /// Report a failed call the way an end user should see it
    pub fn orchestration_error(error: &OrchestrationError) {
        let friendly = UserFriendlyError::from(error);
        Self::error(&friendly.format_display());
        for failure in error.failures() {
            eprintln!(
                "    {} {} ({}, {} attempt{})",
                "-".dimmed(),
                failure.provider,
                failure.kind.as_str(),
                failure.attempts,
                if failure.attempts == 1 { "" } else { "s" }
            );
        }
        if friendly.retry_offered {
            eprintln!("  {}", "You can retry this request.".dimmed());
        }
    }
}
