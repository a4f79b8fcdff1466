//! CLI argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "Quill - route completions across AI providers with retry and fallback")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML or JSON configuration file
    #[arg(long, global = true, env = "QUILL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a single prompt and print the response
    Complete {
        /// Prompt text
        prompt: String,

        /// System prompt sent ahead of the user prompt
        #[arg(long, short)]
        system: Option<String>,

        #[command(flatten)]
        options: GenerationArgs,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive chat; history lives only for this session
    Chat {
        /// System prompt for the whole conversation
        #[arg(long, short)]
        system: Option<String>,

        #[command(flatten)]
        options: GenerationArgs,
    },

    /// Show provider health
    Health {
        /// Probe each provider before reporting
        #[arg(long)]
        probe: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured providers in priority order
    Providers {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Options shared by `complete` and `chat`
#[derive(Args, Debug, Clone, Default)]
pub struct GenerationArgs {
    /// Preferred provider name or model
    #[arg(long, short)]
    pub model: Option<String>,

    /// Maximum tokens to generate
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_complete_with_options() {
        let cli = Cli::try_parse_from([
            "quill",
            "complete",
            "Write a haiku",
            "--system",
            "You are a poet.",
            "--model",
            "claude",
            "--max-tokens",
            "64",
            "--temperature",
            "0.2",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Complete {
                prompt,
                system,
                options,
                json,
            } => {
                assert_eq!(prompt, "Write a haiku");
                assert_eq!(system.as_deref(), Some("You are a poet."));
                assert_eq!(options.model.as_deref(), Some("claude"));
                assert_eq!(options.max_tokens, Some(64));
                assert_eq!(options.temperature, Some(0.2));
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["quill", "health", "--probe", "--config", "quill.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("quill.toml")));
        assert!(matches!(
            cli.command,
            Commands::Health {
                probe: true,
                json: false
            }
        ));
    }

    #[test]
    fn test_complete_requires_prompt() {
        assert!(Cli::try_parse_from(["quill", "complete"]).is_err());
    }
}
