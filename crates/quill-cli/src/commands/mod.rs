//! Command implementations

pub mod chat;
pub mod complete;
pub mod health;
pub mod providers;

use crate::args::GenerationArgs;
use quill_core::CompletionOptions;

impl GenerationArgs {
    /// Only the flags the user gave; the engine fills in the rest
    pub fn to_options(&self) -> CompletionOptions {
        let mut options = CompletionOptions::new();
        if let Some(model) = &self.model {
            options = options.with_model(model.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            options = options.with_temperature(temperature);
        }
        options
    }
}
