//! Configuration loading

use super::model::QuillConfig;
use crate::error::{QuillError, QuillResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Source of configuration data, applied in the order added
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// A TOML or JSON file; `required` files must exist
    File { path: PathBuf, required: bool },
    /// `QUILL_*` environment variables
    Environment,
}

/// Configuration loader with support for multiple sources
#[derive(Debug, Default)]
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Load from a file that must exist
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::File {
            path: path.as_ref().to_path_buf(),
            required: true,
        })
    }

    /// Load from a file if present, otherwise keep defaults
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::File {
            path: path.as_ref().to_path_buf(),
            required: false,
        })
    }

    pub fn with_env(self) -> Self {
        self.add_source(ConfigSource::Environment)
    }

    /// Apply every source over the defaults, then validate
    pub fn load(self) -> QuillResult<QuillConfig> {
        let mut config = QuillConfig::default();

        for source in &self.sources {
            match source {
                ConfigSource::File { path, required } => {
                    if !path.exists() {
                        if *required {
                            return Err(QuillError::io_with_path(
                                "configuration file not found",
                                path.display().to_string(),
                            ));
                        }
                        tracing::debug!(path = %path.display(), "config file not present, using defaults");
                        continue;
                    }
                    tracing::debug!(path = %path.display(), "loading config file");
                    config = load_file(path)?;
                }
                ConfigSource::Environment => {
                    tracing::debug!("applying environment overrides");
                    apply_env_overrides(&mut config, std::env::vars())?;
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn load_file(path: &Path) -> QuillResult<QuillConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        QuillError::io_with_path(
            format!("failed to read config file: {}", e),
            path.display().to_string(),
        )
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|e| {
            QuillError::config_with_context(
                format!("invalid JSON configuration: {}", e),
                path.display().to_string(),
            )
        })
    } else {
        toml::from_str(&content).map_err(|e| {
            QuillError::config_with_context(
                format!("invalid TOML configuration: {}", e),
                path.display().to_string(),
            )
        })
    }
}

/// Apply `QUILL_*` overrides from the given variables.
///
/// Recognized: `QUILL_MAX_PROMPT_CHARS`, `QUILL_MAX_TOKENS`,
/// `QUILL_MAX_ATTEMPTS`, `QUILL_REQUEST_TIMEOUT_SECS`,
/// `QUILL_ATTEMPT_TIMEOUT_SECS`, `QUILL_CONTENT_FILTERING`, `QUILL_RESPONSE_CACHE`,
/// `QUILL_LOG_LEVEL`,
/// `QUILL_LOG_FORMAT`. Unknown `QUILL_*` names are ignored.
pub fn apply_env_overrides<I>(config: &mut QuillConfig, vars: I) -> QuillResult<()>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(name) = key.strip_prefix("QUILL_") else {
            continue;
        };
        let value = value.trim();
        match name {
            "MAX_PROMPT_CHARS" => config.max_prompt_chars = parse_number(&key, value)?,
            "MAX_TOKENS" => config.default_max_tokens = parse_number(&key, value)?,
            "MAX_ATTEMPTS" => config.retry.max_attempts = parse_number(&key, value)?,
            "REQUEST_TIMEOUT_SECS" => {
                config.timeouts.request = Duration::from_secs(parse_number(&key, value)?)
            }
            "ATTEMPT_TIMEOUT_SECS" => {
                config.timeouts.attempt = Duration::from_secs(parse_number(&key, value)?)
            }
            "CONTENT_FILTERING" => config.enable_content_filtering = parse_bool(&key, value)?,
            "RESPONSE_CACHE" => config.cache.enabled = parse_bool(&key, value)?,
            "LOG_LEVEL" => config.logging.level = value.to_string(),
            "LOG_FORMAT" => {
                config.logging.format = value
                    .parse()
                    .map_err(|e: String| QuillError::config_with_context(e, key.clone()))?
            }
            _ => tracing::trace!(variable = %key, "ignoring unknown QUILL_ variable"),
        }
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> QuillResult<T> {
    value
        .parse()
        .map_err(|_| QuillError::config(format!("invalid {} value '{}'", key, value)))
}

fn parse_bool(key: &str, value: &str) -> QuillResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(QuillError::config(format!(
            "invalid {} value '{}'",
            key, value
        ))),
    }
}
