//! Derivation of the launch command from a platform and a parameter selection.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::{Config, Parameter, Platform, Preset};

/// Everything needed to start Ledger Live: the base command, the environment
/// variables to overlay, and the directory to run in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Whitespace-separated program and arguments.
    pub base_command: String,
    /// Environment variables added on top of the inherited environment.
    pub env_vars: BTreeMap<String, String>,
    /// Working directory; empty means the current directory.
    pub working_dir: String,
}

impl CommandSpec {
    /// Splits the base command into program and arguments.
    pub fn program_and_args(&self) -> Option<(&str, Vec<&str>)> {
        let mut parts = self.base_command.split_whitespace();
        let program = parts.next()?;
        Some((program, parts.collect()))
    }

    /// Human-readable form, e.g. `SKIP_ONBOARDING=1 pnpm dev:llm`.
    pub fn display_command(&self) -> String {
        let mut parts: Vec<String> = self
            .env_vars
            .iter()
            .map(|(key, value)| format!("{}={}", key, shell_words::quote(value)))
            .collect();
        parts.push(self.base_command.clone());
        parts.join(" ")
    }
}

/// Splits a `KEY=VALUE` assignment on its first `=`.
///
/// Returns `None` when there is no `=` or the key is empty.
pub fn parse_env_var(raw: &str) -> Option<(&str, &str)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Some((key, value)),
        _ => None,
    }
}

/// Builds the command for `platform_key` with the given parameters applied in order.
///
/// Later parameters win when two of them set the same key. Parameters without a
/// usable assignment are skipped.
pub fn build_command(platform_key: &str, parameters: &[Parameter], config: &Config) -> CommandSpec {
    let platform = Platform::from_key(platform_key);
    let mut env_vars = BTreeMap::new();
    for param in parameters {
        match parse_env_var(&param.env_var) {
            Some((key, value)) => {
                env_vars.insert(key.to_string(), value.to_string());
            }
            None => debug!(parameter = %param.name, "skipping parameter without assignment"),
        }
    }
    CommandSpec {
        base_command: platform.base_command().to_string(),
        env_vars,
        working_dir: config.ledger_live_path.clone(),
    }
}

/// Builds the command for a saved preset, ignoring parameters that no longer exist.
pub fn build_preset_command(preset: &Preset, config: &Config) -> CommandSpec {
    let parameters = config.resolve_parameters(&preset.parameters);
    if parameters.len() != preset.parameters.len() {
        debug!(
            preset = %preset.name,
            missing = preset.parameters.len() - parameters.len(),
            "preset references unknown parameters"
        );
    }
    build_command(&preset.platform, &parameters, config)
}
