//! Parameter and preset bookkeeping.
//!
//! Every mutation validates its input first, so a rejected call leaves the
//! configuration untouched. Presets reference parameters by name only; removing
//! or renaming a parameter never rewrites presets.

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::command::parse_env_var;
use crate::config::{Config, Parameter, Platform, Preset};

/// Input rejected before it reaches the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("parameter name cannot be empty")]
    EmptyParameterName,
    #[error("parameter '{0}' already exists")]
    DuplicateParameter(String),
    #[error("environment variable cannot be empty")]
    EmptyEnvVar,
    #[error("environment variable must include '=' (e.g., VAR_NAME=value)")]
    MissingAssignment,
    #[error("environment variable name cannot be empty")]
    EmptyKey,
    #[error("preset name cannot be empty")]
    EmptyPresetName,
    #[error("preset '{0}' already exists")]
    DuplicatePreset(String),
    #[error("parameter '{0}' not found")]
    UnknownParameter(String),
    #[error("preset '{0}' not found")]
    UnknownPreset(String),
    #[error("ledger-live path cannot be empty")]
    EmptyPath,
    #[error("path must be absolute (start with / or C:\\)")]
    RelativePath,
}

/// Checks a parameter name. `current` is the name of the parameter being edited, if any.
pub fn validate_parameter_name(
    name: &str,
    existing: &[Parameter],
    current: Option<&str>,
) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyParameterName);
    }
    if current != Some(name) && existing.iter().any(|param| param.name == name) {
        return Err(ValidationError::DuplicateParameter(name.to_string()));
    }
    Ok(())
}

/// Accepts exactly what the command builder will apply: `KEY=VALUE` with a non-empty key.
pub fn validate_env_var(raw: &str) -> Result<(), ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::EmptyEnvVar);
    }
    if !raw.contains('=') {
        return Err(ValidationError::MissingAssignment);
    }
    if parse_env_var(raw).is_none() {
        return Err(ValidationError::EmptyKey);
    }
    Ok(())
}

/// Checks a preset name. `current` is the name of the preset being edited, if any.
pub fn validate_preset_name(
    name: &str,
    existing: &[Preset],
    current: Option<&str>,
) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyPresetName);
    }
    if current != Some(name) && existing.iter().any(|preset| preset.name == name) {
        return Err(ValidationError::DuplicatePreset(name.to_string()));
    }
    Ok(())
}

pub fn validate_ledger_live_path(raw: &str) -> Result<(), ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyPath);
    }
    if !Path::new(trimmed).is_absolute() {
        return Err(ValidationError::RelativePath);
    }
    Ok(())
}

fn normalized(draft: Parameter) -> Parameter {
    Parameter {
        name: draft.name.trim().to_string(),
        env_var: draft.env_var.trim().to_string(),
        description: draft.description.trim().to_string(),
    }
}

impl Config {
    pub fn find_parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|param| param.name == name)
    }

    pub fn find_preset(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|preset| preset.name == name)
    }

    /// Appends a new parameter.
    pub fn add_parameter(&mut self, draft: Parameter) -> Result<&Parameter, ValidationError> {
        validate_parameter_name(&draft.name, &self.parameters, None)?;
        validate_env_var(&draft.env_var)?;
        self.parameters.push(normalized(draft));
        let index = self.parameters.len() - 1;
        Ok(&self.parameters[index])
    }

    /// Replaces the parameter named `current_name`, keeping its position.
    pub fn update_parameter(
        &mut self,
        current_name: &str,
        draft: Parameter,
    ) -> Result<(), ValidationError> {
        let index = self
            .parameters
            .iter()
            .position(|param| param.name == current_name)
            .ok_or_else(|| ValidationError::UnknownParameter(current_name.to_string()))?;
        validate_parameter_name(&draft.name, &self.parameters, Some(current_name))?;
        validate_env_var(&draft.env_var)?;
        self.parameters[index] = normalized(draft);
        Ok(())
    }

    /// Removes every parameter whose name is listed. Returns how many were removed.
    pub fn remove_parameters(&mut self, names: &[String]) -> usize {
        let doomed: HashSet<&str> = names.iter().map(String::as_str).collect();
        let before = self.parameters.len();
        self.parameters
            .retain(|param| !doomed.contains(param.name.as_str()));
        before - self.parameters.len()
    }

    /// Appends a new preset.
    pub fn add_preset(
        &mut self,
        name: &str,
        platform: Platform,
        parameters: Vec<String>,
    ) -> Result<&Preset, ValidationError> {
        validate_preset_name(name, &self.presets, None)?;
        self.presets.push(Preset {
            name: name.trim().to_string(),
            platform: platform.key().to_string(),
            parameters,
        });
        let index = self.presets.len() - 1;
        Ok(&self.presets[index])
    }

    /// Replaces the preset named `current_name`, keeping its position.
    pub fn update_preset(
        &mut self,
        current_name: &str,
        name: &str,
        platform: Platform,
        parameters: Vec<String>,
    ) -> Result<(), ValidationError> {
        let index = self
            .presets
            .iter()
            .position(|preset| preset.name == current_name)
            .ok_or_else(|| ValidationError::UnknownPreset(current_name.to_string()))?;
        validate_preset_name(name, &self.presets, Some(current_name))?;
        self.presets[index] = Preset {
            name: name.trim().to_string(),
            platform: platform.key().to_string(),
            parameters,
        };
        Ok(())
    }

    /// Removes every preset whose name is listed. Returns how many were removed.
    pub fn remove_presets(&mut self, names: &[String]) -> usize {
        let doomed: HashSet<&str> = names.iter().map(String::as_str).collect();
        let before = self.presets.len();
        self.presets
            .retain(|preset| !doomed.contains(preset.name.as_str()));
        before - self.presets.len()
    }

    /// Looks up parameters by name in the given order. Unknown names are skipped.
    pub fn resolve_parameters(&self, names: &[String]) -> Vec<Parameter> {
        names
            .iter()
            .filter_map(|name| self.find_parameter(name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;

    fn param(name: &str, env_var: &str) -> Parameter {
        Parameter {
            name: name.to_string(),
            env_var: env_var.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn duplicate_parameter_is_rejected_without_mutation() {
        let mut config = default_config();
        let before = config.clone();

        let err = config
            .add_parameter(param("Bypass CORS", "OTHER=1"))
            .unwrap_err();

        assert_eq!(err, ValidationError::DuplicateParameter("Bypass CORS".into()));
        assert_eq!(config, before);
    }

    #[test]
    fn parameter_names_are_case_sensitive() {
        let mut config = default_config();
        config
            .add_parameter(param("bypass cors", "BYPASS_CORS=0"))
            .unwrap();
        assert_eq!(config.parameters.len(), 4);
    }

    #[test]
    fn add_parameter_trims_and_appends() {
        let mut config = default_config();
        let added = config
            .add_parameter(Parameter {
                name: "  Debug  ".into(),
                env_var: " DEBUG=1 ".into(),
                description: " verbose ".into(),
            })
            .unwrap()
            .clone();
        assert_eq!(added, Parameter {
            name: "Debug".into(),
            env_var: "DEBUG=1".into(),
            description: "verbose".into(),
        });
        assert_eq!(config.parameters.last(), Some(&added));
    }

    #[test]
    fn env_var_needs_assignment() {
        let mut config = default_config();
        assert_eq!(
            config.add_parameter(param("Debug", "DEBUG")).unwrap_err(),
            ValidationError::MissingAssignment
        );
        assert_eq!(validate_env_var("  "), Err(ValidationError::EmptyEnvVar));
        assert_eq!(validate_env_var("A=b=c"), Ok(()));
        assert_eq!(validate_env_var("A="), Ok(()));
        assert_eq!(validate_env_var("=1"), Err(ValidationError::EmptyKey));
        assert_eq!(validate_env_var(" =1"), Err(ValidationError::EmptyKey));
        assert_eq!(
            config.add_parameter(param("Empty key", "=1")).unwrap_err(),
            ValidationError::EmptyKey
        );
        assert_eq!(config.parameters.len(), 3);
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(
            validate_parameter_name("   ", &[], None),
            Err(ValidationError::EmptyParameterName)
        );
        assert_eq!(
            validate_preset_name("", &[], None),
            Err(ValidationError::EmptyPresetName)
        );
    }

    #[test]
    fn editing_may_keep_own_name_but_not_take_another() {
        let mut config = default_config();
        config
            .update_parameter("Bypass CORS", param("Bypass CORS", "BYPASS_CORS=0"))
            .unwrap();
        assert_eq!(config.parameters[2].env_var, "BYPASS_CORS=0");

        let err = config
            .update_parameter("Bypass CORS", param("Skip onboarding", "X=1"))
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateParameter("Skip onboarding".into()));
    }

    #[test]
    fn update_unknown_parameter_fails() {
        let mut config = default_config();
        assert_eq!(
            config.update_parameter("Nope", param("Nope", "A=1")),
            Err(ValidationError::UnknownParameter("Nope".into()))
        );
    }

    #[test]
    fn removing_parameter_leaves_preset_reference_dangling() {
        let mut config = default_config();
        config
            .add_preset(
                "Mobile",
                Platform::Mobile,
                vec!["Skip onboarding".into(), "Bypass CORS".into()],
            )
            .unwrap();

        let removed = config.remove_parameters(&["Bypass CORS".to_string()]);

        assert_eq!(removed, 1);
        assert_eq!(
            config.presets[0].parameters,
            vec!["Skip onboarding".to_string(), "Bypass CORS".to_string()]
        );
        let resolved = config.resolve_parameters(&config.presets[0].parameters);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "Skip onboarding");
    }

    #[test]
    fn renaming_parameter_does_not_touch_presets() {
        let mut config = default_config();
        config
            .add_preset("Mobile", Platform::Mobile, vec!["Bypass CORS".into()])
            .unwrap();
        config
            .update_parameter("Bypass CORS", param("CORS off", "BYPASS_CORS=1"))
            .unwrap();
        assert_eq!(config.presets[0].parameters, vec!["Bypass CORS".to_string()]);
        assert!(config.resolve_parameters(&config.presets[0].parameters).is_empty());
    }

    #[test]
    fn preset_crud() {
        let mut config = default_config();
        config.add_preset(" Desk ", Platform::Desktop, vec![]).unwrap();
        assert_eq!(config.presets[0].name, "Desk");
        assert_eq!(config.presets[0].platform, "desktop");

        assert_eq!(
            config
                .add_preset("Desk", Platform::Mobile, vec![])
                .unwrap_err(),
            ValidationError::DuplicatePreset("Desk".into())
        );

        config
            .update_preset("Desk", "Phone", Platform::Mobile, vec!["Bypass CORS".into()])
            .unwrap();
        let preset = config.find_preset("Phone").unwrap();
        assert_eq!(preset.platform, "mobile");
        assert_eq!(preset.parameters, vec!["Bypass CORS".to_string()]);

        assert_eq!(config.remove_presets(&["Phone".into(), "Ghost".into()]), 1);
        assert!(config.presets.is_empty());
    }

    #[test]
    fn resolve_keeps_requested_order() {
        let config = default_config();
        let names = vec!["Bypass CORS".to_string(), "Skip onboarding".to_string()];
        let resolved: Vec<_> = config
            .resolve_parameters(&names)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(resolved, names);
    }

    #[test]
    fn ledger_live_path_must_be_absolute() {
        assert_eq!(validate_ledger_live_path(" "), Err(ValidationError::EmptyPath));
        assert_eq!(
            validate_ledger_live_path("projects/ledger-live"),
            Err(ValidationError::RelativePath)
        );
        #[cfg(unix)]
        assert_eq!(validate_ledger_live_path("/work/ledger-live"), Ok(()));
    }
}
