//! First-run setup wizard.

use anyhow::{Context, Result};
use tracing::info;

use crate::catalog::{validate_env_var, validate_ledger_live_path, validate_parameter_name};
use crate::config::{default_config, Config, ConfigStore, Parameter};
use crate::ui::{Presenter, Prompter, Tone};

/// Walks the user through creating a configuration and saves it.
///
/// Returns `Ok(None)` when the user cancels before anything was saved.
pub fn run_setup(
    store: &ConfigStore,
    prompter: &mut dyn Prompter,
    presenter: &mut dyn Presenter,
) -> Result<Option<Config>> {
    let mut config = default_config();
    let location = presenter.paint(Tone::Highlight, &store.path().display().to_string());
    presenter.notice(
        Tone::Title,
        "Info:",
        &format!("Setting up configuration at: {location}"),
    );
    presenter.blank();

    let validate_path = |raw: &str| validate_ledger_live_path(raw).map_err(|e| e.to_string());
    let Some(path) = prompter.input(
        "Enter the absolute path to your ledger-live directory:",
        "",
        &validate_path,
    )?
    else {
        return Ok(None);
    };
    config.ledger_live_path = path.trim().to_string();

    presenter.blank();
    presenter.notice(Tone::Title, "Parameters:", "Default parameters available:");
    for (idx, param) in config.parameters.iter().enumerate() {
        let name = presenter.paint(Tone::Highlight, &param.name);
        presenter.print(&format!("  {}. {} - {}", idx + 1, name, param.description));
        presenter.print(&format!("     {}", param.env_var));
    }
    presenter.blank();

    if prompter.confirm("Would you like to add additional parameters?", false)? == Some(true) {
        add_custom_parameters(&mut config, prompter, presenter)?;
    }

    store
        .save(&config)
        .with_context(|| format!("failed to save configuration to {}", store.path().display()))?;
    info!(path = %store.path().display(), "setup completed");

    presenter.blank();
    presenter.notice(Tone::Success, "Success:", "Setup completed successfully!");
    let location = presenter.paint(Tone::Highlight, &store.path().display().to_string());
    presenter.print(&format!("Configuration saved to: {location}"));
    presenter.blank();
    presenter.notice(Tone::Title, "Next Steps:", "How to use:");
    for (usage, what) in [
        ("ledger-live start", "Start with interactive menu"),
        ("ledger-live start --config /path", "Use custom config file"),
        ("ledger-live setup", "Run setup again"),
    ] {
        let usage = presenter.paint(Tone::Highlight, &format!("{usage:<34}"));
        presenter.print(&format!("  {usage} - {what}"));
    }
    presenter.blank();
    Ok(Some(config))
}

// An empty name or a cancelled prompt ends the loop.
fn add_custom_parameters(
    config: &mut Config,
    prompter: &mut dyn Prompter,
    presenter: &mut dyn Presenter,
) -> Result<()> {
    presenter.blank();
    presenter.notice(Tone::Title, "Custom Setup:", "Add custom parameters:");
    loop {
        let existing = config.parameters.clone();
        let validate_name = move |raw: &str| {
            if raw.trim().is_empty() {
                return Ok(());
            }
            validate_parameter_name(raw, &existing, None).map_err(|e| e.to_string())
        };
        let Some(name) = prompter.input("Parameter name (empty to finish):", "", &validate_name)?
        else {
            break;
        };
        if name.trim().is_empty() {
            break;
        }

        let validate_env = |raw: &str| validate_env_var(raw).map_err(|e| e.to_string());
        let Some(env_var) = prompter.input("Environment variable:", "", &validate_env)? else {
            break;
        };
        let description = prompter
            .input("Description (optional):", "", &|_: &str| Ok::<(), String>(()))?
            .unwrap_or_default();

        match config.add_parameter(Parameter {
            name,
            env_var,
            description,
        }) {
            Ok(added) => {
                let name = presenter.paint(Tone::Highlight, &added.name);
                presenter.notice(Tone::Success, "✓", &format!("Added parameter: {name}"));
            }
            Err(err) => presenter.notice(Tone::Error, "Error:", &err.to_string()),
        }

        if prompter.confirm("Add another parameter?", true)? != Some(true) {
            break;
        }
    }
    Ok(())
}
