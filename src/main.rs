//! Ledger Live Starter: start ledger-live dev builds from saved presets.
//!
//! This is the entry point of the application. It parses command-line arguments,
//! loads the configuration (running first-time setup when there is none), drives
//! the interactive menus and finally launches the selected command.

mod catalog;
mod command;
mod config;
mod launcher;
mod menu;
mod setup;
mod ui;
mod update;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Result};
use clap::builder::styling::{AnsiColor, RgbColor, Style};
use clap::builder::Styles;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::command::{build_preset_command, CommandSpec};
use crate::config::{default_config, Config, ConfigError, ConfigStore};
use crate::menu::{Outcome, Session};
use crate::ui::{DialoguerPrompter, Presenter, Prompter, TerminalPresenter, Tone};
use crate::update::UpdateInfo;

const LOG_ENV: &str = "LEDGER_LIVE_STARTER_LOG";

/// Command-line interface definition.
#[derive(Debug, Parser)]
#[command(
    name = "ledger-live",
    version,
    about = "Start ledger-live with presets and custom parameters",
    styles = help_styles(),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Path to config.json (overrides LEDGER_LIVE_STARTER_CONFIG).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug output to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start ledger-live from a preset or a manual selection.
    Start {
        /// Launch this preset directly, skipping the menus.
        #[arg(long)]
        preset: Option<String>,
    },
    /// Run setup to (re)create the configuration.
    Setup,
    /// Show version information.
    Version,
    /// Show help information.
    Help,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.verbose) {
        eprintln!("{err:#}");
    }
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            TerminalPresenter::detect().notice(Tone::Error, "Error:", &format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let store = ConfigStore::from_env(cli.config);
    match cli.command {
        None | Some(Commands::Help) => {
            Cli::command().print_help()?;
            println!();
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Version) => {
            println!("ledger-live-starter {}", env!("CARGO_PKG_VERSION"));
            println!(
                "platform: {}/{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            );
            let state = if store.exists() { "" } else { " (not created yet)" };
            println!("config: {}{state}", store.path().display());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Setup) => setup_command(&store),
        Some(Commands::Start { preset }) => start_command(&store, preset).await,
    }
}

fn setup_command(store: &ConfigStore) -> Result<ExitCode> {
    let mut presenter = TerminalPresenter::detect();
    let mut prompter = DialoguerPrompter::new();
    presenter.notice(
        Tone::Title,
        "Setup Mode",
        "Welcome to Ledger Live Starter setup!",
    );
    presenter.blank();
    if setup::run_setup(store, &mut prompter, &mut presenter)?.is_none() {
        ui::show_cancelled(&mut presenter);
    }
    Ok(ExitCode::SUCCESS)
}

async fn start_command(store: &ConfigStore, preset: Option<String>) -> Result<ExitCode> {
    let mut presenter = TerminalPresenter::detect();
    let mut prompter = DialoguerPrompter::new();

    presenter.logo();
    presenter.blank();
    let update = update::check_for_update().await;
    version_banner(&mut presenter, update.as_ref());
    presenter.blank();

    let (config, unreadable) = load_config(store, &mut prompter, &mut presenter);
    let outcome = match preset {
        Some(name) => direct_launch(&config, &name, &mut presenter)?,
        None => {
            let mut session = Session::new(store, config, &mut prompter, &mut presenter);
            debug!(
                presets = session.config().presets.len(),
                parameters = session.config().parameters.len(),
                "starting interactive session"
            );
            if unreadable {
                session = session.protect_existing_file();
            }
            session.run()?
        }
    };

    match outcome {
        Outcome::Launch { label, command } => {
            debug!(%label, "launch selected");
            Ok(launch(&mut presenter, &command).await)
        }
        Outcome::Exit | Outcome::Cancelled => Ok(ExitCode::SUCCESS),
    }
}

/// Loads the configuration, running setup when none exists.
///
/// The flag is set when a file exists but could not be used and defaults were
/// substituted for it.
fn load_config(
    store: &ConfigStore,
    prompter: &mut dyn Prompter,
    presenter: &mut dyn Presenter,
) -> (Config, bool) {
    match store.load() {
        Ok(config) => (config, false),
        Err(ConfigError::NotFound { .. }) => {
            presenter.notice(
                Tone::Info,
                "Setup:",
                "No configuration found. Running setup mode...",
            );
            presenter.blank();
            match setup::run_setup(store, prompter, presenter) {
                Ok(Some(config)) => (config, false),
                Ok(None) => {
                    presenter.notice(Tone::Warning, "Warning:", "Setup cancelled, using defaults");
                    presenter.blank();
                    (default_config(), false)
                }
                Err(err) => {
                    warn!(error = %format!("{err:#}"), "setup failed");
                    presenter.notice(Tone::Error, "Error:", &format!("Setup failed: {err:#}"));
                    presenter.blank();
                    (default_config(), false)
                }
            }
        }
        Err(err) => {
            warn!(error = %err, "falling back to default configuration");
            presenter.notice(
                Tone::Warning,
                "Warning:",
                &format!("Could not load config.json ({err}), using defaults"),
            );
            presenter.blank();
            (default_config(), err.is_unreadable())
        }
    }
}

fn direct_launch(config: &Config, name: &str, presenter: &mut dyn Presenter) -> Result<Outcome> {
    let Some(preset) = config.find_preset(name) else {
        let known: Vec<&str> = config.presets.iter().map(|p| p.name.as_str()).collect();
        if known.is_empty() {
            bail!("preset '{name}' not found (no presets defined)");
        }
        bail!("preset '{name}' not found (available: {})", known.join(", "));
    };
    let painted = presenter.paint(Tone::Highlight, &preset.name);
    presenter.notice(Tone::Success, "Starting preset:", &painted);
    Ok(Outcome::Launch {
        label: preset.name.clone(),
        command: build_preset_command(preset, config),
    })
}

async fn launch(presenter: &mut dyn Presenter, command: &CommandSpec) -> ExitCode {
    let display = presenter.paint(Tone::Highlight, &command.display_command());
    presenter.blank();
    presenter.notice(Tone::Title, "Executing:", &display);
    let cwd = if command.working_dir.is_empty() {
        "(current directory)".to_string()
    } else {
        presenter.paint(Tone::Highlight, &command.working_dir)
    };
    presenter.notice(Tone::Info, "Working directory:", &cwd);
    presenter.blank();

    match launcher::launch(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            presenter.notice(Tone::Error, "Error:", &err.to_string());
            ExitCode::from(err.exit_code())
        }
    }
}

fn version_banner(presenter: &mut dyn Presenter, update: Option<&UpdateInfo>) {
    match update {
        Some(info) => {
            let headline = presenter.paint(
                Tone::Highlight,
                &format!("New version v{} available!", info.latest),
            );
            presenter.print(&format!("    {headline} (current v{})", info.current));
            let install = presenter.paint(Tone::Info, info.install_command());
            presenter.print(&format!("    Update with: {install}"));
        }
        None => presenter.print(&format!("    v{}", env!("CARGO_PKG_VERSION"))),
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
}

/// Help output in the logo's purple-to-orange palette.
fn help_styles() -> Styles {
    let brand = |(r, g, b): (u8, u8, u8)| -> Style { RgbColor(r, g, b).on_default() };
    Styles::styled()
        .header(brand(ui::BRAND_START).bold().underline())
        .usage(brand(ui::BRAND_START).bold())
        .literal(brand(ui::BRAND_END).bold())
        .placeholder(AnsiColor::Cyan.on_default().italic())
        .error(AnsiColor::Red.on_default().bold())
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Yellow.on_default().bold())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::Platform;
    use crate::ui::testing::RecordingPresenter;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn help_headers_use_logo_colors() {
        let styles = help_styles();
        let (r, g, b) = ui::BRAND_START;
        assert_eq!(
            styles.get_header().get_fg_color(),
            Some(RgbColor(r, g, b).into())
        );
        let (r, g, b) = ui::BRAND_END;
        assert_eq!(
            styles.get_literal().get_fg_color(),
            Some(RgbColor(r, g, b).into())
        );
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ledger-live",
            "start",
            "--preset",
            "Desk",
            "--config",
            "/tmp/x.json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.json")));
        match cli.command {
            Some(Commands::Start { preset }) => assert_eq!(preset.as_deref(), Some("Desk")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn bare_invocation_has_no_subcommand() {
        let cli = Cli::try_parse_from(["ledger-live"]).unwrap();
        assert!(cli.command.is_none());
        let err = Cli::try_parse_from(["ledger-live", "-V"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn direct_launch_builds_preset_command() {
        let mut config = default_config();
        config
            .add_preset("Desk", Platform::Desktop, vec!["Bypass CORS".into()])
            .unwrap();
        let mut presenter = RecordingPresenter::default();

        let outcome = direct_launch(&config, "Desk", &mut presenter).unwrap();

        let Outcome::Launch { label, command } = outcome else {
            panic!("expected launch");
        };
        assert_eq!(label, "Desk");
        assert_eq!(command.display_command(), "BYPASS_CORS=1 pnpm dev:lld");
        assert!(presenter.contains("Starting preset: Desk"));
    }

    #[test]
    fn direct_launch_lists_known_presets() {
        let mut config = default_config();
        config.add_preset("Desk", Platform::Desktop, vec![]).unwrap();
        let mut presenter = RecordingPresenter::default();

        let err = direct_launch(&config, "Phone", &mut presenter).unwrap_err();
        assert_eq!(err.to_string(), "preset 'Phone' not found (available: Desk)");
    }

    #[test]
    fn unreadable_config_falls_back_to_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(temp.path().join("config.json"));
        std::fs::write(store.path(), "{ not json").unwrap();
        let mut prompter = crate::ui::testing::ScriptedPrompter::new(Vec::new());
        let mut presenter = RecordingPresenter::default();

        let (config, unreadable) = load_config(&store, &mut prompter, &mut presenter);

        assert!(unreadable);
        assert_eq!(config, default_config());
        assert!(presenter.contains("using defaults"));
    }

    #[test]
    fn cancelled_first_run_setup_uses_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(temp.path().join("config.json"));
        let mut prompter =
            crate::ui::testing::ScriptedPrompter::new(vec![crate::ui::testing::Answer::Cancel]);
        let mut presenter = RecordingPresenter::default();

        let (config, unreadable) = load_config(&store, &mut prompter, &mut presenter);

        assert!(!unreadable);
        assert_eq!(config, default_config());
        assert!(!store.exists());
        assert!(presenter.contains("Setup cancelled, using defaults"));
    }

    #[test]
    fn banner_shows_update_and_install_command() {
        let mut presenter = RecordingPresenter::default();
        let info = UpdateInfo {
            current: "0.3.0".into(),
            latest: "0.4.0".into(),
        };
        version_banner(&mut presenter, Some(&info));
        assert!(presenter.contains("New version v0.4.0 available!"));
        assert!(presenter.contains("Update with: "));

        let mut presenter = RecordingPresenter::default();
        version_banner(&mut presenter, None);
        assert_eq!(
            presenter.output(),
            format!("    v{}", env!("CARGO_PKG_VERSION"))
        );
    }
}
