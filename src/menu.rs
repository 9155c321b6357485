//! Interactive menus for launching, creating presets and editing the catalog.
//!
//! Nothing here spawns processes. The flow ends with an [`Outcome`] that `main`
//! acts on.

use anyhow::Result;
use tracing::{debug, warn};

use crate::catalog::{
    validate_env_var, validate_parameter_name, validate_preset_name, ValidationError,
};
use crate::command::{build_command, build_preset_command, CommandSpec};
use crate::config::{Config, ConfigStore, Parameter, Platform, Preset};
use crate::ui::{self, Presenter, Prompter, Tone};

/// How the interactive session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Start Ledger Live. `label` names the preset or platform being started.
    Launch { label: String, command: CommandSpec },
    Exit,
    Cancelled,
}

enum Flow {
    Back,
    Done(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Persistence {
    Normal,
    /// The file on disk could not be used; ask before replacing it.
    AskBeforeOverwrite,
    /// The user declined to overwrite; changes live in memory only.
    MemoryOnly,
}

#[derive(Debug, Clone, Copy)]
enum MainAction {
    Preset(usize),
    Create,
    Manual,
    More,
    Exit,
}

pub struct Session<'a> {
    store: &'a ConfigStore,
    config: Config,
    persistence: Persistence,
    prompter: &'a mut dyn Prompter,
    presenter: &'a mut dyn Presenter,
}

impl<'a> Session<'a> {
    pub fn new(
        store: &'a ConfigStore,
        config: Config,
        prompter: &'a mut dyn Prompter,
        presenter: &'a mut dyn Presenter,
    ) -> Self {
        Self {
            store,
            config,
            persistence: Persistence::Normal,
            prompter,
            presenter,
        }
    }

    /// Asks for confirmation before the first save replaces the file on disk.
    /// Used when the config could not be read and defaults were substituted.
    pub fn protect_existing_file(mut self) -> Self {
        self.persistence = Persistence::AskBeforeOverwrite;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the main menu until the user launches something, exits or cancels.
    pub fn run(&mut self) -> Result<Outcome> {
        loop {
            if let Flow::Done(outcome) = self.main_menu()? {
                return Ok(outcome);
            }
        }
    }

    fn main_menu(&mut self) -> Result<Flow> {
        let mut actions: Vec<MainAction> = (0..self.config.presets.len())
            .map(MainAction::Preset)
            .collect();
        let prompt = if actions.is_empty() {
            actions.push(MainAction::Create);
            "No presets found. Choose an option:"
        } else {
            "Choose an option:"
        };
        actions.extend([MainAction::Manual, MainAction::More, MainAction::Exit]);
        let items: Vec<String> = actions
            .iter()
            .map(|action| match action {
                MainAction::Preset(idx) => self.config.presets[*idx].name.clone(),
                MainAction::Create => "Create preset".to_string(),
                MainAction::Manual => "Start manually".to_string(),
                MainAction::More => "More".to_string(),
                MainAction::Exit => "Exit".to_string(),
            })
            .collect();

        let Some(choice) = self.prompter.select(prompt, &items, 0)? else {
            ui::show_cancelled(self.presenter);
            return Ok(Flow::Done(Outcome::Cancelled));
        };
        match actions[choice] {
            MainAction::Preset(idx) => {
                let name = self.config.presets[idx].name.clone();
                Ok(self.start_preset(&name))
            }
            MainAction::Create => self.create_presets(),
            MainAction::Manual => self.start_manually(),
            MainAction::More => self.more_menu(),
            MainAction::Exit => {
                ui::show_goodbye(self.presenter);
                Ok(Flow::Done(Outcome::Exit))
            }
        }
    }

    fn start_preset(&mut self, name: &str) -> Flow {
        let Some(preset) = self.config.find_preset(name) else {
            self.presenter.notice(
                Tone::Error,
                "Error:",
                &format!("Preset '{name}' not found"),
            );
            return Flow::Back;
        };
        let command = build_preset_command(preset, &self.config);
        let painted = self.presenter.paint(Tone::Highlight, name);
        self.presenter.notice(Tone::Success, "Starting preset:", &painted);
        Flow::Done(Outcome::Launch {
            label: name.to_string(),
            command,
        })
    }

    fn start_manually(&mut self) -> Result<Flow> {
        self.title("Manual Start");
        let Some(platform) = self.select_platform(Platform::Mobile)? else {
            return Ok(Flow::Back);
        };
        let Some(names) = self.select_parameters(&[])? else {
            return Ok(Flow::Back);
        };
        let parameters = self.config.resolve_parameters(&names);
        let command = build_command(platform.key(), &parameters, &self.config);
        let starting = format!("{}...", self.presenter.paint(Tone::Highlight, platform.label()));
        self.presenter.blank();
        self.presenter.notice(Tone::Success, "Starting", &starting);
        Ok(Flow::Done(Outcome::Launch {
            label: platform.label().to_string(),
            command,
        }))
    }

    fn more_menu(&mut self) -> Result<Flow> {
        let items = labels(&["Edit presets", "Edit parameters", "Back"]);
        loop {
            match self.prompter.select("More options:", &items, 0)? {
                Some(0) => {
                    if let Flow::Done(outcome) = self.manage_presets()? {
                        return Ok(Flow::Done(outcome));
                    }
                }
                Some(1) => self.manage_parameters()?,
                _ => return Ok(Flow::Back),
            }
        }
    }

    // Presets

    fn manage_presets(&mut self) -> Result<Flow> {
        loop {
            let has_presets = !self.config.presets.is_empty();
            let mut items = labels(&["Add new preset"]);
            if has_presets {
                items.extend(labels(&["Edit presets", "Delete presets"]));
            } else {
                self.presenter
                    .notice(Tone::Info, "Info:", "No presets found to edit.");
            }
            items.push("Back".to_string());

            let choice = self.prompter.select("Manage presets:", &items, 0)?;
            match choice.map(|idx| items[idx].as_str()) {
                Some("Add new preset") => {
                    if let Flow::Done(outcome) = self.create_presets()? {
                        return Ok(Flow::Done(outcome));
                    }
                }
                Some("Edit presets") => self.edit_preset()?,
                Some("Delete presets") => self.delete_presets()?,
                _ => return Ok(Flow::Back),
            }
        }
    }

    /// Creates presets until the user runs one or goes back.
    fn create_presets(&mut self) -> Result<Flow> {
        loop {
            let Some(name) = self.create_preset()? else {
                return Ok(Flow::Back);
            };
            let items = labels(&["Run this preset now", "Add another preset", "Back"]);
            match self
                .prompter
                .select("What would you like to do next?", &items, 0)?
            {
                Some(0) => return Ok(self.start_preset(&name)),
                Some(1) => continue,
                _ => return Ok(Flow::Back),
            }
        }
    }

    /// Returns the name of the created preset, or `None` when nothing was saved.
    fn create_preset(&mut self) -> Result<Option<String>> {
        self.title("Create New Preset");
        let existing = self.config.presets.clone();
        let validate =
            move |raw: &str| validate_preset_name(raw, &existing, None).map_err(|e| e.to_string());
        let Some(name) = self.prompter.input("Preset name:", "", &validate)? else {
            self.presenter
                .notice(Tone::Info, "Info:", "Preset creation cancelled.");
            return Ok(None);
        };
        let Some(platform) = self.select_platform(Platform::Mobile)? else {
            return Ok(None);
        };
        let Some(parameters) = self.select_parameters(&[])? else {
            return Ok(None);
        };

        let name = name.trim().to_string();
        let saved = self.commit(|config| {
            config
                .add_preset(&name, platform, parameters)
                .map(|_| ())
        })?;
        if !saved {
            return Ok(None);
        }
        self.success("Preset", &name, "created successfully!");
        if let Some(preset) = self.config.find_preset(&name).cloned() {
            self.preset_summary(&preset);
        }
        Ok(Some(name))
    }

    fn edit_preset(&mut self) -> Result<()> {
        let mut items: Vec<String> = self
            .config
            .presets
            .iter()
            .map(|preset| preset.name.clone())
            .collect();
        items.push("Back".to_string());
        let Some(idx) = self.prompter.select("Choose a preset to edit:", &items, 0)? else {
            return Ok(());
        };
        let Some(current) = self.config.presets.get(idx).cloned() else {
            return Ok(());
        };

        let painted = self.presenter.paint(Tone::Highlight, &current.name);
        self.presenter.notice(Tone::Title, "Editing preset:", &painted);
        let existing = self.config.presets.clone();
        let current_name = current.name.clone();
        let validate = move |raw: &str| {
            validate_preset_name(raw, &existing, Some(current_name.as_str()))
                .map_err(|e| e.to_string())
        };
        let Some(name) = self
            .prompter
            .input("Preset name:", &current.name, &validate)?
        else {
            self.presenter.notice(Tone::Info, "Info:", "Edit cancelled.");
            return Ok(());
        };
        let Some(platform) = self.select_platform(Platform::from_key(&current.platform))? else {
            self.presenter.notice(Tone::Info, "Info:", "Edit cancelled.");
            return Ok(());
        };
        let Some(parameters) = self.select_parameters(&current.parameters)? else {
            self.presenter.notice(Tone::Info, "Info:", "Edit cancelled.");
            return Ok(());
        };

        let name = name.trim().to_string();
        if self.commit(|config| config.update_preset(&current.name, &name, platform, parameters))? {
            self.success("Preset", &name, "updated successfully!");
        }
        Ok(())
    }

    fn delete_presets(&mut self) -> Result<()> {
        let names: Vec<String> = self
            .config
            .presets
            .iter()
            .map(|preset| preset.name.clone())
            .collect();
        let Some(doomed) = self.pick_for_deletion("preset", &names)? else {
            return Ok(());
        };
        if self.commit(|config| {
            config.remove_presets(&doomed);
            Ok(())
        })? {
            self.deleted("Preset", "presets", &doomed);
        }
        Ok(())
    }

    fn preset_summary(&mut self, preset: &Preset) {
        let platform = Platform::from_key(&preset.platform);
        let parameters = if preset.parameters.is_empty() {
            "None".to_string()
        } else {
            preset.parameters.join(", ")
        };
        let heading = self.presenter.paint(Tone::Title, "Preset Summary:");
        self.presenter.print(&heading);
        let name = self.presenter.paint(Tone::Highlight, &preset.name);
        self.presenter.notice(Tone::Info, "   Name:", &name);
        let platform = self.presenter.paint(Tone::Highlight, platform.label());
        self.presenter.notice(Tone::Info, "   Platform:", &platform);
        self.presenter
            .notice(Tone::Info, "   Parameters:", &parameters);
        self.presenter.blank();
    }

    // Parameters

    fn manage_parameters(&mut self) -> Result<()> {
        loop {
            let mut items = labels(&["Add new parameter"]);
            if !self.config.parameters.is_empty() {
                items.extend(labels(&["Edit parameters", "Delete parameters"]));
            }
            items.extend(labels(&["Show all parameters", "Back"]));

            let choice = self.prompter.select("Manage parameters:", &items, 0)?;
            match choice.map(|idx| items[idx].as_str()) {
                Some("Add new parameter") => self.add_parameter()?,
                Some("Edit parameters") => self.edit_parameter()?,
                Some("Delete parameters") => self.delete_parameters()?,
                Some("Show all parameters") => self.show_parameters(),
                _ => return Ok(()),
            }
        }
    }

    fn add_parameter(&mut self) -> Result<()> {
        self.title("Add new parameter");
        let Some(draft) = self.parameter_form(None)? else {
            return Ok(());
        };
        let name = draft.name.trim().to_string();
        if self.commit(|config| config.add_parameter(draft).map(|_| ()))? {
            self.success("Parameter", &name, "added successfully!");
        }
        Ok(())
    }

    fn edit_parameter(&mut self) -> Result<()> {
        let mut items: Vec<String> = self
            .config
            .parameters
            .iter()
            .map(|param| param.name.clone())
            .collect();
        items.push("Back".to_string());
        let Some(idx) = self
            .prompter
            .select("Choose a parameter to edit:", &items, 0)?
        else {
            return Ok(());
        };
        let Some(current) = self.config.parameters.get(idx).cloned() else {
            return Ok(());
        };

        self.presenter.notice(Tone::Title, "Editing parameter:", &current.name);
        let Some(draft) = self.parameter_form(Some(&current))? else {
            return Ok(());
        };
        let name = draft.name.trim().to_string();
        if self.commit(|config| config.update_parameter(&current.name, draft))? {
            self.success("Parameter", &name, "updated successfully!");
        }
        Ok(())
    }

    /// Asks for name, assignment and description. `current` pre-fills the fields.
    fn parameter_form(&mut self, current: Option<&Parameter>) -> Result<Option<Parameter>> {
        let existing = self.config.parameters.clone();
        let current_name = current.map(|param| param.name.clone());
        let validate_name = move |raw: &str| {
            validate_parameter_name(raw, &existing, current_name.as_deref())
                .map_err(|e| e.to_string())
        };
        let initial = current.cloned().unwrap_or_default();

        let Some(name) = self
            .prompter
            .input("Parameter name:", &initial.name, &validate_name)?
        else {
            self.presenter
                .notice(Tone::Info, "Info:", "Parameter input cancelled.");
            return Ok(None);
        };
        let validate_env = |raw: &str| validate_env_var(raw).map_err(|e| e.to_string());
        let Some(env_var) = self.prompter.input(
            "Environment variable (e.g. SKIP_ONBOARDING=1):",
            &initial.env_var,
            &validate_env,
        )?
        else {
            self.presenter
                .notice(Tone::Info, "Info:", "Parameter input cancelled.");
            return Ok(None);
        };
        let Some(description) =
            self.prompter
                .input("Description (optional):", &initial.description, &accept_any)?
        else {
            self.presenter
                .notice(Tone::Info, "Info:", "Parameter input cancelled.");
            return Ok(None);
        };
        Ok(Some(Parameter {
            name,
            env_var,
            description,
        }))
    }

    fn delete_parameters(&mut self) -> Result<()> {
        let names: Vec<String> = self
            .config
            .parameters
            .iter()
            .map(|param| param.name.clone())
            .collect();
        let Some(doomed) = self.pick_for_deletion("parameter", &names)? else {
            return Ok(());
        };
        let referencing: Vec<String> = self
            .config
            .presets
            .iter()
            .filter(|preset| preset.parameters.iter().any(|name| doomed.contains(name)))
            .map(|preset| preset.name.clone())
            .collect();
        if self.commit(|config| {
            config.remove_parameters(&doomed);
            Ok(())
        })? {
            self.deleted("Parameter", "parameters", &doomed);
            if !referencing.is_empty() {
                self.presenter.notice(
                    Tone::Warning,
                    "Note:",
                    &format!(
                        "still referenced by {}; skipped when launching",
                        referencing.join(", ")
                    ),
                );
            }
        }
        Ok(())
    }

    fn show_parameters(&mut self) {
        if self.config.parameters.is_empty() {
            self.presenter
                .notice(Tone::Info, "Info:", "No parameters defined yet.");
            return;
        }
        self.presenter.blank();
        let parameters = self.config.parameters.clone();
        for (idx, param) in parameters.iter().enumerate() {
            self.presenter
                .notice(Tone::Title, "•", &format!("Parameter {}:", idx + 1));
            let name = self.presenter.paint(Tone::Highlight, &param.name);
            self.presenter.notice(Tone::Info, "   Name:", &name);
            let env_var = self.presenter.paint(Tone::Highlight, &param.env_var);
            self.presenter
                .notice(Tone::Info, "   Environment Variable:", &env_var);
            if !param.description.is_empty() {
                self.presenter
                    .notice(Tone::Info, "   Description:", &param.description);
            }
            self.presenter.blank();
        }
    }

    // Shared prompts

    fn select_platform(&mut self, default: Platform) -> Result<Option<Platform>> {
        let items: Vec<String> = Platform::ALL
            .iter()
            .map(|platform| platform.label().to_string())
            .collect();
        let default = Platform::ALL
            .iter()
            .position(|platform| *platform == default)
            .unwrap_or(0);
        let choice = self.prompter.select("Select platform:", &items, default)?;
        Ok(choice.map(|idx| Platform::ALL[idx]))
    }

    /// Multi-select over all parameters with `checked` pre-selected.
    fn select_parameters(&mut self, checked: &[String]) -> Result<Option<Vec<String>>> {
        if self.config.parameters.is_empty() {
            self.presenter
                .notice(Tone::Info, "Info:", "No parameters defined yet.");
            return Ok(Some(Vec::new()));
        }
        let items: Vec<String> = self.config.parameters.iter().map(parameter_label).collect();
        let defaults: Vec<bool> = self
            .config
            .parameters
            .iter()
            .map(|param| checked.contains(&param.name))
            .collect();
        let Some(picks) = self
            .prompter
            .multi_select("Select parameters:", &items, &defaults)?
        else {
            return Ok(None);
        };
        Ok(Some(
            picks
                .into_iter()
                .filter_map(|idx| self.config.parameters.get(idx))
                .map(|param| param.name.clone())
                .collect(),
        ))
    }

    /// Lets the user pick entries and confirm. Returns the confirmed names.
    fn pick_for_deletion(&mut self, noun: &str, names: &[String]) -> Result<Option<Vec<String>>> {
        if names.is_empty() {
            self.presenter
                .notice(Tone::Info, "Info:", &format!("No {noun}s available to delete."));
            return Ok(None);
        }
        let unchecked = vec![false; names.len()];
        let prompt = format!("Select {noun}(s) to delete");
        let Some(picks) = self.prompter.multi_select(&prompt, names, &unchecked)? else {
            ui::show_cancelled(self.presenter);
            return Ok(None);
        };
        let doomed: Vec<String> = picks
            .into_iter()
            .filter_map(|idx| names.get(idx).cloned())
            .collect();
        if doomed.is_empty() {
            self.presenter.notice(
                Tone::Info,
                "Info:",
                &format!("No {noun}s selected for deletion."),
            );
            return Ok(None);
        }

        let question = match doomed.as_slice() {
            [only] => format!("Are you sure you want to delete '{only}'?"),
            many => format!("Are you sure you want to delete {} {noun}(s)?", many.len()),
        };
        match self.prompter.confirm(&question, false)? {
            Some(true) => Ok(Some(doomed)),
            Some(false) => {
                self.presenter
                    .notice(Tone::Info, "Info:", "Deletion cancelled.");
                Ok(None)
            }
            None => {
                ui::show_confirmation_cancelled(self.presenter);
                Ok(None)
            }
        }
    }

    // Persistence

    /// Applies `change` to a copy of the config, saves it, then keeps it.
    ///
    /// Returns `false` when the change was rejected or could not be saved; the
    /// in-memory config is untouched in that case.
    fn commit<F>(&mut self, change: F) -> Result<bool>
    where
        F: FnOnce(&mut Config) -> Result<(), ValidationError>,
    {
        let mut draft = self.config.clone();
        if let Err(err) = change(&mut draft) {
            self.presenter.notice(Tone::Error, "Error:", &err.to_string());
            return Ok(false);
        }

        if self.persistence == Persistence::AskBeforeOverwrite {
            let question = format!(
                "{} could not be loaded. Overwrite it with your changes?",
                self.store.path().display()
            );
            match self.prompter.confirm(&question, false)? {
                Some(true) => self.persistence = Persistence::Normal,
                _ => {
                    warn!(path = %self.store.path().display(), "keeping changes in memory only");
                    self.persistence = Persistence::MemoryOnly;
                }
            }
        }

        match self.persistence {
            Persistence::MemoryOnly => {
                self.presenter.notice(
                    Tone::Warning,
                    "Warning:",
                    "Changes are kept for this session only and were not saved.",
                );
            }
            _ => {
                if let Err(err) = self.store.save(&draft) {
                    warn!(error = %err, "save failed");
                    self.presenter.notice(
                        Tone::Error,
                        "Error:",
                        &format!("Error saving changes: {err}"),
                    );
                    return Ok(false);
                }
            }
        }
        debug!("config change committed");
        self.config = draft;
        Ok(true)
    }

    // Messages

    fn title(&mut self, text: &str) {
        self.presenter.blank();
        let title = self.presenter.paint(Tone::Title, text);
        self.presenter.print(&title);
        self.presenter.blank();
    }

    fn success(&mut self, kind: &str, name: &str, what: &str) {
        let name = self.presenter.paint(Tone::Highlight, name);
        self.presenter
            .notice(Tone::Success, "Success:", &format!("{kind} '{name}' {what}"));
    }

    fn deleted(&mut self, kind: &str, plural: &str, names: &[String]) {
        match names {
            [only] => self.success(kind, only, "deleted successfully."),
            many => {
                let count = self.presenter.paint(Tone::Highlight, &many.len().to_string());
                self.presenter.notice(
                    Tone::Success,
                    "Success:",
                    &format!("{count} {plural} deleted successfully."),
                );
            }
        }
    }
}

fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn parameter_label(param: &Parameter) -> String {
    if param.description.is_empty() {
        format!("{} ({})", param.name, param.env_var)
    } else {
        format!("{} ({}) - {}", param.name, param.env_var, param.description)
    }
}

fn accept_any(_: &str) -> Result<(), String> {
    Ok(())
}
