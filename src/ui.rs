//! Terminal presentation and prompting.
//!
//! The interactive flow only talks to the `Presenter` and `Prompter` traits.
//! `TerminalPresenter` styles text with `crossterm`, and `DialoguerPrompter`
//! asks questions with `dialoguer`.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use crossterm::style::{Color, Stylize};
use dialoguer::console::Term;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Select};

/// Project page shown in farewell and cancellation messages.
pub const FEEDBACK_URL: &str = "https://github.com/philipptpunkt/ledger-live-starter";

pub const BRAND_START: (u8, u8, u8) = (114, 0, 201);
pub const BRAND_END: (u8, u8, u8) = (242, 131, 12);
const MARGIN: &str = "    ";

const LOGO: [&str; 5] = [
    "╔═════════════════════════════╗",
    "║                             ║",
    "║    Ledger Live Starter      ║",
    "║                             ║",
    "╚═════════════════════════════╝",
];

/// Semantic styling applied to a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Title,
    Info,
    Highlight,
    Normal,
    Success,
    Warning,
    Error,
}

/// Output capability used by the interactive flow.
pub trait Presenter {
    /// Returns `text` styled for `tone`.
    fn paint(&self, tone: Tone, text: &str) -> String;

    /// Writes one line.
    fn print(&mut self, line: &str);

    fn blank(&mut self) {
        self.print("");
    }

    /// Writes `label message`, with the label styled for `tone`.
    fn notice(&mut self, tone: Tone, label: &str, message: &str) {
        let line = format!("{} {}", self.paint(tone, label), self.paint(Tone::Normal, message));
        self.print(&line);
    }

    /// Writes `content` inside a rounded frame.
    fn boxed(&mut self, content: &str) {
        for line in frame_lines(content) {
            self.print(&line);
        }
    }
}

/// Input capability used by the interactive flow.
///
/// Every method returns `Ok(None)` when the user backs out of the prompt. With
/// `DialoguerPrompter`, Esc or `q` backs out of selections and confirmations;
/// Ctrl-C backs out of any prompt, including free-text input.
pub trait Prompter {
    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> Result<Option<usize>>;

    fn multi_select(
        &mut self,
        prompt: &str,
        items: &[String],
        checked: &[bool],
    ) -> Result<Option<Vec<usize>>>;

    fn input(
        &mut self,
        prompt: &str,
        initial: &str,
        validate: &dyn Fn(&str) -> Result<(), String>,
    ) -> Result<Option<String>>;

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<Option<bool>>;
}

/// Writes styled lines to stdout.
#[derive(Debug, Clone)]
pub struct TerminalPresenter {
    color: bool,
}

impl TerminalPresenter {
    /// Colors are used when stdout is a terminal and `NO_COLOR` is unset.
    pub fn detect() -> Self {
        let color = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self { color }
    }

    pub fn logo(&mut self) {
        for line in LOGO {
            let painted = if self.color {
                gradient_text(line)
            } else {
                line.to_string()
            };
            self.print(&format!("{MARGIN}{painted}"));
        }
    }
}

impl Presenter for TerminalPresenter {
    fn paint(&self, tone: Tone, text: &str) -> String {
        if !self.color || text.is_empty() {
            return text.to_string();
        }
        let (r, g, b) = BRAND_START;
        let purple = Color::Rgb { r, g, b };
        let (r, g, b) = BRAND_END;
        let orange = Color::Rgb { r, g, b };
        match tone {
            Tone::Title => text.with(purple).bold().to_string(),
            Tone::Info => text.with(Color::Cyan).bold().to_string(),
            Tone::Highlight => text.with(orange).to_string(),
            Tone::Normal => text.to_string(),
            Tone::Success => text.with(Color::Green).bold().to_string(),
            Tone::Warning => text.with(Color::Yellow).bold().to_string(),
            Tone::Error => text.with(Color::Red).bold().to_string(),
        }
    }

    fn print(&mut self, line: &str) {
        println!("{line}");
    }

    fn boxed(&mut self, content: &str) {
        let lines = frame_lines(content);
        let last = lines.len().saturating_sub(1);
        for (idx, line) in lines.iter().enumerate() {
            if !self.color {
                self.print(line);
                continue;
            }
            let color = gradient_color(idx as f32 / last.max(1) as f32);
            let painted = if idx == 0 || idx == last {
                line.as_str().with(color).to_string()
            } else {
                paint_edges(line, color)
            };
            self.print(&painted);
        }
    }
}

/// Asks questions on stderr with `dialoguer`.
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
    term: Term,
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
            term: Term::stderr(),
        }
    }
}

impl Default for DialoguerPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for DialoguerPrompter {
    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> Result<Option<usize>> {
        let picked = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default.min(items.len().saturating_sub(1)))
            .interact_on_opt(&self.term);
        interrupt_as_cancel(picked).context("selection prompt failed")
    }

    fn multi_select(
        &mut self,
        prompt: &str,
        items: &[String],
        checked: &[bool],
    ) -> Result<Option<Vec<usize>>> {
        let picked = MultiSelect::with_theme(&self.theme)
            .with_prompt(format!("{prompt} (space to toggle, enter to confirm)"))
            .items(items)
            .defaults(checked)
            .interact_on_opt(&self.term);
        interrupt_as_cancel(picked).context("multi-selection prompt failed")
    }

    fn input(
        &mut self,
        prompt: &str,
        initial: &str,
        validate: &dyn Fn(&str) -> Result<(), String>,
    ) -> Result<Option<String>> {
        let value = Input::<String>::with_theme(&self.theme)
            .with_prompt(format!("{prompt} (Ctrl-C to go back)"))
            .with_initial_text(initial)
            .allow_empty(true)
            .validate_with(|input: &String| validate(input.as_str()))
            .interact_text_on(&self.term)
            .map(Some);
        interrupt_as_cancel(value).context("text prompt failed")
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<Option<bool>> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact_on_opt(&self.term);
        interrupt_as_cancel(answer).context("confirmation prompt failed")
    }
}

/// Ctrl-C reaches a raw-mode prompt as an interrupted read; treat it as backing out.
fn interrupt_as_cancel<T>(
    result: dialoguer::Result<Option<T>>,
) -> Result<Option<T>, dialoguer::Error> {
    match result {
        Err(dialoguer::Error::IO(err)) if err.kind() == io::ErrorKind::Interrupted => {
            tracing::debug!("prompt interrupted");
            Ok(None)
        }
        other => other,
    }
}

pub fn show_cancelled(presenter: &mut dyn Presenter) {
    presenter.blank();
    presenter.boxed(&format!(
        "Selection cancelled\n\nHave feedback or suggestions?\nVisit: {FEEDBACK_URL}"
    ));
}

pub fn show_confirmation_cancelled(presenter: &mut dyn Presenter) {
    presenter.blank();
    presenter.boxed(&format!(
        "Confirmation cancelled\n\nHave feedback or suggestions?\nVisit: {FEEDBACK_URL}"
    ));
}

pub fn show_goodbye(presenter: &mut dyn Presenter) {
    presenter.blank();
    presenter.boxed(&format!(
        "Goodbye!\n\nThanks for using Ledger Live Starter!\nFeedback? Issues? Ideas?\n\nVisit: {FEEDBACK_URL}"
    ));
}

/// Centers `content` inside a rounded frame with two columns of padding.
pub fn frame_lines(content: &str) -> Vec<String> {
    let rows: Vec<&str> = content.lines().collect();
    let width = rows.iter().map(|row| visible_width(row)).max().unwrap_or(0);
    let inner = width + 4;
    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(format!("╭{}╮", "─".repeat(inner)));
    out.push(format!("│{}│", " ".repeat(inner)));
    for row in rows {
        let gap = width - visible_width(row);
        let left = gap / 2;
        let right = gap - left;
        out.push(format!(
            "│  {}{}{}  │",
            " ".repeat(left),
            row,
            " ".repeat(right)
        ));
    }
    out.push(format!("│{}│", " ".repeat(inner)));
    out.push(format!("╰{}╯", "─".repeat(inner)));
    out
}

/// Column count of `text` once ANSI escapes are removed.
pub fn visible_width(text: &str) -> usize {
    strip_ansi_escapes::strip_str(text).chars().count()
}

fn gradient_color(progress: f32) -> Color {
    let progress = progress.clamp(0.0, 1.0);
    let lerp = |from: u8, to: u8| (from as f32 + progress * (to as f32 - from as f32)) as u8;
    Color::Rgb {
        r: lerp(BRAND_START.0, BRAND_END.0),
        g: lerp(BRAND_START.1, BRAND_END.1),
        b: lerp(BRAND_START.2, BRAND_END.2),
    }
}

fn gradient_text(line: &str) -> String {
    let count = line.chars().count();
    line.chars()
        .enumerate()
        .map(|(idx, ch)| {
            let progress = if count <= 1 {
                0.5
            } else {
                idx as f32 / (count - 1) as f32
            };
            ch.with(gradient_color(progress)).to_string()
        })
        .collect()
}

fn paint_edges(line: &str, color: Color) -> String {
    let mut chars = line.chars();
    let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
        return line.to_string();
    };
    let middle: String = chars.collect();
    format!("{}{}{}", first.with(color), middle, last.with(color))
}

#[cfg(test)]
pub mod testing {
    //! In-memory presenter and scripted prompter for flow tests.

    use std::collections::VecDeque;

    use anyhow::{bail, Result};

    use super::{frame_lines, Presenter, Prompter, Tone};

    #[derive(Debug, Default)]
    pub struct RecordingPresenter {
        pub lines: Vec<String>,
    }

    impl RecordingPresenter {
        pub fn output(&self) -> String {
            self.lines.join("\n")
        }

        pub fn contains(&self, needle: &str) -> bool {
            self.lines.iter().any(|line| line.contains(needle))
        }
    }

    impl Presenter for RecordingPresenter {
        fn paint(&self, _tone: Tone, text: &str) -> String {
            text.to_string()
        }

        fn print(&mut self, line: &str) {
            self.lines.push(line.to_string());
        }

        fn boxed(&mut self, content: &str) {
            self.lines.extend(frame_lines(content));
        }
    }

    /// One scripted answer.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Answer {
        Pick(usize),
        /// Select an entry by its label.
        PickLabel(&'static str),
        Check(Vec<usize>),
        /// Leave the pre-checked entries as they are.
        KeepChecked,
        Text(&'static str),
        Yes,
        No,
        Cancel,
    }

    /// Replays answers in order and records every prompt and rejected input.
    #[derive(Debug, Default)]
    pub struct ScriptedPrompter {
        answers: VecDeque<Answer>,
        pub prompts: Vec<String>,
        pub rejections: Vec<String>,
    }

    impl ScriptedPrompter {
        pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                ..Self::default()
            }
        }

        pub fn remaining(&self) -> usize {
            self.answers.len()
        }

        fn next(&mut self, prompt: &str) -> Result<Answer> {
            self.prompts.push(prompt.to_string());
            match self.answers.pop_front() {
                Some(answer) => Ok(answer),
                None => bail!("no scripted answer for prompt {prompt:?}"),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn select(
            &mut self,
            prompt: &str,
            items: &[String],
            _default: usize,
        ) -> Result<Option<usize>> {
            match self.next(prompt)? {
                Answer::Pick(idx) if idx < items.len() => Ok(Some(idx)),
                Answer::PickLabel(label) => match items.iter().position(|item| item == label) {
                    Some(idx) => Ok(Some(idx)),
                    None => bail!("{label:?} not offered in {prompt:?}: {items:?}"),
                },
                Answer::Cancel => Ok(None),
                other => bail!("unexpected {other:?} for select {prompt:?}: {items:?}"),
            }
        }

        fn multi_select(
            &mut self,
            prompt: &str,
            items: &[String],
            checked: &[bool],
        ) -> Result<Option<Vec<usize>>> {
            match self.next(prompt)? {
                Answer::Check(picks) if picks.iter().all(|idx| *idx < items.len()) => {
                    Ok(Some(picks))
                }
                Answer::KeepChecked => Ok(Some(
                    checked
                        .iter()
                        .enumerate()
                        .filter(|(_, on)| **on)
                        .map(|(idx, _)| idx)
                        .collect(),
                )),
                Answer::Cancel => Ok(None),
                other => bail!("unexpected {other:?} for multi-select {prompt:?}: {items:?}"),
            }
        }

        fn input(
            &mut self,
            prompt: &str,
            _initial: &str,
            validate: &dyn Fn(&str) -> Result<(), String>,
        ) -> Result<Option<String>> {
            loop {
                match self.next(prompt)? {
                    Answer::Text(text) => match validate(text) {
                        Ok(()) => return Ok(Some(text.to_string())),
                        Err(message) => self.rejections.push(message),
                    },
                    Answer::Cancel => return Ok(None),
                    other => bail!("unexpected {other:?} for input {prompt:?}"),
                }
            }
        }

        fn confirm(&mut self, prompt: &str, _default: bool) -> Result<Option<bool>> {
            match self.next(prompt)? {
                Answer::Yes => Ok(Some(true)),
                Answer::No => Ok(Some(false)),
                Answer::Cancel => Ok(None),
                other => bail!("unexpected {other:?} for confirm {prompt:?}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_centers_rows() {
        let lines = frame_lines("ab\nabcd");
        assert_eq!(lines[0], "╭────────╮");
        assert_eq!(lines[2], "│   ab   │");
        assert_eq!(lines[3], "│  abcd  │");
        assert_eq!(lines.last().unwrap(), "╰────────╯");
        let widths: Vec<_> = lines.iter().map(|line| visible_width(line)).collect();
        assert!(widths.iter().all(|w| *w == widths[0]), "{widths:?}");
    }

    #[test]
    fn visible_width_ignores_escapes() {
        let styled = "abc".with(Color::Red).bold().to_string();
        assert_eq!(visible_width(&styled), 3);
    }

    #[test]
    fn interrupted_prompt_counts_as_cancel() {
        let interrupted: dialoguer::Result<Option<String>> = Err(dialoguer::Error::IO(
            io::Error::new(io::ErrorKind::Interrupted, "read interrupted"),
        ));
        assert!(matches!(interrupt_as_cancel(interrupted), Ok(None)));

        let answered: dialoguer::Result<Option<String>> = Ok(Some("/work".into()));
        assert_eq!(interrupt_as_cancel(answered).unwrap().as_deref(), Some("/work"));

        let broken: dialoguer::Result<Option<usize>> = Err(dialoguer::Error::IO(
            io::Error::new(io::ErrorKind::BrokenPipe, "gone"),
        ));
        assert!(interrupt_as_cancel(broken).is_err());
    }

    #[test]
    fn plain_presenter_does_not_style() {
        let presenter = TerminalPresenter { color: false };
        assert_eq!(presenter.paint(Tone::Error, "Error:"), "Error:");
    }

    #[test]
    fn gradient_runs_from_purple_to_orange() {
        assert_eq!(gradient_color(0.0), Color::Rgb { r: 114, g: 0, b: 201 });
        assert_eq!(gradient_color(1.0), Color::Rgb { r: 242, g: 131, b: 12 });
        assert_eq!(gradient_color(7.0), gradient_color(1.0));
    }

    #[test]
    fn colored_box_keeps_edges_aligned() {
        let painted = paint_edges("│ hi │", Color::Red);
        assert_eq!(strip_ansi_escapes::strip_str(&painted), "│ hi │");
    }
}
