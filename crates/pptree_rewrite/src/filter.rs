//! Output stream filter for external tool output.
//!
//! Tools that draw progress bars emit ANSI control sequences and bare
//! carriage returns. The filter runs a three-state machine over the merged
//! output stream and yields the lines a terminal would finally show:
//! escape sequences are dropped, and text written after a `\r` replaces the
//! current line. Completed lines go to a bounded tail buffer and, depending
//! on [`FilterPolicy`], to the log.

use log::info;
use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

/// How many completed lines the filter retains for error reports.
pub const TAIL_LINES: usize = 20;

/// Escape-sequence recognition state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterState {
    /// Ordinary text.
    #[default]
    Normal,
    /// An `ESC` was seen.
    EscSeen,
    /// Inside a control sequence introduced by `ESC [`.
    InCsi,
}

/// The effect of one character on the line buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Discard the character.
    Skip,
    /// A carriage return: the next printable character overwrites the line.
    MarkOverwrite,
    /// A newline: the current line is complete.
    EndLine,
    /// Append the character, clearing the line first if an overwrite is pending.
    Append {
        /// Whether the buffer must be cleared before appending.
        clear_first: bool,
    },
}

/// The transition function. `pending` is the overwrite flag set by a `\r`.
pub fn step(state: FilterState, pending: bool, ch: char) -> (FilterState, Action) {
    match state {
        FilterState::Normal => match ch {
            '\x1b' => (FilterState::EscSeen, Action::Skip),
            '\r' => (FilterState::Normal, Action::MarkOverwrite),
            '\n' => (FilterState::Normal, Action::EndLine),
            _ => (FilterState::Normal, Action::Append { clear_first: pending }),
        },
        FilterState::EscSeen if ch == '[' => (FilterState::InCsi, Action::Skip),
        FilterState::EscSeen => (FilterState::Normal, Action::Skip),
        FilterState::InCsi if ch.is_ascii_digit() || ch == ';' => (FilterState::InCsi, Action::Skip),
        FilterState::InCsi => (FilterState::Normal, Action::Skip),
    }
}

/// Whether completed lines are re-emitted to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Echo {
    /// Log each line at info level.
    #[default]
    Echo,
    /// Keep lines in the tail buffer only.
    Quiet,
}

/// Per-invocation output policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPolicy {
    /// Log or suppress completed lines.
    pub echo: Echo,
    /// Show the real working-directory path instead of `<temp-dir>`.
    pub show_tempdir: bool,
    /// Prefix for logged lines.
    pub tag: String,
}

impl FilterPolicy {
    /// An echoing policy with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            echo: Echo::Echo,
            show_tempdir: false,
            tag: tag.into(),
        }
    }
}

/// Index-to-name tables for primary inputs and outputs.
///
/// Deserializes from `{"inputs": {"0": "a"}, "outputs": {"1": "y"}}`; either
/// table may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IoNames {
    /// Primary-input names by index.
    pub inputs: BTreeMap<u32, String>,
    /// Primary-output names by index.
    pub outputs: BTreeMap<u32, String>,
}

impl IoNames {
    fn input(&self, index: u32) -> &str {
        self.inputs.get(&index).map_or("???", String::as_str)
    }

    fn output(&self, index: u32) -> &str {
        self.outputs.get(&index).map_or("???", String::as_str)
    }
}

fn take_number(s: &str) -> Option<(u32, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

/// Annotates a `Start-point = pi<N>.  End-point = po<M>.` line with the
/// port names from `names`. Returns `None` for any other line.
pub fn annotate_line(line: &str, names: &IoNames) -> Option<String> {
    let rest = line.strip_prefix("Start-point = pi")?;
    let (pi, rest) = take_number(rest)?;
    let rest = rest.strip_prefix('.')?.trim_start();
    let rest = rest.strip_prefix("End-point = po")?;
    let (po, _) = take_number(rest)?;
    Some(format!(
        "Start-point = pi{pi} ({}).  End-point = po{po} ({}).",
        names.input(pi),
        names.output(po)
    ))
}

/// A single-use filter for one tool invocation.
#[derive(Debug)]
pub struct OutputFilter {
    state: FilterState,
    pending: bool,
    line: String,
    tail: VecDeque<String>,
    lines_seen: usize,
    policy: FilterPolicy,
    tempdir: Option<String>,
    names: Option<IoNames>,
}

impl OutputFilter {
    /// Creates a filter with the given policy.
    pub fn new(policy: FilterPolicy) -> Self {
        Self {
            state: FilterState::Normal,
            pending: false,
            line: String::new(),
            tail: VecDeque::with_capacity(TAIL_LINES),
            lines_seen: 0,
            policy,
            tempdir: None,
            names: None,
        }
    }

    /// Hides `dir` in logged lines unless the policy shows it.
    pub fn with_tempdir(mut self, dir: &Path) -> Self {
        self.tempdir = Some(dir.display().to_string());
        self
    }

    /// Enables Start-point/End-point annotation.
    pub fn with_io_names(mut self, names: IoNames) -> Self {
        self.names = Some(names);
        self
    }

    /// Consumes one character.
    pub fn feed_char(&mut self, ch: char) {
        let (state, action) = step(self.state, self.pending, ch);
        self.state = state;
        match action {
            Action::Skip => {}
            Action::MarkOverwrite => self.pending = true,
            Action::EndLine => {
                self.pending = false;
                self.complete_line();
            }
            Action::Append { clear_first } => {
                if clear_first {
                    self.line.clear();
                    self.pending = false;
                }
                self.line.push(ch);
            }
        }
    }

    /// Consumes every character of `text`.
    pub fn feed_str(&mut self, text: &str) {
        text.chars().for_each(|c| self.feed_char(c));
    }

    /// Completes a trailing line that had no newline.
    pub fn finish(&mut self) {
        if !self.line.is_empty() {
            self.complete_line();
        }
        self.state = FilterState::Normal;
        self.pending = false;
    }

    /// The last [`TAIL_LINES`] completed lines, oldest first.
    pub fn tail(&self) -> Vec<String> {
        self.tail.iter().cloned().collect()
    }

    /// Total number of completed non-empty lines.
    pub fn lines_seen(&self) -> usize {
        self.lines_seen
    }

    fn complete_line(&mut self) {
        let raw = std::mem::take(&mut self.line);
        if raw.is_empty() {
            return;
        }
        let mut line = match &self.names {
            Some(names) => annotate_line(&raw, names).unwrap_or(raw),
            None => raw,
        };
        if let Some(dir) = self.tempdir.as_deref().filter(|_| !self.policy.show_tempdir) {
            line = line.replace(dir, "<temp-dir>");
        }
        if self.policy.echo == Echo::Echo {
            info!("{}: {}", self.policy.tag, line);
        }
        if self.tail.len() == TAIL_LINES {
            self.tail.pop_front();
        }
        self.tail.push_back(line);
        self.lines_seen += 1;
    }
}
