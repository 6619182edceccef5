// src/routing/router.rs

//! Output path inference.
//!
//! The router owns the input path, the output path and the mode flag. It
//! fills in an output path whenever the current one still looks like
//! something it derived itself, and leaves user edits alone.

use tracing::debug;

use crate::types::Mode;

/// Default archive marker appended to compressed files.
pub const ARCHIVE_EXTENSION: &str = ".bigzip";

/// Case-insensitive suffix match against the archive marker.
pub fn is_archive(path: &str, marker: &str) -> bool {
    !path.is_empty() && ends_with_ignore_ascii_case(path, marker)
}

/// `path + marker`, even if `path` already carries the marker.
pub fn append_marker(path: &str, marker: &str) -> String {
    format!("{path}{marker}")
}

/// `path` without a trailing marker; unchanged if there is none.
pub fn strip_marker(path: &str, marker: &str) -> String {
    if ends_with_ignore_ascii_case(path, marker) {
        path[..path.len() - marker.len()].to_string()
    } else {
        path.to_string()
    }
}

fn ends_with_ignore_ascii_case(path: &str, marker: &str) -> bool {
    let (p, m) = (path.as_bytes(), marker.as_bytes());
    // An ASCII match on the tail also guarantees a char boundary for slicing.
    p.len() >= m.len() && p[p.len() - m.len()..].eq_ignore_ascii_case(m)
}

/// Current path fields as seen by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathState {
    pub input: String,
    pub output: String,
    pub mode: Mode,
}

/// Path Router.
///
/// `previous_input` is the input the current output would have been derived
/// from; it is how the router tells its own values from manual edits.
#[derive(Debug, Clone)]
pub struct PathRouter {
    marker: String,
    state: PathState,
    previous_input: String,
}

impl PathRouter {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            state: PathState::default(),
            previous_input: String::new(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn state(&self) -> &PathState {
        &self.state
    }

    pub fn input(&self) -> &str {
        &self.state.input
    }

    pub fn output(&self) -> &str {
        &self.state.output
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    /// Apply an input path edit.
    ///
    /// Recomputes the output only if it is blank or equals one of the two
    /// values derivable from the previous input, then forces the mode to
    /// match the new input. A mode flip re-derives the output
    /// unconditionally (see [`PathRouter::set_mode`]).
    pub fn set_input(&mut self, value: impl Into<String>) {
        let value = value.into();
        let archive = is_archive(&value, &self.marker);

        if !value.trim().is_empty() && self.output_is_derived() {
            self.state.output = if archive {
                strip_marker(&value, &self.marker)
            } else {
                append_marker(&value, &self.marker)
            };
            debug!(input = %value, output = %self.state.output, "derived output path");
        }

        self.state.input = value.clone();
        self.previous_input = value;
        self.set_mode(Mode::from_decompress(archive));
    }

    /// Apply a manual output path edit.
    pub fn set_output(&mut self, value: impl Into<String>) {
        self.state.output = value.into();
    }

    /// Apply a mode change. Returns `true` if the mode actually changed.
    ///
    /// On change, and only when an input is present, the output is
    /// recomputed regardless of manual edits.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        if self.state.mode == mode {
            return false;
        }
        self.state.mode = mode;

        let input = &self.state.input;
        if !input.trim().is_empty() {
            self.state.output = match mode {
                Mode::Decompress if is_archive(input, &self.marker) => {
                    strip_marker(input, &self.marker)
                }
                Mode::Decompress => input.clone(),
                Mode::Compress => append_marker(input, &self.marker),
            };
            debug!(?mode, output = %self.state.output, "mode change re-derived output path");
        }
        true
    }

    fn output_is_derived(&self) -> bool {
        let output = &self.state.output;
        if output.trim().is_empty() {
            return true;
        }
        let previous = &self.previous_input;
        !previous.is_empty()
            && (*output == append_marker(previous, &self.marker)
                || *output == strip_marker(previous, &self.marker))
    }
}

impl Default for PathRouter {
    fn default() -> Self {
        Self::new(ARCHIVE_EXTENSION)
    }
}
