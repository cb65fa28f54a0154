//! Terminal multiplexer access.
//!
//! The history context reads pane text through the [`Multiplexer`] trait so
//! that tests can substitute a fake for a live tmux server.

mod tmux;

use std::cmp::Ordering;
use std::fmt;

use crate::error::Result;

pub use tmux::Tmux;

/// A tmux pane identifier such as `%3`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PaneId(pub String);

impl PaneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    fn number(&self) -> Option<u64> {
        self.0.trim_start_matches('%').parse().ok()
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Numeric order when both ids parse (`%2` < `%10`), lexical otherwise.
impl Ord for PaneId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number(), other.number()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for PaneId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaneSelector {
    Active,
    Pane(PaneId),
}

pub trait Multiplexer {
    fn is_inside_session(&self) -> bool;

    /// Panes of the current window.
    fn list_panes(&self) -> Result<Vec<PaneId>>;

    /// The last `max_lines` non-trailing-blank lines of a pane; 0 means all.
    fn get_pane_text(&self, pane: &PaneSelector, max_lines: usize) -> Result<String>;
}

/// Keep the last `max_lines` lines after dropping trailing blank lines.
pub(crate) fn tail_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(0, |idx| idx + 1);
    let start = if max_lines == 0 {
        0
    } else {
        end.saturating_sub(max_lines)
    };
    lines[start..end].join("\n")
}
