//! Traversal direction, fixed at engine construction.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Traversal order over a sorted index.
///
/// `Ascending` returns low scores first; `Descending` returns high scores
/// first. Every engine takes a `Direction` at construction, so an engine
/// without one cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    #[default]
    Descending,
}

impl Direction {
    pub fn is_descending(self) -> bool {
        matches!(self, Self::Descending)
    }

    pub fn is_ascending(self) -> bool {
        matches!(self, Self::Ascending)
    }
}

impl FromStr for Direction {
    type Err = std::convert::Infallible;

    /// Unknown values coerce to `Descending`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Ascending" => Self::Ascending,
            _ => Self::Descending,
        })
    }
}
