//! Integer cell positions on the target grid.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A cell on the 2-D target grid.
///
/// `x` grows to the right and `y` grows upwards, matching the bottom-to-top
/// row order the mapper assigns within each column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
