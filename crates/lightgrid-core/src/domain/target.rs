//! Target layout: the destination grid expressed as a union of rectangles.
//!
//! The mapper does not work with rectangles directly.  It consumes the grid
//! column by column, so the rectangles are derived once into an ascending
//! sequence of [`TargetColumn`]s, each holding the ascending y values that
//! are available at that x.
//!
//! # Overlapping rectangles
//!
//! Rectangles may overlap.  Column derivation appends every covered y value
//! without deduplication, so an overlapped cell becomes two row slots and may
//! later receive two source LEDs; the second one wins the position index.
//! [`TargetLayout::overlapping_cells`] reports such cells so callers can warn.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::error::LayoutError;
use super::position::Position;

/// A rectangle of grid cells: `[x, x + width) × [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRectangle {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl TargetRectangle {
    /// A rectangle anchored at the origin.
    pub const fn sized(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Returns the rightmost X coordinate (exclusive), or `None` if it lies
    /// outside the `i32` grid.
    pub fn max_x(&self) -> Option<i32> {
        exclusive_end(self.x, self.width)
    }

    /// Returns the topmost Y coordinate (exclusive), or `None` if it lies
    /// outside the `i32` grid.
    pub fn max_y(&self) -> Option<i32> {
        exclusive_end(self.y, self.height)
    }

    /// Exclusive `(max_x, max_y)` of a usable rectangle.
    ///
    /// # Errors
    ///
    /// [`LayoutError::InvalidRectangle`] for a zero width or height, or when
    /// the rectangle extends past the `i32` grid.
    pub fn exclusive_bounds(&self) -> Result<(i32, i32), LayoutError> {
        match (self.max_x(), self.max_y()) {
            (Some(max_x), Some(max_y)) if self.width > 0 && self.height > 0 => Ok((max_x, max_y)),
            _ => Err(LayoutError::InvalidRectangle {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
            }),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns `true` if this rectangle shares at least one cell with `other`.
    pub fn overlaps(&self, other: &TargetRectangle) -> bool {
        // Widened so rectangles at the edge of the grid compare correctly.
        let end = |start: i32, len: u32| i64::from(start) + i64::from(len);
        i64::from(self.x) < end(other.x, other.width)
            && end(self.x, self.width) > i64::from(other.x)
            && i64::from(self.y) < end(other.y, other.height)
            && end(self.y, self.height) > i64::from(other.y)
    }
}

fn exclusive_end(start: i32, len: u32) -> Option<i32> {
    i32::try_from(len).ok().and_then(|len| start.checked_add(len))
}

/// Target layout as written in configuration: one rectangle or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSpec {
    Single(TargetRectangle),
    Many(Vec<TargetRectangle>),
}

impl TargetSpec {
    pub fn into_rectangles(self) -> Vec<TargetRectangle> {
        match self {
            TargetSpec::Single(rect) => vec![rect],
            TargetSpec::Many(rects) => rects,
        }
    }
}

impl Default for TargetSpec {
    fn default() -> Self {
        TargetSpec::Single(TargetRectangle::sized(10, 10))
    }
}

/// All row slots available at one x value, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetColumn {
    pub x: i32,
    pub rows: Vec<i32>,
}

/// The destination grid, derived into ascending columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLayout {
    rectangles: Vec<TargetRectangle>,
    columns: Vec<TargetColumn>,
}

impl TargetLayout {
    /// Derives the column list from `rectangles`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidRectangle`] if any rectangle is empty or
    /// extends past the `i32` grid; see [`TargetRectangle::exclusive_bounds`].
    /// width or height.
    pub fn new(rectangles: Vec<TargetRectangle>) -> Result<Self, LayoutError> {
        let bounds = rectangles
            .iter()
            .map(TargetRectangle::exclusive_bounds)
            .collect::<Result<Vec<_>, _>>()?;

        let mut by_x: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
        for (rect, (max_x, max_y)) in rectangles.iter().zip(bounds) {
            for x in rect.x..max_x {
                by_x.entry(x).or_default().extend(rect.y..max_y);
            }
        }

        let columns = by_x
            .into_iter()
            .map(|(x, mut rows)| {
                rows.sort_unstable();
                TargetColumn { x, rows }
            })
            .collect();

        Ok(Self {
            rectangles,
            columns,
        })
    }

    /// Convenience for a single `width × height` grid at the origin.
    pub fn grid(width: u32, height: u32) -> Result<Self, LayoutError> {
        Self::new(vec![TargetRectangle::sized(width, height)])
    }

    pub fn from_spec(spec: TargetSpec) -> Result<Self, LayoutError> {
        Self::new(spec.into_rectangles())
    }

    pub fn rectangles(&self) -> &[TargetRectangle] {
        &self.rectangles
    }

    /// Columns in ascending x order.
    pub fn columns(&self) -> &[TargetColumn] {
        &self.columns
    }

    /// Total number of row slots across all columns, duplicates included.
    pub fn slot_count(&self) -> usize {
        self.columns.iter().map(|c| c.rows.len()).sum()
    }

    /// Returns every cell covered by more than one rectangle, ascending.
    pub fn overlapping_cells(&self) -> Vec<Position> {
        let mut counts: HashMap<Position, usize> = HashMap::new();
        for column in &self.columns {
            for &y in &column.rows {
                *counts.entry(Position::new(column.x, y)).or_default() += 1;
            }
        }
        let mut cells: Vec<Position> = counts
            .into_iter()
            .filter_map(|(pos, n)| (n > 1).then_some(pos))
            .collect();
        cells.sort_unstable();
        cells
    }
}

impl TryFrom<TargetSpec> for TargetLayout {
    type Error = LayoutError;

    fn try_from(spec: TargetSpec) -> Result<Self, Self::Error> {
        Self::from_spec(spec)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
