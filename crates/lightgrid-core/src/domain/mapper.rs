//! Layout mapper: assigns device coordinates to target grid cells.
//!
//! # Algorithm
//!
//! 1. Collect every active coordinate of every source layout into one list,
//!    in the order the layouts were added.
//! 2. Sort that list by x.  The sort is stable, so coordinates with equal x
//!    keep source order: earlier layouts first, then ascending physical index.
//! 3. Walk the target columns left to right.  A column with `k` row slots
//!    takes the next `k` coordinates from the front of the list, sorts them
//!    by y (stable again) and pairs the i-th coordinate with the i-th row.
//! 4. Columns that outrun the list stay sparse; coordinates left after the
//!    last column are dropped and never reach the board.
//! 5. Inactive (duplicate) coordinates are added unmapped so their physical
//!    index still has a frame slot.
//!
//! The consumption is global across devices: a column may be filled from
//! several devices at once.  For a fixed wiring order and rectangle set the
//! result is fully reproducible, which matters because the mapping is
//! persisted and reused across restarts.

use tracing::{debug, info};

use super::board_layout::{BoardLayout, Led};
use super::error::LayoutError;
use super::position::Position;
use super::source::{DeviceId, SourceCoordinates, SourceLayout};
use super::target::TargetLayout;

/// Collects source layouts and maps them onto a [`TargetLayout`].
#[derive(Debug, Default, Clone)]
pub struct LayoutMapper {
    sources: Vec<SourceLayout>,
}

impl LayoutMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `sources` onto `target` in one call.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnsupportedLayoutKind`] if any source layout is
    /// not 2-D; no board layout is produced in that case.
    pub fn map_layouts(
        sources: impl IntoIterator<Item = SourceLayout>,
        target: &TargetLayout,
    ) -> Result<BoardLayout, LayoutError> {
        let mut mapper = Self::new();
        for source in sources {
            mapper.add_source_layout(source)?;
        }
        Ok(mapper.map(target))
    }

    /// Adds a device's source layout.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnsupportedLayoutKind`] for linear and 3-D layouts.
    pub fn add_source_layout(&mut self, source: SourceLayout) -> Result<(), LayoutError> {
        if !source.is_2d() {
            return Err(LayoutError::UnsupportedLayoutKind {
                device: source.device().clone(),
                kind: source.kind(),
            });
        }
        self.sources.push(source);
        Ok(())
    }

    pub fn sources(&self) -> &[SourceLayout] {
        &self.sources
    }

    /// Produces the board layout for `target`.
    pub fn map(&self, target: &TargetLayout) -> BoardLayout {
        let mut pool: Vec<(&DeviceId, &SourceCoordinates)> = self
            .sources
            .iter()
            .flat_map(|s| s.active_coordinates().map(move |c| (s.device(), c)))
            .collect();
        pool.sort_by_key(|(_, c)| c.x);

        let mut leds = Vec::with_capacity(pool.len());
        let mut remaining = pool.as_slice();

        for column in target.columns() {
            let take = column.rows.len().min(remaining.len());
            let (chunk, rest) = remaining.split_at(take);
            remaining = rest;

            let mut chunk = chunk.to_vec();
            chunk.sort_by_key(|(_, c)| c.y);

            leds.extend(chunk.iter().zip(&column.rows).map(|((device, c), &y)| {
                Led::from_source(device, c).at(Position::new(column.x, y))
            }));

            if take < column.rows.len() {
                debug!(
                    "column x={} left with {} empty slot(s)",
                    column.x,
                    column.rows.len() - take
                );
            }
        }

        let mapped = leds.len();
        let dropped = remaining.len();

        leds.extend(
            self.sources
                .iter()
                .flat_map(|s| s.inactive_coordinates().map(move |c| Led::from_source(s.device(), c))),
        );

        info!(
            sources = self.sources.len(),
            mapped,
            dropped,
            inactive = leds.len() - mapped,
            "mapped source layouts onto {} target slots",
            target.slot_count()
        );

        BoardLayout::from_leds(leds)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
