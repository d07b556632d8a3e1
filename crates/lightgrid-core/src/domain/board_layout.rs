//! Board layout: the realized mapping from physical LEDs to grid cells.
//!
//! A [`BoardLayout`] owns every [`Led`] record of a board plus two lookup
//! indexes:
//!
//! - grid position → LED (only LEDs that were mapped onto a cell), and
//! - (device id, physical index) → LED (every LED, mapped or not).
//!
//! Both indexes are rebuilt in full whenever the LED set is replaced
//! ([`BoardLayout::from_leds`], [`BoardLayout::from_document`]); they are
//! never patched per LED.  Color writes touch only the LED records, so the
//! indexes stay valid for the lifetime of the layout.
//!
//! # Persisted form
//!
//! [`BoardLayoutDocument`] is keyed by device id, then holds one entry per
//! physical index in ascending order:
//!
//! ```json
//! { "A1B2C3": [ { "x": 0, "y": 0 }, { "active": false }, { "x": 0, "y": 1 } ] }
//! ```
//!
//! An omitted `active` means `true`; omitted `x`/`y` means unmapped.  A
//! physical index with no LED record (a coordinate the mapper dropped) is
//! written as `null` and stays without a record on load.  Colors are never
//! persisted.

use std::collections::HashMap;

use indexmap::IndexMap;
use rand::seq::IteratorRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::color::{Color, Frame};
use super::error::LayoutError;
use super::position::Position;
use super::source::{DeviceId, SourceCoordinates};

/// One physical LED and its place on the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Led {
    /// Owning device, referenced by id.
    pub device: DeviceId,
    /// Physical ordinal of the LED on its device.
    pub index: usize,
    /// Grid cell, `None` when the LED was not mapped.
    pub position: Option<Position>,
    pub active: bool,
    pub color: Color,
}

impl Led {
    pub fn new(device: DeviceId, index: usize) -> Self {
        Self {
            device,
            index,
            position: None,
            active: true,
            color: Color::BLACK,
        }
    }

    /// Creates an unmapped LED inheriting the device and activity of a source
    /// coordinate.
    pub fn from_source(device: &DeviceId, coordinates: &SourceCoordinates) -> Self {
        Self {
            active: coordinates.active,
            ..Self::new(device.clone(), coordinates.index)
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn is_mapped(&self) -> bool {
        self.position.is_some()
    }
}

/// Persisted state of one LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedLed {
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

impl Default for PersistedLed {
    fn default() -> Self {
        Self {
            active: true,
            x: None,
            y: None,
        }
    }
}

impl PersistedLed {
    fn position(&self) -> Option<Position> {
        Some(Position::new(self.x?, self.y?))
    }
}

impl From<&Led> for PersistedLed {
    fn from(led: &Led) -> Self {
        Self {
            active: led.active,
            x: led.position.map(|p| p.x),
            y: led.position.map(|p| p.y),
        }
    }
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// Persisted board layout: device id → LEDs ordered by physical index,
/// `None` where an index has no LED record.
pub type BoardLayoutDocument = IndexMap<DeviceId, Vec<Option<PersistedLed>>>;

/// The set of LEDs of a board together with its lookup indexes.
#[derive(Debug, Clone, Default)]
pub struct BoardLayout {
    leds: Vec<Led>,
    /// Grid position → slot in `leds`.
    by_position: HashMap<Position, usize>,
    /// Device → physical index → slot in `leds`.  Devices keep first-seen
    /// order; a `None` entry is a physical index without an LED record.
    by_device: IndexMap<DeviceId, Vec<Option<usize>>>,
}

impl BoardLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `leds` and builds both indexes.
    ///
    /// If two LEDs claim the same grid cell the later one wins the position
    /// index; the earlier one stays drivable by device index.
    pub fn from_leds(leds: Vec<Led>) -> Self {
        let mut by_position = HashMap::new();
        let mut by_device: IndexMap<DeviceId, Vec<Option<usize>>> = IndexMap::new();

        for (slot, led) in leds.iter().enumerate() {
            if let Some(position) = led.position {
                if let Some(previous) = by_position.insert(position, slot) {
                    let previous: &Led = &leds[previous];
                    warn!(
                        "position {position} claimed by {}#{} and {}#{}; keeping the latter",
                        previous.device, previous.index, led.device, led.index
                    );
                }
            }

            let slots = by_device.entry(led.device.clone()).or_default();
            if slots.len() <= led.index {
                slots.resize(led.index + 1, None);
            }
            slots[led.index] = Some(slot);
        }

        Self {
            leds,
            by_position,
            by_device,
        }
    }

    /// Rebuilds a layout from its persisted form.
    ///
    /// `is_known` decides whether a device id belongs to the board.  All
    /// colors start black.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownDevice`] for the first device id that
    /// `is_known` rejects; no layout is produced in that case.
    pub fn from_document(
        document: &BoardLayoutDocument,
        is_known: impl Fn(&DeviceId) -> bool,
    ) -> Result<Self, LayoutError> {
        if let Some(unknown) = document.keys().find(|id| !is_known(id)) {
            return Err(LayoutError::UnknownDevice(unknown.clone()));
        }

        let leds = document
            .iter()
            .flat_map(|(device, entries)| {
                entries.iter().enumerate().filter_map(move |(index, entry)| {
                    entry.as_ref().map(|entry| Led {
                        position: entry.position(),
                        active: entry.active,
                        ..Led::new(device.clone(), index)
                    })
                })
            })
            .collect();

        Ok(Self::from_leds(leds))
    }

    /// Produces the persisted form, devices in first-seen order and LEDs in
    /// ascending physical index.
    pub fn to_document(&self) -> BoardLayoutDocument {
        self.by_device
            .iter()
            .map(|(device, slots)| {
                let entries = slots
                    .iter()
                    .map(|slot| slot.map(|slot| PersistedLed::from(&self.leds[slot])))
                    .collect();
                (device.clone(), entries)
            })
            .collect()
    }

    pub fn leds(&self) -> &[Led] {
        &self.leds
    }

    pub fn len(&self) -> usize {
        self.leds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leds.is_empty()
    }

    /// Device ids in first-seen order.
    pub fn devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.by_device.keys()
    }

    pub fn get_by_position(&self, position: Position) -> Option<&Led> {
        self.by_position.get(&position).map(|&slot| &self.leds[slot])
    }

    pub fn get_by_device_index(&self, device: &DeviceId, index: usize) -> Option<&Led> {
        let slot = (*self.by_device.get(device)?.get(index)?)?;
        Some(&self.leds[slot])
    }

    /// All LEDs that carry a grid position, in construction order.
    pub fn all_active(&self) -> Vec<&Led> {
        self.leds.iter().filter(|led| led.is_mapped()).collect()
    }

    /// Picks a mapped LED uniformly at random.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::EmptyLayout`] when no LED carries a position.
    pub fn random_active<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&Led, LayoutError> {
        self.leds
            .iter()
            .filter(|led| led.is_mapped())
            .choose(rng)
            .ok_or(LayoutError::EmptyLayout)
    }

    /// Returns the color at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::PositionNotFound`] if no LED is mapped there.
    pub fn color_at(&self, position: Position) -> Result<Color, LayoutError> {
        self.get_by_position(position)
            .map(|led| led.color)
            .ok_or(LayoutError::PositionNotFound(position))
    }

    /// Sets the color of the LED at `position` and returns its device, whose
    /// frame is now out of date.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::PositionNotFound`] if no LED is mapped there.
    pub fn set_color(&mut self, position: Position, color: Color) -> Result<&DeviceId, LayoutError> {
        let slot = *self
            .by_position
            .get(&position)
            .ok_or(LayoutError::PositionNotFound(position))?;
        let led = &mut self.leds[slot];
        led.color = color;
        Ok(&led.device)
    }

    /// Sets the color of an LED addressed by device and physical index.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::LedNotFound`] if no such LED exists.
    pub fn set_color_at(
        &mut self,
        device: &DeviceId,
        index: usize,
        color: Color,
    ) -> Result<(), LayoutError> {
        let slot = self
            .by_device
            .get(device)
            .and_then(|slots| slots.get(index).copied().flatten())
            .ok_or_else(|| LayoutError::LedNotFound {
                device: device.clone(),
                index,
            })?;
        self.leds[slot].color = color;
        Ok(())
    }

    /// Sets every LED, mapped or not, to `color`.
    pub fn fill(&mut self, color: Color) {
        for led in &mut self.leds {
            led.color = color;
        }
    }

    /// Resets every LED to black.
    pub fn clear(&mut self) {
        self.fill(Color::BLACK);
    }

    /// Reads the current frame of `device`: one color per physical index,
    /// black where no LED record exists.
    ///
    /// Returns `None` for a device that has no LEDs in this layout.
    pub fn frame(&self, device: &DeviceId) -> Option<Frame> {
        let slots = self.by_device.get(device)?;
        let colors = slots
            .iter()
            .map(|slot| slot.map_or(Color::BLACK, |slot| self.leds[slot].color))
            .collect();
        Some(Frame::new(colors))
    }

    /// Smallest and largest mapped coordinates, or `None` if nothing is mapped.
    pub fn bounds(&self) -> Option<(Position, Position)> {
        let mut positions = self.by_position.keys();
        let first = *positions.next()?;
        Some(positions.fold((first, first), |(min, max), p| {
            (
                Position::new(min.x.min(p.x), min.y.min(p.y)),
                Position::new(max.x.max(p.x), max.y.max(p.y)),
            )
        }))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
