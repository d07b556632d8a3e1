//! Source layouts: LED coordinates as reported by a physical device.
//!
//! Each device reports one coordinate triple per physical LED, in wiring
//! order.  Coordinates may repeat (two LEDs taped to the same spot) and may be
//! sparse.  [`SourceLayout::new`] assigns each coordinate its physical index
//! and collapses exact duplicates so that only the earliest occurrence stays
//! active.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a physical device, as reported by the device itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Dimensionality tag a device attaches to its reported layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutKind {
    #[serde(rename = "linear")]
    Linear,
    #[serde(rename = "2d")]
    TwoD,
    #[serde(rename = "3d")]
    ThreeD,
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            LayoutKind::Linear => "linear",
            LayoutKind::TwoD => "2d",
            LayoutKind::ThreeD => "3d",
        };
        f.write_str(tag)
    }
}

/// One raw coordinate triple as reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawCoordinate {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub z: i32,
}

impl RawCoordinate {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A device's layout exactly as it arrives from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSourceLayout {
    pub source: LayoutKind,
    #[serde(default)]
    pub uuid: String,
    pub coordinates: Vec<RawCoordinate>,
}

/// A coordinate triple with its physical index and activity flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceCoordinates {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Physical ordinal of the LED on its device.
    pub index: usize,
    /// `false` for every repeat of an earlier (x, y, z) triple.
    pub active: bool,
}

/// All coordinates reported by one device.
///
/// The device is referenced by id only; the layout does not own it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    device: DeviceId,
    uuid: String,
    kind: LayoutKind,
    coordinates: Vec<SourceCoordinates>,
}

impl SourceLayout {
    /// Builds a source layout, assigning indices `0..n` in input order and
    /// marking every later duplicate of a triple inactive.
    pub fn new(
        device: DeviceId,
        uuid: impl Into<String>,
        kind: LayoutKind,
        coordinates: impl IntoIterator<Item = RawCoordinate>,
    ) -> Self {
        let mut seen = HashSet::new();
        let coordinates = coordinates
            .into_iter()
            .enumerate()
            .map(|(index, raw)| SourceCoordinates {
                x: raw.x,
                y: raw.y,
                z: raw.z,
                index,
                active: seen.insert((raw.x, raw.y, raw.z)),
            })
            .collect();

        Self {
            device,
            uuid: uuid.into(),
            kind,
            coordinates,
        }
    }

    /// Builds a source layout from the shape a transport returns.
    pub fn from_raw(device: DeviceId, raw: RawSourceLayout) -> Self {
        Self::new(device, raw.uuid, raw.source, raw.coordinates)
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    pub fn is_2d(&self) -> bool {
        self.kind == LayoutKind::TwoD
    }

    pub fn coordinates(&self) -> &[SourceCoordinates] {
        &self.coordinates
    }

    pub fn active_coordinates(&self) -> impl Iterator<Item = &SourceCoordinates> {
        self.coordinates.iter().filter(|c| c.active)
    }

    pub fn inactive_coordinates(&self) -> impl Iterator<Item = &SourceCoordinates> {
        self.coordinates.iter().filter(|c| !c.active)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
