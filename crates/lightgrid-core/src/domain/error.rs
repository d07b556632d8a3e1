//! Error taxonomy for mapping, loading and addressing board layouts.

use thiserror::Error;

use super::position::Position;
use super::source::{DeviceId, LayoutKind};

/// Errors raised by the layout domain.
///
/// Mapping and load errors abort the whole operation; nothing partial is
/// ever returned alongside one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// A source layout that is not 2-D was handed to the mapper.
    #[error("device {device} reports a {kind} layout; only 2d layouts can be mapped")]
    UnsupportedLayoutKind { device: DeviceId, kind: LayoutKind },

    /// A persisted board layout references a device the board does not hold.
    #[error("device {0} not found")]
    UnknownDevice(DeviceId),

    /// No mapped LED occupies the addressed grid cell.
    #[error("no LED mapped at position {0}")]
    PositionNotFound(Position),

    /// No LED exists for the given device and physical index.
    #[error("device {device} has no LED at index {index}")]
    LedNotFound { device: DeviceId, index: usize },

    /// A random pick was requested from a layout without mapped LEDs.
    #[error("board layout has no mapped LEDs")]
    EmptyLayout,

    /// A target rectangle with zero width or height, or one that extends
    /// past the `i32` grid.
    #[error("invalid target rectangle {width}x{height} at {x},{y}")]
    InvalidRectangle { x: i32, y: i32, width: u32, height: u32 },
}
