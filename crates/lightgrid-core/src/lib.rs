//! # lightgrid-core
//!
//! Layout mapping for LED boards built from several devices.
//!
//! This crate has no I/O.  It turns the raw coordinates reported by each
//! device into a stable grid mapping, stores per-LED colors and encodes
//! per-device frames.  Device discovery, transport and frame scheduling live
//! in `lightgrid-board`.

pub mod domain;

pub use domain::board_layout::{BoardLayout, BoardLayoutDocument, Led, PersistedLed};
pub use domain::color::{Color, ColorChannelMode, Frame};
pub use domain::error::LayoutError;
pub use domain::mapper::LayoutMapper;
pub use domain::position::Position;
pub use domain::source::{
    DeviceId, LayoutKind, RawCoordinate, RawSourceLayout, SourceCoordinates, SourceLayout,
};
pub use domain::target::{TargetColumn, TargetLayout, TargetRectangle, TargetSpec};
