//! Domain entities for lightgrid.
//!
//! Everything in here is pure data and algorithms: no sockets, no files, no
//! clocks.  The board crate owns the I/O and drives these types.
//!
//! # How the pieces fit (for beginners)
//!
//! A lightgrid *board* is a set of LED devices that should behave like one
//! rectangular pixel grid.  Each device reports where its LEDs physically sit
//! (a [`source::SourceLayout`]); the user describes the grid they want (a
//! [`target::TargetLayout`]); the [`mapper::LayoutMapper`] pairs the two up and
//! produces a [`board_layout::BoardLayout`]: one [`board_layout::Led`] per
//! physical LED, most of them with a grid [`position::Position`].
//!
//! Colors are written to LEDs by position, and each device's LEDs are later
//! collected back into a [`color::Frame`] in physical order for transmission.

pub mod board_layout;
pub mod color;
pub mod error;
pub mod mapper;
pub mod position;
pub mod source;
pub mod target;
