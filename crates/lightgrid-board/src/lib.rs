//! lightgrid-board library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the `lightgrid` binary share the same module tree.

pub mod application;
pub mod infrastructure;

pub use application::board::{Board, BoardError, SharedLayout};
pub use application::device::Device;
pub use application::frame_scheduler::{
    FlushError, FrameScheduler, SchedulerHandle, SchedulerMode, SchedulerSettings,
    SchedulerState, SchedulerStats,
};
pub use application::transport::{DeviceInfo, DeviceTransport, Session, TransportError};
