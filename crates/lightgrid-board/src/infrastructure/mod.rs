//! Infrastructure layer for the board.
//!
//! Contains the file-system facing adapters: configuration and persisted
//! state under `storage`, and the snapshot-backed [`DeviceTransport`].
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `lightgrid_core`, but MUST NOT be imported by the `application` layer.
//!
//! [`DeviceTransport`]: crate::application::transport::DeviceTransport

pub mod snapshot;
pub mod storage;
