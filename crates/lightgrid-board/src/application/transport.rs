//! The device transport seam.
//!
//! Everything that talks to real hardware goes through [`DeviceTransport`].
//! The application layer never opens sockets or files itself; the binary
//! injects a concrete transport at startup and tests inject recording doubles
//! or `mockall` mocks.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use lightgrid_core::{ColorChannelMode, DeviceId, Frame, RawSourceLayout};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A transport failure.
///
/// The application does not interpret transport errors, it only logs and
/// propagates them, so the error is an opaque message.  It is `Clone` so one
/// send result can answer every caller waiting on that send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Identity and addressing of one device.
///
/// This is also the persisted device record:
/// `{ "id": ..., "address": ..., "colorChannelMode": "rgb" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub address: String,
    #[serde(default)]
    pub color_channel_mode: ColorChannelMode,
}

impl DeviceInfo {
    pub fn new(id: impl Into<DeviceId>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            color_channel_mode: ColorChannelMode::default(),
        }
    }

    pub fn with_color_channel_mode(mut self, mode: ColorChannelMode) -> Self {
        self.color_channel_mode = mode;
        self
    }
}

/// An authenticated session token returned by [`DeviceTransport::login`].
#[derive(Clone, PartialEq, Eq)]
pub struct Session(String);

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Session(..)")
    }
}

/// Access to physical LED devices.
///
/// All operations may suspend; none of them is retried by the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Finds the devices reachable within `timeout`.
    async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceInfo>, TransportError>;

    /// Opens a session with `device`.
    async fn login(&self, device: &DeviceInfo) -> Result<Session, TransportError>;

    /// Reads the LED coordinates `device` reports, in wiring order.
    async fn fetch_source_layout(
        &self,
        device: &DeviceInfo,
        session: &Session,
    ) -> Result<RawSourceLayout, TransportError>;

    /// Pushes one full frame to `device`.
    async fn send_frame(&self, device: &DeviceInfo, frame: &Frame) -> Result<(), TransportError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
