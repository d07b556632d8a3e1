//! Shared test doubles for the board integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lightgrid_board::{DeviceInfo, DeviceTransport, Session, TransportError};
use lightgrid_core::{Color, Frame, LayoutKind, RawCoordinate, RawSourceLayout};
use tokio::time::Instant;

/// One frame as it reached the transport.
#[derive(Debug, Clone)]
pub struct SentFrame {
    pub device: String,
    pub at: Instant,
    pub colors: Vec<Color>,
}

/// In-memory transport that serves fixed layouts and records every frame.
#[derive(Default)]
pub struct RecordingTransport {
    devices: Vec<(String, Vec<(i32, i32)>)>,
    failing: Vec<String>,
    send_delay: Duration,
    sent: Mutex<Vec<SentFrame>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, id: &str, coords: &[(i32, i32)]) -> Self {
        self.devices.push((id.to_string(), coords.to_vec()));
        self
    }

    /// Every send to `id` fails.
    pub fn failing(mut self, id: &str) -> Self {
        self.failing.push(id.to_string());
        self
    }

    /// Each send takes `delay` of (virtual) time.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    pub fn sent(&self) -> Vec<SentFrame> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, id: &str) -> Vec<SentFrame> {
        self.sent().into_iter().filter(|f| f.device == id).collect()
    }
}

#[async_trait]
impl DeviceTransport for RecordingTransport {
    async fn discover(&self, _timeout: Duration) -> Result<Vec<DeviceInfo>, TransportError> {
        Ok(self
            .devices
            .iter()
            .map(|(id, _)| DeviceInfo::new(id.as_str(), format!("mem://{id}")))
            .collect())
    }

    async fn login(&self, device: &DeviceInfo) -> Result<Session, TransportError> {
        Ok(Session::new(format!("session-{}", device.id)))
    }

    async fn fetch_source_layout(
        &self,
        device: &DeviceInfo,
        _session: &Session,
    ) -> Result<RawSourceLayout, TransportError> {
        let (_, coords) = self
            .devices
            .iter()
            .find(|(id, _)| id == device.id.as_str())
            .ok_or_else(|| TransportError::new(format!("unknown device {}", device.id)))?;
        Ok(RawSourceLayout {
            source: LayoutKind::TwoD,
            uuid: format!("uuid-{}", device.id),
            coordinates: coords.iter().map(|&(x, y)| RawCoordinate::new(x, y, 0)).collect(),
        })
    }

    async fn send_frame(&self, device: &DeviceInfo, frame: &Frame) -> Result<(), TransportError> {
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        if self.failing.iter().any(|id| id == device.id.as_str()) {
            return Err(TransportError::new("device unreachable"));
        }
        self.sent.lock().unwrap().push(SentFrame {
            device: device.id.to_string(),
            at: Instant::now(),
            colors: frame.colors().to_vec(),
        });
        Ok(())
    }
}

/// `left` fills column 0 and `right` column 1 of a 2×2 grid.
pub fn two_panel_transport() -> RecordingTransport {
    RecordingTransport::new()
        .with_device("left", &[(0, 0), (0, 1)])
        .with_device("right", &[(9, 1), (9, 0)])
}
