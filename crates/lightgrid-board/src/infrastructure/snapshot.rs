//! File-backed device transport.
//!
//! [`SnapshotTransport`] stands in for real hardware.  Each `*.json` file in
//! its directory is one device: the file stem is the device id, the file path
//! its address, and the content the layout the device would report:
//!
//! ```json
//! {
//!   "source": "2d",
//!   "uuid": "4b0c...",
//!   "colorChannelMode": "rgbw",
//!   "coordinates": [{ "x": 0, "y": 0, "z": 0 }, { "x": 0, "y": 1, "z": 0 }]
//! }
//! ```
//!
//! Frames are not pushed anywhere; they are encoded, logged and kept in
//! memory so callers can inspect what would have been sent.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use lightgrid_core::{ColorChannelMode, DeviceId, Frame, RawSourceLayout};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::transport::{DeviceInfo, DeviceTransport, Session, TransportError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    color_channel_mode: ColorChannelMode,
    #[serde(flatten)]
    layout: RawSourceLayout,
}

/// Last encoded frame and send count for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentFrames {
    pub count: usize,
    pub last: Vec<u8>,
}

#[derive(Debug)]
pub struct SnapshotTransport {
    dir: PathBuf,
    sent: Mutex<HashMap<DeviceId, SentFrames>>,
}

impl SnapshotTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sent: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// What has been sent to `device` so far.
    pub fn sent_frames(&self, device: &DeviceId) -> SentFrames {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device)
            .cloned()
            .unwrap_or_default()
    }

    async fn read_snapshot(path: &Path) -> Result<Snapshot, TransportError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TransportError::new(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| TransportError::new(format!("invalid snapshot {}: {e}", path.display())))
    }

    async fn scan(&self) -> Result<Vec<DeviceInfo>, TransportError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            TransportError::new(format!("cannot list {}: {e}", self.dir.display()))
        })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut devices = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let snapshot = Self::read_snapshot(&path).await?;
            devices.push(
                DeviceInfo::new(stem, path.display().to_string())
                    .with_color_channel_mode(snapshot.color_channel_mode),
            );
        }
        Ok(devices)
    }
}

#[async_trait]
impl DeviceTransport for SnapshotTransport {
    async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceInfo>, TransportError> {
        let devices = tokio::time::timeout(timeout, self.scan())
            .await
            .map_err(|_| TransportError::new(format!("discovery timed out after {timeout:?}")))??;
        info!(count = devices.len(), dir = %self.dir.display(), "snapshot devices discovered");
        Ok(devices)
    }

    async fn login(&self, device: &DeviceInfo) -> Result<Session, TransportError> {
        debug!(device = %device.id, "snapshot login");
        Ok(Session::new(Uuid::new_v4().to_string()))
    }

    async fn fetch_source_layout(
        &self,
        device: &DeviceInfo,
        _session: &Session,
    ) -> Result<RawSourceLayout, TransportError> {
        let snapshot = Self::read_snapshot(Path::new(&device.address)).await?;
        Ok(snapshot.layout)
    }

    async fn send_frame(&self, device: &DeviceInfo, frame: &Frame) -> Result<(), TransportError> {
        let bytes = frame.encode(device.color_channel_mode);
        debug!(
            device = %device.id,
            leds = frame.len(),
            bytes = bytes.len(),
            "frame recorded"
        );
        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = sent.entry(device.id.clone()).or_default();
        entry.count += 1;
        entry.last = bytes;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use lightgrid_core::{Color, LayoutKind};

    use super::*;

    fn snapshot_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lightgrid_snapshots_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("panel-b.json"),
            r#"{"source": "2d", "uuid": "b", "coordinates": [{"x": 1, "y": 0}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("panel-a.json"),
            r#"{"source": "2d", "uuid": "a", "colorChannelMode": "rgbw",
                "coordinates": [{"x": 0, "y": 0, "z": 0}, {"x": 0, "y": 1, "z": 0}]}"#,
        )
        .unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_discover_lists_json_snapshots_sorted() {
        // Arrange
        let dir = snapshot_dir();
        let transport = SnapshotTransport::new(&dir);

        // Act
        let devices = transport.discover(Duration::from_secs(5)).await.unwrap();

        // Assert
        let ids: Vec<&str> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["panel-a", "panel-b"]);
        assert_eq!(devices[0].color_channel_mode, ColorChannelMode::Rgbw);
        assert_eq!(devices[1].color_channel_mode, ColorChannelMode::Rgb);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_fetch_source_layout_reads_device_file() {
        let dir = snapshot_dir();
        let transport = SnapshotTransport::new(&dir);
        let devices = transport.discover(Duration::from_secs(5)).await.unwrap();
        let session = transport.login(&devices[0]).await.unwrap();

        let layout = transport
            .fetch_source_layout(&devices[0], &session)
            .await
            .unwrap();

        assert_eq!(layout.source, LayoutKind::TwoD);
        assert_eq!(layout.uuid, "a");
        assert_eq!(layout.coordinates.len(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_discover_on_missing_dir_fails() {
        let transport = SnapshotTransport::new("/nonexistent/lightgrid/snapshots");
        assert!(transport.discover(Duration::from_secs(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_send_frame_records_encoded_bytes() {
        // Arrange
        let transport = SnapshotTransport::new("/unused");
        let device = DeviceInfo::new("d", "x").with_color_channel_mode(ColorChannelMode::Rgbw);
        let frame = Frame::new(vec![Color::rgb(1, 2, 3)]);

        // Act
        transport.send_frame(&device, &frame).await.unwrap();
        transport.send_frame(&device, &frame).await.unwrap();

        // Assert
        let sent = transport.sent_frames(&device.id);
        assert_eq!(sent.count, 2);
        assert_eq!(sent.last, vec![0, 1, 2, 3]);
    }
}
