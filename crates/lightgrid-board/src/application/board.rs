//! The board: every device plus the layout that ties them into one grid.
//!
//! [`Board`] is the composition root of the application layer.  It owns the
//! devices (in insertion order), the shared [`BoardLayout`], and the device
//! transport.  Drawing operations write colors synchronously and then signal
//! the affected device's scheduler; the schedulers read the layout on their
//! own tasks.
//!
//! # Layout sharing (for beginners)
//!
//! The layout sits behind an `Arc<RwLock<_>>` ([`SharedLayout`]).  Many
//! schedulers may read it at once, drawing takes the write lock briefly, and
//! a remap builds the new layout completely before swapping it in under the
//! write lock, so readers never see a half-built index.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures_util::future::join_all;
use indexmap::IndexMap;
use lightgrid_core::{
    BoardLayout, BoardLayoutDocument, Color, DeviceId, LayoutError, LayoutMapper, Position,
    TargetLayout,
};
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use super::device::Device;
use super::frame_scheduler::{FlushError, SchedulerSettings, SchedulerStats};
use super::transport::{DeviceInfo, DeviceTransport, TransportError};

/// The board layout as shared between the board and the schedulers.
pub type SharedLayout = Arc<RwLock<BoardLayout>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("transport error on device {device}: {source}")]
    Transport {
        device: DeviceId,
        #[source]
        source: TransportError,
    },

    #[error("device discovery failed: {0}")]
    Discovery(#[source] TransportError),

    #[error("frame scheduler for device {0} has stopped")]
    SchedulerStopped(DeviceId),
}

pub struct Board {
    transport: Arc<dyn DeviceTransport>,
    devices: IndexMap<DeviceId, Device>,
    layout: SharedLayout,
}

impl Board {
    pub fn new(transport: Arc<dyn DeviceTransport>) -> Self {
        Self {
            transport,
            devices: IndexMap::new(),
            layout: Arc::new(RwLock::new(BoardLayout::new())),
        }
    }

    // ── Devices ───────────────────────────────────────────────────────────────

    /// Adds a device.  A device whose id is already known keeps its existing
    /// entry, session and scheduler.
    pub fn add_device(&mut self, info: DeviceInfo) -> &Device {
        let transport = Arc::clone(&self.transport);
        self.devices.entry(info.id.clone()).or_insert_with(|| {
            info!(device = %info.id, address = %info.address, "device added");
            Device::new(info, transport)
        })
    }

    pub fn device(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// The persisted form of the device list.
    pub fn device_records(&self) -> Vec<DeviceInfo> {
        self.devices.values().map(|d| d.info().clone()).collect()
    }

    /// Discovers devices and adds every one of them; returns the ids found.
    pub async fn discover_devices(&mut self, timeout: Duration) -> Result<Vec<DeviceId>, BoardError> {
        let found = self
            .transport
            .discover(timeout)
            .await
            .map_err(BoardError::Discovery)?;
        info!(count = found.len(), "discovery finished");

        Ok(found
            .into_iter()
            .map(|info| self.add_device(info).id().clone())
            .collect())
    }

    // ── Layout ────────────────────────────────────────────────────────────────

    /// Clone of the shared layout pointer, for readers outside the board.
    pub fn shared_layout(&self) -> SharedLayout {
        Arc::clone(&self.layout)
    }

    fn read_layout(&self) -> RwLockReadGuard<'_, BoardLayout> {
        self.layout.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_layout(&self) -> RwLockWriteGuard<'_, BoardLayout> {
        self.layout.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the current layout under the read lock.
    pub fn with_layout<R>(&self, f: impl FnOnce(&BoardLayout) -> R) -> R {
        f(&self.read_layout())
    }

    /// Fetches every device's source layout, maps them onto `target`, and
    /// swaps the result in.  On any error the previous layout stays.
    pub async fn map_layout(&self, target: &TargetLayout) -> Result<(), BoardError> {
        let overlaps = target.overlapping_cells();
        if !overlaps.is_empty() {
            warn!(
                cells = overlaps.len(),
                first = %overlaps[0],
                "target rectangles overlap; overlapped cells may receive two LEDs"
            );
        }

        let fetched = join_all(self.devices.values().map(|device| async move {
            device
                .source_layout()
                .await
                .map_err(|source| BoardError::Transport {
                    device: device.id().clone(),
                    source,
                })
        }))
        .await;
        let sources = fetched.into_iter().collect::<Result<Vec<_>, _>>()?;

        let mapped = LayoutMapper::map_layouts(sources, target)?;
        info!(leds = mapped.len(), active = mapped.all_active().len(), "board layout mapped");
        self.replace_layout(mapped);
        Ok(())
    }

    /// Replaces the layout with a persisted one.
    ///
    /// # Errors
    ///
    /// [`LayoutError::UnknownDevice`] if the document names a device the
    /// board does not hold; the current layout is kept.
    pub fn load_layout(&self, document: &BoardLayoutDocument) -> Result<(), BoardError> {
        let loaded = BoardLayout::from_document(document, |id| self.devices.contains_key(id))?;
        info!(leds = loaded.len(), "board layout loaded");
        self.replace_layout(loaded);
        Ok(())
    }

    pub fn layout_document(&self) -> BoardLayoutDocument {
        self.read_layout().to_document()
    }

    fn replace_layout(&self, layout: BoardLayout) {
        *self.write_layout() = layout;
        self.all_frames_pending();
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    /// Colors the LED at `position` and schedules its device's frame.
    pub fn set_color(&self, position: Position, color: Color) -> Result<(), BoardError> {
        let device = self.write_layout().set_color(position, color)?.clone();
        self.frame_pending(&device);
        Ok(())
    }

    pub fn set_color_at(&self, device: &DeviceId, index: usize, color: Color) -> Result<(), BoardError> {
        self.write_layout().set_color_at(device, index, color)?;
        self.frame_pending(device);
        Ok(())
    }

    pub fn color_at(&self, position: Position) -> Result<Color, BoardError> {
        Ok(self.read_layout().color_at(position)?)
    }

    /// Colors every LED, mapped or not.
    pub fn fill(&self, color: Color) {
        self.write_layout().fill(color);
        self.all_frames_pending();
    }

    pub fn clear(&self) {
        self.fill(Color::BLACK);
    }

    pub fn random_active_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Position, BoardError> {
        let layout = self.read_layout();
        let led = layout.random_active(rng)?;
        Ok(led.position.ok_or(LayoutError::EmptyLayout)?)
    }

    pub fn active_positions(&self) -> Vec<Position> {
        self.read_layout()
            .all_active()
            .into_iter()
            .filter_map(|led| led.position)
            .collect()
    }

    fn frame_pending(&self, device: &DeviceId) {
        if let Some(device) = self.devices.get(device) {
            device.frame_pending();
        }
    }

    fn all_frames_pending(&self) {
        for device in self.devices.values() {
            device.frame_pending();
        }
    }

    // ── Sending ───────────────────────────────────────────────────────────────

    /// Spawns a frame scheduler for every device.  Must be called inside a
    /// tokio runtime.
    pub fn start(&mut self, settings: SchedulerSettings) {
        for device in self.devices.values_mut() {
            device.start_scheduler(Arc::clone(&self.layout), settings.clone());
        }
        info!(devices = self.devices.len(), mode = ?settings.mode, "board started");
    }

    pub fn is_running(&self) -> bool {
        self.devices.values().any(|d| d.scheduler().is_some())
    }

    /// Stops every scheduler after its in-flight send and returns the
    /// per-device counters.
    pub async fn stop(&mut self) -> IndexMap<DeviceId, SchedulerStats> {
        let handles: Vec<_> = self
            .devices
            .values_mut()
            .filter_map(|d| d.take_scheduler())
            .collect();

        let stats = join_all(handles.into_iter().map(|handle| async move {
            let device = handle.device().clone();
            (device, handle.stop().await)
        }))
        .await;

        info!(devices = stats.len(), "board stopped");
        stats.into_iter().collect()
    }

    /// Pushes the current frame to every device and waits for all of them.
    ///
    /// Running schedulers carry the send so a device never has two frames in
    /// flight; otherwise frames go straight to the transport.  One device
    /// failing does not prevent the others from being sent.
    pub async fn send_frames(&self) -> Vec<(DeviceId, Result<(), BoardError>)> {
        join_all(self.devices.values().map(|device| async move {
            let id = device.id().clone();
            let result = self.send_frame_to(device).await;
            if let Err(e) = &result {
                warn!(device = %id, "send failed: {e}");
            }
            (id, result)
        }))
        .await
    }

    async fn send_frame_to(&self, device: &Device) -> Result<(), BoardError> {
        if let Some(scheduler) = device.scheduler() {
            return scheduler.flush().await.map_err(|e| match e {
                FlushError::Transport(source) => BoardError::Transport {
                    device: device.id().clone(),
                    source,
                },
                FlushError::Stopped => BoardError::SchedulerStopped(device.id().clone()),
            });
        }

        let frame = self.read_layout().frame(device.id());
        match frame {
            Some(frame) => device
                .send_frame(&frame)
                .await
                .map_err(|source| BoardError::Transport {
                    device: device.id().clone(),
                    source,
                }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("devices", &self.devices)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
