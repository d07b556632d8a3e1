//! A physical LED device as seen by the board.
//!
//! A [`Device`] couples a [`DeviceInfo`] with the transport used to reach it,
//! caches the login session, and owns the device's frame scheduler while the
//! board is running.

use std::sync::Arc;

use lightgrid_core::{ColorChannelMode, DeviceId, Frame, SourceLayout};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::board::SharedLayout;
use super::frame_scheduler::{SchedulerHandle, SchedulerSettings};
use super::transport::{DeviceInfo, DeviceTransport, Session, TransportError};

pub struct Device {
    info: DeviceInfo,
    transport: Arc<dyn DeviceTransport>,
    session: Mutex<Option<Session>>,
    scheduler: Option<SchedulerHandle>,
}

impl Device {
    pub fn new(info: DeviceInfo, transport: Arc<dyn DeviceTransport>) -> Self {
        Self {
            info,
            transport,
            session: Mutex::new(None),
            scheduler: None,
        }
    }

    pub fn id(&self) -> &DeviceId {
        &self.info.id
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn address(&self) -> &str {
        &self.info.address
    }

    pub fn color_channel_mode(&self) -> ColorChannelMode {
        self.info.color_channel_mode
    }

    /// Opens a new session, replacing any cached one.
    pub async fn login(&self) -> Result<Session, TransportError> {
        let mut cached = self.session.lock().await;
        self.login_locked(&mut cached).await
    }

    /// Returns the cached session, logging in first if there is none.
    ///
    /// Concurrent callers share a single login.
    pub async fn login_if_necessary(&self) -> Result<Session, TransportError> {
        let mut cached = self.session.lock().await;
        match cached.as_ref() {
            Some(session) => Ok(session.clone()),
            None => self.login_locked(&mut cached).await,
        }
    }

    async fn login_locked(&self, cached: &mut Option<Session>) -> Result<Session, TransportError> {
        match self.transport.login(&self.info).await {
            Ok(session) => {
                info!(device = %self.info.id, address = %self.info.address, "logged in");
                *cached = Some(session.clone());
                Ok(session)
            }
            Err(e) => {
                warn!(device = %self.info.id, "login failed: {e}");
                Err(e)
            }
        }
    }

    pub async fn is_logged_in(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Fetches the coordinates this device reports and builds its source
    /// layout (indices assigned, duplicates marked inactive).
    pub async fn source_layout(&self) -> Result<SourceLayout, TransportError> {
        let session = self.login_if_necessary().await?;
        let raw = self.transport.fetch_source_layout(&self.info, &session).await?;
        debug!(
            device = %self.info.id,
            kind = %raw.source,
            coordinates = raw.coordinates.len(),
            "fetched source layout"
        );
        Ok(SourceLayout::from_raw(self.info.id.clone(), raw))
    }

    /// Sends `frame` straight to the transport, bypassing the scheduler.
    pub async fn send_frame(&self, frame: &Frame) -> Result<(), TransportError> {
        self.transport.send_frame(&self.info, frame).await
    }

    // ── Scheduler ─────────────────────────────────────────────────────────────

    pub fn scheduler(&self) -> Option<&SchedulerHandle> {
        self.scheduler.as_ref()
    }

    /// Spawns this device's scheduler unless one is already running.
    pub fn start_scheduler(&mut self, layout: SharedLayout, settings: SchedulerSettings) {
        if self.scheduler.is_some() {
            return;
        }
        self.scheduler = Some(SchedulerHandle::spawn(
            self.info.clone(),
            Arc::clone(&self.transport),
            layout,
            settings,
        ));
    }

    pub fn take_scheduler(&mut self) -> Option<SchedulerHandle> {
        self.scheduler.take()
    }

    /// Tells the scheduler, if any, that this device's frame changed.
    pub fn frame_pending(&self) {
        if let Some(scheduler) = &self.scheduler {
            scheduler.notify();
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("info", &self.info)
            .field("scheduler", &self.scheduler.is_some())
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use lightgrid_core::{LayoutKind, RawCoordinate, RawSourceLayout};

    use super::*;
    use crate::application::transport::MockDeviceTransport;

    fn info() -> DeviceInfo {
        DeviceInfo::new("dev-1", "192.168.1.40")
    }

    #[tokio::test]
    async fn test_login_if_necessary_logs_in_only_once() {
        // Arrange
        let mut mock = MockDeviceTransport::new();
        mock.expect_login()
            .times(1)
            .returning(|_| Ok(Session::new("token-1")));
        let device = Device::new(info(), Arc::new(mock));

        // Act
        let first = device.login_if_necessary().await.unwrap();
        let second = device.login_if_necessary().await.unwrap();

        // Assert
        assert_eq!(first, second);
        assert!(device.is_logged_in().await);
    }

    #[tokio::test]
    async fn test_explicit_login_replaces_session() {
        let mut mock = MockDeviceTransport::new();
        let mut n = 0;
        mock.expect_login().times(2).returning(move |_| {
            n += 1;
            Ok(Session::new(format!("token-{n}")))
        });
        let device = Device::new(info(), Arc::new(mock));

        device.login().await.unwrap();
        device.login().await.unwrap();

        assert_eq!(device.login_if_necessary().await.unwrap().token(), "token-2");
    }

    #[tokio::test]
    async fn test_failed_login_is_not_cached() {
        let mut mock = MockDeviceTransport::new();
        mock.expect_login()
            .times(1)
            .returning(|_| Err(TransportError::new("unauthorized")));
        let device = Device::new(info(), Arc::new(mock));

        let result = device.login_if_necessary().await;

        assert_eq!(result, Err(TransportError::new("unauthorized")));
        assert!(!device.is_logged_in().await);
    }

    #[tokio::test]
    async fn test_source_layout_logs_in_then_fetches_with_session() {
        // Arrange
        let mut mock = MockDeviceTransport::new();
        mock.expect_login()
            .times(1)
            .returning(|_| Ok(Session::new("abc")));
        mock.expect_fetch_source_layout()
            .withf(|device, session| device.id.as_str() == "dev-1" && session.token() == "abc")
            .times(1)
            .returning(|_, _| {
                Ok(RawSourceLayout {
                    source: LayoutKind::TwoD,
                    uuid: "layout-uuid".to_string(),
                    coordinates: vec![RawCoordinate::new(0, 0, 0), RawCoordinate::new(0, 0, 0)],
                })
            });
        let device = Device::new(info(), Arc::new(mock));

        // Act
        let layout = device.source_layout().await.unwrap();

        // Assert
        assert_eq!(layout.device().as_str(), "dev-1");
        assert_eq!(layout.uuid(), "layout-uuid");
        assert_eq!(layout.active_coordinates().count(), 1);
    }

    #[tokio::test]
    async fn test_frame_pending_without_scheduler_is_a_no_op() {
        let device = Device::new(info(), Arc::new(MockDeviceTransport::new()));
        device.frame_pending();
        assert!(device.scheduler().is_none());
    }
}
