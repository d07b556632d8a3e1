//! Per-device frame scheduling.
//!
//! Every running device owns one scheduler task.  Color writes never talk to
//! the transport directly; they only signal "a frame is pending" and the
//! scheduler decides when the device's current frame is pushed.
//!
//! The decision logic is the pure [`FrameScheduler`] state machine, which
//! takes the current [`Instant`] as an argument and never sleeps.  The tokio
//! driver behind [`SchedulerHandle`] feeds it messages and timer expiries and
//! performs the sends.  Because all time comes from `tokio::time`, tests drive
//! the whole thing with the paused virtual clock.
//!
//! # Modes
//!
//! **Queueing** (default): a signal in `Idle` opens a fixed debounce window;
//! when it closes the frame is sent.  Signals that arrive while a send is in
//! flight set a pending flag and cause exactly one follow-up send right after
//! it.  After a send with nothing pending the scheduler is `Idle` again with a
//! refresh timer of `queue_interval`: if nothing changes before it fires, the
//! current frame is re-sent.  The timer never delays a change.
//!
//! **Interval**: signals are ignored and the frame is re-sent on a fixed
//! period, starting immediately.  Ticks are anchored to the schedule, not to
//! the end of the previous send.
//!
//! In both modes there is at most one send in flight per device.

use std::sync::{Arc, PoisonError};
use std::time::Duration;

use lightgrid_core::{DeviceId, Frame};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use super::board::SharedLayout;
use super::transport::{DeviceInfo, DeviceTransport, TransportError};

/// Bounded so a stalled device cannot grow memory; dropped signals coalesce.
const CHANNEL_CAPACITY: usize = 64;

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerMode {
    #[default]
    Queueing,
    Interval,
}

/// Runtime scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub mode: SchedulerMode,
    /// Refresh period of an unchanged frame in queueing mode.
    pub queue_interval: Duration,
    /// Coalescing window in queueing mode.
    pub debounce: Duration,
    /// Fixed period in interval mode.
    pub interval: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            mode: SchedulerMode::Queueing,
            queue_interval: Duration::from_millis(10_000),
            debounce: Duration::from_millis(20),
            interval: Duration::from_millis(100),
        }
    }
}

impl SchedulerSettings {
    pub fn interval(period: Duration) -> Self {
        Self {
            mode: SchedulerMode::Interval,
            interval: period,
            ..Self::default()
        }
    }
}

// ── State machine ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing in flight; the frame is re-sent at `refresh_at`, if set.
    Idle { refresh_at: Option<Instant> },
    /// A signal arrived; the send starts at `deadline`.
    Debouncing { deadline: Instant },
    /// A frame is in flight.
    Sending { pending: bool },
}

/// Pure send-timing logic for one device.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    settings: SchedulerSettings,
    state: SchedulerState,
    /// Scheduled instant of the latest interval tick.
    tick: Instant,
}

impl FrameScheduler {
    pub fn new(settings: SchedulerSettings, now: Instant) -> Self {
        let refresh_at = match settings.mode {
            SchedulerMode::Queueing => None,
            SchedulerMode::Interval => Some(now),
        };
        Self {
            settings,
            state: SchedulerState::Idle { refresh_at },
            tick: now,
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Records that the device's frame changed.
    pub fn frame_pending(&mut self, now: Instant) {
        if self.settings.mode == SchedulerMode::Interval {
            return;
        }
        self.state = match self.state {
            SchedulerState::Idle { .. } => SchedulerState::Debouncing {
                deadline: now + self.settings.debounce,
            },
            SchedulerState::Sending { .. } => SchedulerState::Sending { pending: true },
            debouncing @ SchedulerState::Debouncing { .. } => debouncing,
        };
    }

    /// Asks for a send as soon as possible, bypassing debounce and the
    /// refresh timer.
    ///
    /// Returns `true` if the send should start now; while a send is in flight
    /// the request is queued as a follow-up instead.
    pub fn request_send(&mut self) -> bool {
        match self.state {
            SchedulerState::Sending { .. } => {
                self.state = SchedulerState::Sending { pending: true };
                false
            }
            _ => {
                self.state = SchedulerState::Sending { pending: false };
                true
            }
        }
    }

    /// The next instant at which [`Self::deadline_elapsed`] may act.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Debouncing { deadline } => Some(deadline),
            SchedulerState::Idle { refresh_at } => refresh_at,
            SchedulerState::Sending { .. } => None,
        }
    }

    /// Handles a timer expiry; returns `true` if a send should start.
    pub fn deadline_elapsed(&mut self, now: Instant) -> bool {
        match self.state {
            SchedulerState::Debouncing { deadline } if now >= deadline => {
                self.state = SchedulerState::Sending { pending: false };
                true
            }
            SchedulerState::Idle {
                refresh_at: Some(at),
            } if now >= at => {
                self.tick = at;
                self.state = SchedulerState::Sending { pending: false };
                true
            }
            _ => false,
        }
    }

    /// Handles the end of a send, successful or not; returns `true` if a
    /// follow-up send should start immediately.
    pub fn send_complete(&mut self, now: Instant) -> bool {
        match self.state {
            SchedulerState::Sending { pending: true } => {
                self.state = SchedulerState::Sending { pending: false };
                true
            }
            SchedulerState::Sending { pending: false } => {
                let refresh_at = match self.settings.mode {
                    SchedulerMode::Queueing => now + self.settings.queue_interval,
                    SchedulerMode::Interval => self.next_tick(now),
                };
                self.state = SchedulerState::Idle {
                    refresh_at: Some(refresh_at),
                };
                false
            }
            _ => false,
        }
    }

    /// First tick on the schedule that is not already behind `now`; ticks
    /// missed by a slow send are skipped rather than sent in a burst.
    fn next_tick(&self, now: Instant) -> Instant {
        let period = self.settings.interval;
        let mut next = self.tick + period;
        if period.is_zero() {
            return next.max(now);
        }
        while next < now {
            next += period;
        }
        next
    }
}

// ── Driver ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SchedulerMessage {
    FramePending,
    /// Send the current frame and report that send's result.
    Flush(oneshot::Sender<Result<(), TransportError>>),
    Stop,
}

/// Counters returned when a scheduler stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub frames_sent: u64,
    pub failed_sends: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlushError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("frame scheduler is not running")]
    Stopped,
}

/// Owner's side of a running scheduler task.
#[derive(Debug)]
pub struct SchedulerHandle {
    device: DeviceId,
    tx: mpsc::Sender<SchedulerMessage>,
    join: JoinHandle<SchedulerStats>,
}

impl SchedulerHandle {
    /// Spawns the scheduler task for `device` on the current tokio runtime.
    pub fn spawn(
        device: DeviceInfo,
        transport: Arc<dyn DeviceTransport>,
        layout: SharedLayout,
        settings: SchedulerSettings,
    ) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let id = device.id.clone();
        let driver = Driver {
            machine: FrameScheduler::new(settings, Instant::now()),
            device,
            transport,
            layout,
            rx,
            stats: SchedulerStats::default(),
        };
        let join = tokio::spawn(driver.run());
        Self {
            device: id,
            tx,
            join,
        }
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Signals a frame change.  Never blocks; a full channel already holds
    /// enough signals to trigger a send.
    pub fn notify(&self) {
        match self.tx.try_send(SchedulerMessage::FramePending) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Closed(_)) => {
                debug!(device = %self.device, "frame signal dropped: scheduler stopped");
            }
        }
    }

    /// Sends the current frame through the scheduler and waits for the result.
    ///
    /// If a send is already in flight the frame goes out right after it.
    pub async fn flush(&self) -> Result<(), FlushError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(SchedulerMessage::Flush(tx))
            .await
            .map_err(|_| FlushError::Stopped)?;
        rx.await.map_err(|_| FlushError::Stopped)??;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Stops the task after any in-flight send and returns its counters.
    pub async fn stop(self) -> SchedulerStats {
        // A closed channel means the task is already gone; join still reports.
        let _ = self.tx.send(SchedulerMessage::Stop).await;
        match self.join.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(device = %self.device, "frame scheduler task failed: {e}");
                SchedulerStats::default()
            }
        }
    }
}

enum Wake {
    Message(Option<SchedulerMessage>),
    Deadline,
}

enum Step {
    Wait,
    Send,
    Stop,
}

type Waiter = oneshot::Sender<Result<(), TransportError>>;

struct Driver {
    machine: FrameScheduler,
    device: DeviceInfo,
    transport: Arc<dyn DeviceTransport>,
    layout: SharedLayout,
    rx: mpsc::Receiver<SchedulerMessage>,
    stats: SchedulerStats,
}

impl Driver {
    async fn run(mut self) -> SchedulerStats {
        info!(
            device = %self.device.id,
            mode = ?self.machine.settings().mode,
            "frame scheduler started"
        );
        let mut waiters: Vec<Waiter> = Vec::new();

        'run: loop {
            let wake = match self.machine.deadline() {
                Some(deadline) => tokio::select! {
                    message = self.rx.recv() => Wake::Message(message),
                    () = sleep_until(deadline) => Wake::Deadline,
                },
                None => Wake::Message(self.rx.recv().await),
            };

            let step = match wake {
                Wake::Message(message) => self.on_message(message, &mut waiters),
                Wake::Deadline if self.machine.deadline_elapsed(Instant::now()) => Step::Send,
                Wake::Deadline => Step::Wait,
            };
            match step {
                Step::Wait => continue,
                Step::Stop => break,
                Step::Send => {}
            }

            loop {
                let in_flight = std::mem::take(&mut waiters);
                let result = self.send_current_frame().await;
                for waiter in in_flight {
                    // The flushing caller may have given up.
                    let _ = waiter.send(result.clone());
                }

                while let Ok(message) = self.rx.try_recv() {
                    if let Step::Stop = self.on_message(Some(message), &mut waiters) {
                        break 'run;
                    }
                }

                if !self.machine.send_complete(Instant::now()) {
                    break;
                }
            }
        }

        info!(
            device = %self.device.id,
            frames_sent = self.stats.frames_sent,
            failed_sends = self.stats.failed_sends,
            "frame scheduler stopped"
        );
        self.stats
    }

    fn on_message(&mut self, message: Option<SchedulerMessage>, waiters: &mut Vec<Waiter>) -> Step {
        match message {
            Some(SchedulerMessage::FramePending) => {
                self.machine.frame_pending(Instant::now());
                Step::Wait
            }
            Some(SchedulerMessage::Flush(waiter)) => {
                waiters.push(waiter);
                if self.machine.request_send() {
                    Step::Send
                } else {
                    Step::Wait
                }
            }
            Some(SchedulerMessage::Stop) | None => Step::Stop,
        }
    }

    fn current_frame(&self) -> Option<Frame> {
        self.layout
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .frame(&self.device.id)
    }

    async fn send_current_frame(&mut self) -> Result<(), TransportError> {
        let Some(frame) = self.current_frame() else {
            debug!(device = %self.device.id, "no LEDs in layout; nothing to send");
            return Ok(());
        };

        match self.transport.send_frame(&self.device, &frame).await {
            Ok(()) => {
                self.stats.frames_sent += 1;
                debug!(device = %self.device.id, leds = frame.len(), "frame sent");
                Ok(())
            }
            Err(e) => {
                self.stats.failed_sends += 1;
                warn!(device = %self.device.id, "frame send failed: {e}");
                Err(e)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
