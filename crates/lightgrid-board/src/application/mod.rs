//! Application layer: devices, frame scheduling and the board.
//!
//! Code in here orchestrates the `lightgrid_core` domain types and reaches
//! the outside world only through the [`transport::DeviceTransport`] trait,
//! so every use case can be exercised with an in-memory transport.
//!
//! # Sub-modules
//!
//! - **`transport`**       – The hardware seam: discovery, login, layout
//!   fetch and frame push.
//! - **`device`**          – One device: identity, cached session, and its
//!   scheduler while running.
//! - **`frame_scheduler`** – Decides when a device's frame is pushed
//!   (debounced queueing or fixed interval).
//! - **`board`**           – Owns all devices and the shared layout; mapping,
//!   persistence round trips and drawing.

pub mod board;
pub mod device;
pub mod frame_scheduler;
pub mod transport;
