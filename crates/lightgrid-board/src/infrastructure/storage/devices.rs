//! Persisted device list: `[{ "id", "address", "colorChannelMode" }, ...]`.

use std::path::Path;

use tracing::debug;

use super::{read_json, write_json, StorageError};
use crate::application::transport::DeviceInfo;

/// Loads the device list; an absent file is an empty list.
///
/// # Errors
///
/// Any read or parse failure.  Callers that prefer to start fresh treat an
/// error the same as "no persisted devices".
pub fn load_devices(path: &Path) -> Result<Vec<DeviceInfo>, StorageError> {
    let devices: Vec<DeviceInfo> = read_json(path)?.unwrap_or_default();
    debug!(count = devices.len(), path = %path.display(), "device list loaded");
    Ok(devices)
}

pub fn save_devices(path: &Path, devices: &[DeviceInfo]) -> Result<(), StorageError> {
    write_json(path, devices)?;
    debug!(count = devices.len(), path = %path.display(), "device list saved");
    Ok(())
}
