//! Persisted board layout.
//!
//! The document is keyed by device id, each entry listing the device's LEDs
//! in physical order:
//!
//! ```json
//! { "dev-a": [{ "x": 0, "y": 0 }, { "active": false }, null, { "x": 0, "y": 1 }] }
//! ```
//!
//! Colors are not persisted.

use std::path::Path;

use lightgrid_core::BoardLayoutDocument;
use tracing::debug;

use super::{read_json, write_json, StorageError};

/// Loads the layout document, or `None` if nothing has been mapped yet.
pub fn load_layout(path: &Path) -> Result<Option<BoardLayoutDocument>, StorageError> {
    let document = read_json(path)?;
    debug!(found = document.is_some(), path = %path.display(), "board layout read");
    Ok(document)
}

pub fn save_layout(path: &Path, document: &BoardLayoutDocument) -> Result<(), StorageError> {
    write_json(path, document)?;
    debug!(devices = document.len(), path = %path.display(), "board layout saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use lightgrid_core::{DeviceId, PersistedLed};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_layout_file_round_trip_keeps_device_order() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("lightgrid_test_{}", Uuid::new_v4()));
        let path = dir.join("layout.json");
        let mut document = BoardLayoutDocument::new();
        document.insert(
            DeviceId::new("zeta"),
            vec![
                Some(PersistedLed {
                    active: true,
                    x: Some(0),
                    y: Some(0),
                }),
                None,
            ],
        );
        document.insert(DeviceId::new("alpha"), vec![Some(PersistedLed::default())]);

        // Act
        save_layout(&path, &document).unwrap();
        let loaded = load_layout(&path).unwrap().unwrap();

        // Assert
        let keys: Vec<&str> = loaded.keys().map(DeviceId::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(loaded, document);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_layout_file_is_none() {
        let path = std::env::temp_dir().join(format!("lightgrid_missing_{}.json", Uuid::new_v4()));
        assert!(load_layout(&path).unwrap().is_none());
    }
}
