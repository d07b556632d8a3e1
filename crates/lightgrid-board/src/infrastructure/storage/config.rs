//! TOML-based configuration for the `lightgrid` binary.
//!
//! Reads and writes [`AppConfig`] at the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Lightgrid\config.toml`
//! - Linux:    `~/.config/lightgrid/config.toml`
//! - macOS:    `~/Library/Application Support/Lightgrid/config.toml`
//!
//! Example:
//!
//! ```toml
//! [board]
//! log_level = "info"
//! discovery_timeout_ms = 5000
//!
//! [scheduler]
//! mode = "queueing"
//! queue_interval_ms = 10000
//! debounce_ms = 20
//!
//! [storage]
//! snapshot_dir = "/var/lib/lightgrid/snapshots"
//!
//! [[target]]
//! width = 16
//! height = 16
//!
//! [[target]]
//! x = 16
//! width = 8
//! height = 4
//! ```
//!
//! `target` may also be written as a single `[target]` table.
//!
//! # Serde default values
//!
//! Every field falls back to a default when absent, so the binary works on
//! first run (before a config file exists) and with config files written by
//! older versions.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lightgrid_core::TargetSpec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::application::frame_scheduler::{SchedulerMode, SchedulerSettings};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// The grid to map onto: one rectangle or several.
    #[serde(default)]
    pub target: TargetSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardConfig {
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub mode: SchedulerMode,
    #[serde(default = "default_queue_interval_ms")]
    pub queue_interval_ms: u64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

/// File locations.  Relative defaults resolve against the config directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_file: Option<PathBuf>,
    /// Directory of `*.json` device snapshots served by the snapshot transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_dir: Option<PathBuf>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_discovery_timeout_ms() -> u64 {
    5_000
}
fn default_queue_interval_ms() -> u64 {
    10_000
}
fn default_debounce_ms() -> u64 {
    20
}
fn default_interval_ms() -> u64 {
    100
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: SchedulerMode::default(),
            queue_interval_ms: default_queue_interval_ms(),
            debounce_ms: default_debounce_ms(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl BoardConfig {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }
}

impl From<&SchedulerConfig> for SchedulerSettings {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            mode: config.mode,
            queue_interval: Duration::from_millis(config.queue_interval_ms),
            debounce: Duration::from_millis(config.debounce_ms),
            interval: Duration::from_millis(config.interval_ms),
        }
    }
}

impl StorageConfig {
    /// Configured device list path, or `devices.json` in `base`.
    pub fn devices_path(&self, base: &Path) -> PathBuf {
        self.devices_file
            .clone()
            .unwrap_or_else(|| base.join("devices.json"))
    }

    /// Configured layout path, or `layout.json` in `base`.
    pub fn layout_path(&self, base: &Path) -> PathBuf {
        self.layout_file
            .clone()
            .unwrap_or_else(|| base.join("layout.json"))
    }

    /// Configured snapshot directory, or `snapshots/` in `base`.
    pub fn snapshot_dir(&self, base: &Path) -> PathBuf {
        self.snapshot_dir
            .clone()
            .unwrap_or_else(|| base.join("snapshots"))
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Loads `AppConfig` from `path`, writing the defaults there first if the
/// file does not exist yet so users have a file to edit.
///
/// # Errors
///
/// As [`load_config_from`] and [`save_config_to`].
pub fn load_or_init_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if path.exists() {
        return load_config_from(path);
    }
    let config = AppConfig::default();
    save_config_to(path, &config)?;
    info!(path = %path.display(), "wrote default config");
    Ok(config)
}

/// Persists `config` to `path`, creating the directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the `lightgrid`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Lightgrid"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("lightgrid"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Lightgrid")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use lightgrid_core::TargetRectangle;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_app_config_default_matches_documented_values() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.board.log_level, "info");
        assert_eq!(cfg.board.discovery_timeout_ms, 5_000);
        assert_eq!(cfg.scheduler.mode, SchedulerMode::Queueing);
        assert_eq!(cfg.scheduler.queue_interval_ms, 10_000);
        assert_eq!(cfg.scheduler.debounce_ms, 20);
        assert_eq!(cfg.scheduler.interval_ms, 100);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_scheduler_config_converts_to_settings() {
        let cfg = SchedulerConfig {
            mode: SchedulerMode::Interval,
            interval_ms: 40,
            ..SchedulerConfig::default()
        };

        let settings = SchedulerSettings::from(&cfg);

        assert_eq!(settings.mode, SchedulerMode::Interval);
        assert_eq!(settings.interval, Duration::from_millis(40));
        assert_eq!(settings.debounce, Duration::from_millis(20));
    }

    #[test]
    fn test_target_accepts_single_table() {
        // Arrange
        let toml_str = r#"
[target]
width = 12
height = 6
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg.target, TargetSpec::Single(TargetRectangle::sized(12, 6)));
    }

    #[test]
    fn test_target_accepts_array_of_tables() {
        let toml_str = r#"
[scheduler]
mode = "interval"

[[target]]
width = 2
height = 2

[[target]]
x = 4
y = 1
width = 1
height = 3
"#;

        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize");

        assert_eq!(cfg.scheduler.mode, SchedulerMode::Interval);
        assert_eq!(cfg.target.into_rectangles().len(), 2);
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let result: Result<AppConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_storage_paths_default_into_base_dir() {
        let storage = StorageConfig {
            layout_file: Some(PathBuf::from("/srv/grid.json")),
            ..StorageConfig::default()
        };
        let base = Path::new("/etc/lightgrid");

        assert_eq!(storage.devices_path(base), base.join("devices.json"));
        assert_eq!(storage.layout_path(base), PathBuf::from("/srv/grid.json"));
        assert_eq!(storage.snapshot_dir(base), base.join("snapshots"));
    }

    #[test]
    fn test_load_config_from_returns_default_when_file_absent() {
        let path = std::env::temp_dir().join(format!("lightgrid_absent_{}.toml", Uuid::new_v4()));
        assert_eq!(load_config_from(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_save_and_load_config_round_trip_via_temp_dir() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("lightgrid_test_{}", Uuid::new_v4()));
        let path = dir.join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.board.log_level = "debug".to_string();
        cfg.scheduler.debounce_ms = 35;
        cfg.target = TargetSpec::Many(vec![
            TargetRectangle::sized(4, 4),
            TargetRectangle {
                x: 4,
                y: 0,
                width: 2,
                height: 2,
            },
        ]);

        // Act
        save_config_to(&path, &cfg).unwrap();
        let loaded = load_config_from(&path).unwrap();

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_or_init_config_writes_defaults_on_first_run() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("lightgrid_init_{}", Uuid::new_v4()));
        let path = dir.join("config.toml");

        // Act
        let first = load_or_init_config(&path).unwrap();

        // Assert
        assert_eq!(first, AppConfig::default());
        assert!(path.exists());
        assert_eq!(load_config_from(&path).unwrap(), AppConfig::default());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_or_init_config_keeps_existing_file() {
        let dir = std::env::temp_dir().join(format!("lightgrid_init_{}", Uuid::new_v4()));
        let path = dir.join("config.toml");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "[board]\nlog_level = \"trace\"\n").unwrap();

        let cfg = load_or_init_config(&path).unwrap();

        assert_eq!(cfg.board.log_level, "trace");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[board]\nlog_level = \"trace\"\n"
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("config.toml"),
                "config file must be named config.toml, got {path:?}"
            );
        }
    }
}
