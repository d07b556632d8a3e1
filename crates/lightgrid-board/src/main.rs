//! `lightgrid` command-line entry point.
//!
//! # Usage
//!
//! ```text
//! lightgrid [--config <PATH>] [--snapshot-dir <DIR>] <COMMAND>
//!
//! Commands:
//!   discover                   Discover devices and save the device list
//!   map [--width W --height H] Map all devices onto the target grid and save it
//!   show                       Summarise the saved layout
//!   run [--color RRGGBB]       Fill the grid and keep frames flowing until Ctrl-C
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                 | Description                          |
//! |--------------------------|--------------------------------------|
//! | `LIGHTGRID_CONFIG`       | Config file path                     |
//! | `LIGHTGRID_SNAPSHOT_DIR` | Directory of device snapshot files   |
//! | `RUST_LOG`               | Log filter, overrides the config     |
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load AppConfig (TOML)
//!  └─ Board::new(SnapshotTransport)
//!       ├─ discover → storage::devices
//!       ├─ map      → storage::layout
//!       └─ run      → one frame scheduler task per device
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use lightgrid_core::{Color, TargetLayout};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lightgrid_board::infrastructure::snapshot::SnapshotTransport;
use lightgrid_board::infrastructure::storage::config::{self, AppConfig};
use lightgrid_board::infrastructure::storage::{devices, layout};
use lightgrid_board::{Board, SchedulerSettings};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Drive several LED devices as one rectangular grid.
#[derive(Debug, Parser)]
#[command(name = "lightgrid", version)]
struct Cli {
    /// Config file; defaults to the platform config directory.  Written with
    /// default values if it does not exist.
    #[arg(long, env = "LIGHTGRID_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of `*.json` device snapshots; overrides `[storage] snapshot_dir`.
    #[arg(long, env = "LIGHTGRID_SNAPSHOT_DIR")]
    snapshot_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Discover devices and save the device list.
    Discover,
    /// Map every known device onto the target grid and save the layout.
    Map {
        /// Grid width; replaces the configured target together with --height.
        #[arg(long, requires = "height")]
        width: Option<u32>,
        #[arg(long, requires = "width")]
        height: Option<u32>,
    },
    /// Print a summary of the saved layout.
    Show,
    /// Fill the grid with one color and keep frames flowing until Ctrl-C.
    Run {
        /// Fill color as RRGGBB hex.
        #[arg(long, default_value = "ffffff")]
        color: String,
    },
}

/// Resolved file locations for one invocation.
struct Paths {
    devices: PathBuf,
    layout: PathBuf,
    snapshots: PathBuf,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<(AppConfig, PathBuf)> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => config::config_file_path().context("no config path given and no platform config dir")?,
        };
        let cfg = config::load_or_init_config(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((cfg, base))
    }

    fn paths(&self, cfg: &AppConfig, base: &Path) -> Paths {
        Paths {
            devices: cfg.storage.devices_path(base),
            layout: cfg.storage.layout_path(base),
            snapshots: self
                .snapshot_dir
                .clone()
                .unwrap_or_else(|| cfg.storage.snapshot_dir(base)),
        }
    }
}

fn target_layout(cfg: &AppConfig, width: Option<u32>, height: Option<u32>) -> anyhow::Result<TargetLayout> {
    let layout = match (width, height) {
        (Some(width), Some(height)) => TargetLayout::grid(width, height),
        _ => TargetLayout::from_spec(cfg.target.clone()),
    };
    layout.context("invalid target layout")
}

/// Builds a board from the saved device list.  A missing or unreadable list
/// means no devices.
fn board_from_saved_devices(paths: &Paths) -> Board {
    let mut board = Board::new(Arc::new(SnapshotTransport::new(&paths.snapshots)));
    let saved = devices::load_devices(&paths.devices).unwrap_or_else(|e| {
        warn!("ignoring saved device list: {e}");
        Vec::new()
    });
    for info in saved {
        board.add_device(info);
    }
    board
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn discover(cfg: &AppConfig, paths: &Paths) -> anyhow::Result<()> {
    let mut board = board_from_saved_devices(paths);
    let found = board
        .discover_devices(cfg.board.discovery_timeout())
        .await
        .context("device discovery failed")?;
    devices::save_devices(&paths.devices, &board.device_records())
        .context("failed to save device list")?;

    println!("discovered {} device(s); {} known", found.len(), board.device_count());
    for device in board.devices() {
        println!("  {}  {}", device.id(), device.address());
    }
    Ok(())
}

async fn map(cfg: &AppConfig, paths: &Paths, width: Option<u32>, height: Option<u32>) -> anyhow::Result<()> {
    let target = target_layout(cfg, width, height)?;
    let board = board_from_saved_devices(paths);
    if board.device_count() == 0 {
        bail!("no known devices; run `lightgrid discover` first");
    }

    board.map_layout(&target).await.context("mapping failed")?;
    layout::save_layout(&paths.layout, &board.layout_document())
        .context("failed to save board layout")?;

    println!(
        "mapped {} LED(s) onto {} grid slot(s)",
        board.active_positions().len(),
        target.slot_count()
    );
    Ok(())
}

fn load_saved_layout(board: &Board, paths: &Paths) -> anyhow::Result<()> {
    let document = layout::load_layout(&paths.layout)
        .context("failed to read board layout")?
        .with_context(|| format!("no layout at {}; run `lightgrid map` first", paths.layout.display()))?;
    board.load_layout(&document).context("saved layout does not match known devices")?;
    Ok(())
}

fn show(paths: &Paths) -> anyhow::Result<()> {
    let board = board_from_saved_devices(paths);
    load_saved_layout(&board, paths)?;

    board.with_layout(|layout| {
        println!("{} LED(s), {} mapped", layout.len(), layout.all_active().len());
        if let Some((min, max)) = layout.bounds() {
            println!("grid bounds: {min} .. {max}");
        }
        for device in board.devices() {
            let leds = layout.frame(device.id()).map_or(0, |f| f.len());
            println!("  {}  {} LED(s)  {:?}", device.id(), leds, device.color_channel_mode());
        }
    });
    Ok(())
}

async fn run(cfg: &AppConfig, paths: &Paths, color: &str) -> anyhow::Result<()> {
    let color = Color::from_hex(color).with_context(|| format!("invalid color {color:?}, expected RRGGBB"))?;
    let mut board = board_from_saved_devices(paths);
    load_saved_layout(&board, paths)?;

    board.start(SchedulerSettings::from(&cfg.scheduler));
    board.fill(color);
    info!("lightgrid running.  Press Ctrl-C to exit.");

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {e}");
    }
    info!("shutdown signal received");

    for (device, stats) in board.stop().await {
        info!(
            device = %device,
            frames_sent = stats.frames_sent,
            failed_sends = stats.failed_sends,
            "device stopped"
        );
    }
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (cfg, base) = cli.load_config()?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.board.log_level)),
        )
        .init();

    let paths = cli.paths(&cfg, &base);
    match cli.command {
        Command::Discover => discover(&cfg, &paths).await,
        Command::Map { width, height } => map(&cfg, &paths, width, height).await,
        Command::Show => show(&paths),
        Command::Run { ref color } => run(&cfg, &paths, color).await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
