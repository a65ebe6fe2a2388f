//! Droplet Monitor - water-flow monitoring service
//!
//! Polls or streams readings from a Droplet flow sensor, derives
//! period-based consumption statistics, detects leaks, and persists
//! running baselines across restarts.
//!
//! # Usage
//!
//! ```bash
//! # Run with the built-in simulated device
//! cargo run --release
//!
//! # Run with generated readings on stdin (push mode)
//! ./simulation --hours 2 --speed 100 | ./droplet-monitor --stdin
//!
//! # Compressed-time simulation with a slow leak
//! ./droplet-monitor --speed 120 --seep 0.4
//! ```
//!
//! # Environment Variables
//!
//! - `DROPLET_CONFIG`: Path to a TOML config file
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use droplet_monitor::config::defaults::SCAN_INTERVAL_SECS;
use droplet_monitor::config::{self, watcher, MonitorConfig};
use droplet_monitor::{
    DropletDriver, LogSink, ProcessingLoop, SimulatedSource, SledStore, SnapshotStore,
    StdinSource, WaterMonitor,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "droplet-monitor")]
#[command(about = "Droplet water-flow monitoring service")]
#[command(version)]
struct CliArgs {
    /// Read device readings from stdin (JSON format, one per line)
    /// Use with the generator: ./simulation | ./droplet-monitor --stdin
    #[arg(long)]
    stdin: bool,

    /// Speed multiplier for the built-in simulated source
    /// (1 = realtime, 120 = 120x faster)
    #[arg(long, default_value = "1")]
    speed: u64,

    /// Constant background seep for the built-in source (L/min);
    /// nonzero values model a slow leak
    #[arg(long, default_value = "0.0")]
    seep: f64,

    /// Override the state database directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Path to a TOML config file (wins over the search order)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    // ------------------------------------------------------------------
    // Configuration (+ hot-reload watcher when file-backed)
    // ------------------------------------------------------------------
    let (monitor_config, config_path) = MonitorConfig::load_with_source(args.config.as_deref());
    config::init(monitor_config);
    let cfg = config::get();

    if let Some(path) = config_path {
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        tokio::spawn(watcher::run_config_watcher(path, tx));
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    watcher::ConfigEvent::Reloaded => info!("Config hot-reloaded"),
                    watcher::ConfigEvent::Error(e) => warn!(error = %e, "Config reload rejected"),
                }
            }
        });
    }

    // ------------------------------------------------------------------
    // Persistence + state restore (fail soft on missing/corrupt data)
    // ------------------------------------------------------------------
    let data_dir = args
        .data_dir
        .unwrap_or_else(|| cfg.persistence.data_dir.clone());
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    let store = Arc::new(
        SledStore::open(data_dir.join("droplet_state.db"), &cfg.device.id)
            .context("opening state database")?,
    );

    let now = chrono::Utc::now();
    let monitor = match store.load().await {
        Ok(Some(snapshot)) => {
            info!(saved_at = %snapshot.saved_at, "Restored persisted state");
            WaterMonitor::from_snapshot(&snapshot)
        }
        Ok(None) => {
            info!("No persisted state found — starting from zero");
            WaterMonitor::new(now)
        }
        Err(e) => {
            warn!(error = %e, "Failed to load persisted state — starting from zero");
            WaterMonitor::new(now)
        }
    };

    // ------------------------------------------------------------------
    // Processing loop
    // ------------------------------------------------------------------
    let cancel = CancellationToken::new();
    let (processing_loop, mut snapshot_rx) = ProcessingLoop::new(
        monitor,
        DropletDriver::new(),
        store,
        Arc::new(LogSink),
        cancel.clone(),
    );

    // Compact trace of each published snapshot.
    tokio::spawn(async move {
        while snapshot_rx.changed().await.is_ok() {
            let snap = snapshot_rx.borrow_and_update().clone();
            tracing::debug!(
                flow_lpm = snap.flow_rate,
                daily_l = snap.daily_volume,
                lifetime_l = snap.lifetime_volume,
                leak = snap.water_leak_detected,
                "Snapshot published"
            );
        }
    });

    let use_stdin = args.stdin;
    let speed = args.speed;
    let seep = args.seep;
    let mut loop_handle = tokio::spawn(async move {
        if use_stdin {
            let mut source = StdinSource::new();
            processing_loop.run(&mut source).await
        } else {
            let mut source =
                SimulatedSource::new(SCAN_INTERVAL_SECS, speed, None).with_seep(seep);
            processing_loop.run(&mut source).await
        }
    });

    // ------------------------------------------------------------------
    // Shutdown: Ctrl-C cancels the loop, which performs one final
    // best-effort state save before returning.
    // ------------------------------------------------------------------
    let stats = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received — shutting down");
            cancel.cancel();
            (&mut loop_handle).await.context("processing task failed")?
        }
        res = &mut loop_handle => res.context("processing task failed")?,
    };

    info!(%stats, "Shutdown complete");
    Ok(())
}
