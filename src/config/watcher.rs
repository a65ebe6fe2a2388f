//! Polling-based config file watcher.
//!
//! Checks the config file's mtime every 2 seconds. When a change is
//! detected, debounces for 500ms (editors often write in stages), then
//! calls [`config::reload`](super::reload) and reports the outcome on
//! an mpsc channel. A failed reload keeps the previous config active.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;

/// Events emitted by the config watcher.
#[derive(Debug)]
pub enum ConfigEvent {
    /// Config file was successfully reloaded.
    Reloaded,
    /// Reload was attempted but failed (old config remains active).
    Error(String),
}

/// Interval between mtime checks.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Debounce delay after detecting a change.
const DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Run the config file watcher loop.
///
/// Polls `path` for mtime changes and hot-reloads the global config
/// when the file settles. Returns when the channel closes or the task
/// is cancelled.
pub async fn run_config_watcher(path: PathBuf, tx: mpsc::Sender<ConfigEvent>) {
    tracing::info!(path = %path.display(), "Config watcher started");

    let mut last_mtime = mtime_of(&path);

    loop {
        tokio::time::sleep(POLL_INTERVAL).await;

        let current = match mtime_of(&path) {
            Some(t) => t,
            None => {
                if last_mtime.is_some() {
                    tracing::warn!(
                        path = %path.display(),
                        "Config file not accessible — keeping current config, will retry"
                    );
                    last_mtime = None;
                }
                continue;
            }
        };

        let changed = match last_mtime {
            Some(prev) => current != prev,
            None => true, // file reappeared
        };
        if !changed {
            continue;
        }

        // Debounce: wait, then re-check mtime to ensure the write is done.
        tokio::time::sleep(DEBOUNCE_DELAY).await;
        if mtime_of(&path) != Some(current) {
            // Still being written — pick it up on the next poll cycle.
            continue;
        }
        last_mtime = Some(current);

        let event = match super::reload(&path) {
            Ok(()) => ConfigEvent::Reloaded,
            Err(e) => {
                tracing::error!(error = %e, "Config hot-reload failed — keeping previous config");
                ConfigEvent::Error(e.to_string())
            }
        };

        if tx.send(event).await.is_err() {
            tracing::debug!("Config watcher channel closed, stopping");
            return;
        }
    }
}

fn mtime_of(path: &std::path::Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
