//! Monitor configuration module.
//!
//! Provides tunable settings loaded from TOML, replacing hardcoded
//! tariffs, thresholds, and retention horizons with operator-editable
//! values.
//!
//! ## Loading Order
//!
//! 1. `DROPLET_CONFIG` environment variable (path to TOML file)
//! 2. `droplet_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Live values
//!
//! The global config lives behind an [`ArcSwap`], so a hot reload from
//! the file watcher is a single atomic pointer swap. Callers must not
//! cache the returned `Arc` across ticks: re-calling [`get`] each
//! evaluation is what makes tariff and threshold edits take effect
//! immediately.
//!
//! ```ignore
//! // In main():
//! config::init(MonitorConfig::load());
//!
//! // Anywhere in the codebase, once per evaluation:
//! let threshold = config::get().leak.threshold_lpm;
//! ```

pub mod defaults;
mod settings;
pub mod watcher;

pub use settings::{
    BillingConfig, ConfigError, DeviceInfo, LeakConfig, MonitorConfig, PersistenceConfig,
    RetentionConfig,
};

use std::path::Path;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

/// Global monitor configuration, swapped atomically on reload.
static MONITOR_CONFIG: OnceLock<ArcSwap<MonitorConfig>> = OnceLock::new();

/// Install the global configuration.
///
/// Safe to call more than once; later calls replace the active config
/// (tests and hot reload both go through the same swap).
pub fn init(config: MonitorConfig) {
    match MONITOR_CONFIG.get() {
        Some(cell) => cell.store(Arc::new(config)),
        None => {
            let _ = MONITOR_CONFIG.set(ArcSwap::from_pointee(config));
        }
    }
}

/// Current configuration snapshot.
///
/// Returns the active config, or built-in defaults when [`init`] has
/// not run (unit tests and library embedding).
pub fn get() -> Arc<MonitorConfig> {
    MONITOR_CONFIG
        .get_or_init(|| ArcSwap::from_pointee(MonitorConfig::default()))
        .load_full()
}

/// Check whether the config has been installed.
pub fn is_initialized() -> bool {
    MONITOR_CONFIG.get().is_some()
}

/// Re-read the config file and atomically swap it in.
///
/// The previous config stays active when the file fails to load or
/// validate. Logs the live-tunable fields that changed.
pub fn reload(path: &Path) -> Result<(), ConfigError> {
    let next = MonitorConfig::load_from_file(path)?;
    let prev = get();

    if (prev.billing.water_tariff - next.billing.water_tariff).abs() > f64::EPSILON {
        tracing::info!(
            from = prev.billing.water_tariff,
            to = next.billing.water_tariff,
            "Water tariff updated"
        );
    }
    if (prev.leak.threshold_lpm - next.leak.threshold_lpm).abs() > f64::EPSILON {
        tracing::info!(
            from = prev.leak.threshold_lpm,
            to = next.leak.threshold_lpm,
            "Leak threshold updated"
        );
    }

    init(next);
    Ok(())
}

/// Serializes tests that install a non-default global config, so
/// parallel test threads never observe each other's overrides.
#[cfg(test)]
pub(crate) fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
