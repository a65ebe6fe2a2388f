//! Monitor configuration — operator-tunable values loaded from TOML.
//!
//! Every struct implements `Default` with values matching the built-in
//! constants, so behavior is unchanged when no config file is present.
//! The tariff and leak threshold are user-mutable at runtime through
//! the file watcher; the core re-reads them on every evaluation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one monitored Droplet device.
///
/// Load with [`MonitorConfig::load`] which searches:
/// 1. `$DROPLET_CONFIG` env var
/// 2. `./droplet_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Device identification
    #[serde(default)]
    pub device: DeviceInfo,

    /// Billing / cost derivation
    #[serde(default)]
    pub billing: BillingConfig,

    /// Leak detection tuning
    #[serde(default)]
    pub leak: LeakConfig,

    /// Sample buffer retention horizons
    #[serde(default)]
    pub retention: RetentionConfig,

    /// State persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device: DeviceInfo::default(),
            billing: BillingConfig::default(),
            leak: LeakConfig::default(),
            retention: RetentionConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration using the standard search order:
    /// 1. `$DROPLET_CONFIG` environment variable
    /// 2. `./droplet_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        Self::load_with_source(None).0
    }

    /// Same as [`load`](Self::load), but also reports which file (if
    /// any) the config came from so a watcher can track it. An explicit
    /// `override_path` wins over the search order.
    pub fn load_with_source(override_path: Option<&Path>) -> (Self, Option<PathBuf>) {
        if let Some(path) = override_path {
            match Self::load_from_file(path) {
                Ok(config) => {
                    info!(path = %path.display(), device = %config.device.name, "Loaded monitor config");
                    return (config, Some(path.to_path_buf()));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to load config override, falling back");
                }
            }
        }

        if let Ok(path) = std::env::var("DROPLET_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), device = %config.device.name, "Loaded monitor config from DROPLET_CONFIG");
                        return (config, Some(p));
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from DROPLET_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "DROPLET_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("droplet_config.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(device = %config.device.name, "Loaded monitor config from ./droplet_config.toml");
                    return (config, Some(local));
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./droplet_config.toml, using defaults");
                }
            }
        }

        info!("No droplet_config.toml found — using built-in defaults");
        (Self::default(), None)
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges, collecting every problem instead of
    /// stopping at the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        Self::check_non_negative(self.billing.water_tariff, "billing.water_tariff", &mut errors);
        Self::check_non_negative(self.leak.threshold_lpm, "leak.threshold_lpm", &mut errors);

        if self.leak.lookback_hours < 1 {
            errors.push(format!(
                "leak.lookback_hours: must be at least 1 (got {})",
                self.leak.lookback_hours
            ));
        }
        if self.retention.flow_window_secs < 1 {
            errors.push(format!(
                "retention.flow_window_secs: must be at least 1 (got {})",
                self.retention.flow_window_secs
            ));
        }
        if self.retention.flow_stats_secs < self.leak.lookback_hours * 3600 {
            errors.push(format!(
                "retention.flow_stats_secs ({}) must cover leak.lookback_hours ({} h)",
                self.retention.flow_stats_secs, self.leak.lookback_hours
            ));
        }
        if self.persistence.save_interval_secs < 1 {
            errors.push(format!(
                "persistence.save_interval_secs: must be at least 1 (got {})",
                self.persistence.save_interval_secs
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_non_negative(value: f64, name: &str, errors: &mut Vec<String>) {
        // NaN comparisons silently pass — catch them explicitly.
        if !value.is_finite() {
            errors.push(format!("{name}: must be finite (got {value})"));
        } else if value < 0.0 {
            errors.push(format!("{name}: must be >= 0 (got {value})"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Device Info
// ============================================================================

/// Identification metadata — appears in logs and scopes the state store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Human-readable device name
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Stable identifier; keys the persisted state snapshot
    #[serde(default = "default_device_id")]
    pub id: String,
}

fn default_device_name() -> String {
    "Droplet".to_string()
}
fn default_device_id() -> String {
    "droplet-001".to_string()
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            id: default_device_id(),
        }
    }
}

// ============================================================================
// Billing
// ============================================================================

/// Cost derivation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Water tariff in currency units per cubic meter. Zero disables
    /// cost derivation (costs publish as 0.0).
    #[serde(default)]
    pub water_tariff: f64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self { water_tariff: 0.0 }
    }
}

// ============================================================================
// Leak Detection
// ============================================================================

/// Leak detector tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeakConfig {
    /// Flow-rate floor (L/min) below which flow counts as "no leak".
    /// The detector fires when the minimum hourly flow over the
    /// lookback window stays strictly above this value.
    #[serde(default)]
    pub threshold_lpm: f64,

    /// Hours of hourly minimum-flow history inspected per evaluation.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,
}

fn default_lookback_hours() -> i64 {
    defaults::LEAK_LOOKBACK_HOURS
}

impl Default for LeakConfig {
    fn default() -> Self {
        Self {
            threshold_lpm: 0.0,
            lookback_hours: default_lookback_hours(),
        }
    }
}

// ============================================================================
// Retention
// ============================================================================

/// Sample buffer retention horizons (seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_flow_window_secs")]
    pub flow_window_secs: i64,

    #[serde(default = "default_hourly_consumption_secs")]
    pub hourly_consumption_secs: i64,

    #[serde(default = "default_daily_consumption_secs")]
    pub daily_consumption_secs: i64,

    #[serde(default = "default_flow_stats_secs")]
    pub flow_stats_secs: i64,
}

fn default_flow_window_secs() -> i64 {
    defaults::FLOW_WINDOW_SECS
}
fn default_hourly_consumption_secs() -> i64 {
    defaults::HOURLY_CONSUMPTION_RETENTION_SECS
}
fn default_daily_consumption_secs() -> i64 {
    defaults::DAILY_CONSUMPTION_RETENTION_SECS
}
fn default_flow_stats_secs() -> i64 {
    defaults::FLOW_STATS_RETENTION_SECS
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            flow_window_secs: default_flow_window_secs(),
            hourly_consumption_secs: default_hourly_consumption_secs(),
            daily_consumption_secs: default_daily_consumption_secs(),
            flow_stats_secs: default_flow_stats_secs(),
        }
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// State snapshot persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory holding the state database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Interval between periodic state saves (seconds).
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: i64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_save_interval_secs() -> i64 {
    defaults::SAVE_INTERVAL_SECS
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            save_interval_secs: default_save_interval_secs(),
        }
    }
}
