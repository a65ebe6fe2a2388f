//! System-wide default constants.
//!
//! Centralises magic numbers so retention horizons and intervals have
//! one home. Grouped by subsystem.

// ============================================================================
// Device
// ============================================================================

/// Interval between device polls when running in poll mode (seconds).
pub const SCAN_INTERVAL_SECS: u64 = 30;

/// Milliliters per liter — the driver reports volume in mL, the core
/// accounts in liters.
pub const ML_PER_L: f64 = 1000.0;

/// Liters per cubic meter — tariffs are quoted per m³.
pub const L_PER_M3: f64 = 1000.0;

// ============================================================================
// Sample buffer retention
// ============================================================================

/// Retention horizon for raw flow samples (seconds).
///
/// One hour of per-tick samples backs the 1-hour average flow statistic.
pub const FLOW_WINDOW_SECS: i64 = 3600;

/// Retention horizon for finalized hourly consumption entries (seconds).
pub const HOURLY_CONSUMPTION_RETENTION_SECS: i64 = 24 * 3600;

/// Retention horizon for finalized daily consumption entries (seconds).
pub const DAILY_CONSUMPTION_RETENTION_SECS: i64 = 30 * 24 * 3600;

/// Retention horizon for hourly flow extremes (seconds).
///
/// Kept longer than the leak lookback window so trimming never starves
/// the detector.
pub const FLOW_STATS_RETENTION_SECS: i64 = 48 * 3600;

// ============================================================================
// Leak detection
// ============================================================================

/// Hours of hourly minimum-flow history the leak detector inspects.
pub const LEAK_LOOKBACK_HOURS: i64 = 24;

/// Fixed identifier for the persistent leak advisory raised on
/// detection and retracted on clear.
pub const LEAK_ADVISORY_ID: &str = "droplet_water_leak";

// ============================================================================
// Persistence
// ============================================================================

/// Interval between periodic state saves (seconds).
///
/// Bounds data loss on crash to at most five minutes of baseline delta.
pub const SAVE_INTERVAL_SECS: i64 = 300;
