//! Device readings and sample buffer entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single update delivered by the device driver.
///
/// Flow is instantaneous (L/min); volume is the delta accumulated since
/// the previous reading, in milliliters as reported by the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    pub timestamp: DateTime<Utc>,

    /// Instantaneous flow rate (L/min).
    pub flow_rate: f64,

    /// Volume accumulated since the previous reading (mL).
    pub volume_delta: f64,

    /// Whether the device had a live connection when this reading was
    /// produced. Unavailable readings carry no usable flow/volume data.
    #[serde(default = "default_available")]
    pub available: bool,
}

const fn default_available() -> bool {
    true
}

/// A timestamped value in a rolling sample buffer.
///
/// `ts` is Unix seconds; the unit of `value` depends on the buffer
/// (L/min for flow samples, liters for finalized consumption entries).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub ts: i64,
    pub value: f64,
}

impl Sample {
    pub const fn new(ts: i64, value: f64) -> Self {
        Self { ts, value }
    }
}

/// Flow extremes observed within one finalized hour (L/min).
///
/// The minima feed leak detection: a genuine leak keeps the hourly
/// minimum above the idle floor for every hour in the lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowExtremes {
    pub ts: i64,
    pub max: f64,
    pub min: f64,
}

impl FlowExtremes {
    pub const fn new(ts: i64, max: f64, min: f64) -> Self {
        Self { ts, max, min }
    }
}
