//! Flow meter driver contract and the Droplet reference driver.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{DeviceReading, PeriodKind, PeriodValues};

/// Capabilities the monitor core requires from a device driver.
///
/// The driver owns a set of per-period volume accumulators that count
/// milliliters since their own last reset. The monitor folds those
/// values into its persisted baselines and resets them at period
/// boundaries — the driver resets faster and more granularly than the
/// monitor's persistence cycle, which is why the counter is split
/// across two owners.
pub trait FlowMeter: Send {
    /// Instantaneous flow rate (L/min).
    fn flow_rate(&self) -> f64;

    /// Volume accumulated since the previous reading (mL).
    fn volume_delta(&self) -> f64;

    /// Whether the device currently has a live connection.
    fn is_available(&self) -> bool;

    /// Start accumulating volume for `period`. Unregistered periods
    /// report zero.
    fn add_accumulator(&mut self, period: PeriodKind);

    /// Stop accumulating volume for `period` and discard its tally.
    fn remove_accumulator(&mut self, period: PeriodKind);

    /// Volume accumulated for `period` since its last reset (mL).
    fn accumulated_volume(&self, period: PeriodKind) -> f64;

    /// Zero the accumulator for `period`.
    fn reset_accumulator(&mut self, period: PeriodKind, at: DateTime<Utc>);
}

/// Reference driver for the Droplet sensor.
///
/// Readings arrive from a [`ReadingSource`](super::ReadingSource) and
/// are applied here; the monitor then observes the driver through the
/// [`FlowMeter`] trait exactly as it would a hardware-backed one.
#[derive(Debug, Default)]
pub struct DropletDriver {
    flow_rate: f64,
    volume_delta: f64,
    available: bool,
    registered: [bool; 6],
    /// Per-period accumulated volume since last reset (mL).
    accumulated: PeriodValues,
    last_reset: [Option<DateTime<Utc>>; 6],
}

impl DropletDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one reading: update instantaneous values and, when the
    /// device is available, accumulate the volume delta into every
    /// registered period bucket.
    pub fn apply(&mut self, reading: &DeviceReading) {
        self.available = reading.available;
        if !reading.available {
            return;
        }
        self.flow_rate = reading.flow_rate;
        self.volume_delta = reading.volume_delta;
        for period in PeriodKind::ALL {
            if self.registered[period.index()] {
                self.accumulated.add(period, reading.volume_delta);
            }
        }
    }

    /// Force the availability flag (used by tests and fault injection).
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// When `period`'s accumulator was last reset, if ever.
    pub fn last_reset(&self, period: PeriodKind) -> Option<DateTime<Utc>> {
        self.last_reset[period.index()]
    }
}

impl FlowMeter for DropletDriver {
    fn flow_rate(&self) -> f64 {
        self.flow_rate
    }

    fn volume_delta(&self) -> f64 {
        self.volume_delta
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn add_accumulator(&mut self, period: PeriodKind) {
        self.registered[period.index()] = true;
        debug!(period = %period, "Accumulator registered");
    }

    fn remove_accumulator(&mut self, period: PeriodKind) {
        self.registered[period.index()] = false;
        self.accumulated.reset(period);
        debug!(period = %period, "Accumulator removed");
    }

    fn accumulated_volume(&self, period: PeriodKind) -> f64 {
        self.accumulated.get(period)
    }

    fn reset_accumulator(&mut self, period: PeriodKind, at: DateTime<Utc>) {
        self.accumulated.reset(period);
        self.last_reset[period.index()] = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(flow: f64, delta_ml: f64) -> DeviceReading {
        DeviceReading {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().unwrap(),
            flow_rate: flow,
            volume_delta: delta_ml,
            available: true,
        }
    }

    #[test]
    fn registered_accumulators_collect_deltas() {
        let mut driver = DropletDriver::new();
        driver.add_accumulator(PeriodKind::Hourly);
        driver.add_accumulator(PeriodKind::Lifetime);

        driver.apply(&reading(2.0, 500.0));
        driver.apply(&reading(1.0, 250.0));

        assert_eq!(driver.accumulated_volume(PeriodKind::Hourly), 750.0);
        assert_eq!(driver.accumulated_volume(PeriodKind::Lifetime), 750.0);
        // Never registered — no tally.
        assert_eq!(driver.accumulated_volume(PeriodKind::Daily), 0.0);
        assert_eq!(driver.flow_rate(), 1.0);
        assert_eq!(driver.volume_delta(), 250.0);
    }

    #[test]
    fn reset_zeroes_one_accumulator_only() {
        let mut driver = DropletDriver::new();
        for period in PeriodKind::ALL {
            driver.add_accumulator(period);
        }
        driver.apply(&reading(2.0, 1000.0));

        let at = Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).single().unwrap();
        driver.reset_accumulator(PeriodKind::Hourly, at);

        assert_eq!(driver.accumulated_volume(PeriodKind::Hourly), 0.0);
        assert_eq!(driver.accumulated_volume(PeriodKind::Daily), 1000.0);
        assert_eq!(driver.last_reset(PeriodKind::Hourly), Some(at));
        assert_eq!(driver.last_reset(PeriodKind::Daily), None);
    }

    #[test]
    fn unavailable_reading_does_not_accumulate() {
        let mut driver = DropletDriver::new();
        driver.add_accumulator(PeriodKind::Daily);
        driver.apply(&reading(3.0, 100.0));

        let mut offline = reading(5.0, 999.0);
        offline.available = false;
        driver.apply(&offline);

        assert!(!driver.is_available());
        assert_eq!(driver.accumulated_volume(PeriodKind::Daily), 100.0);
        // Last good values stay put.
        assert_eq!(driver.flow_rate(), 3.0);
    }
}
