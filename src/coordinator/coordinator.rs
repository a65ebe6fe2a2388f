//! Water Monitor — per-tick aggregation core.
//!
//! Owns all mutable monitoring state for one Droplet device:
//!
//! - persisted per-period baselines and reset timestamps
//! - rolling sample buffers (raw flow, finalized hourly/daily
//!   consumption, hourly flow extremes)
//! - the leak detector and its one-shot pending event
//!
//! One tick ([`on_update`](WaterMonitor::on_update)) runs to completion
//! before the next begins; all state is private to a single monitor
//! instance per device, so no internal locking is needed.
//!
//! The device-side accumulators and the baselines here form one logical
//! counter split across two owners. At a period boundary the closing
//! bucket's total is finalized into history and both sides restart at
//! zero; at persistence time [`fold_external`](WaterMonitor::fold_external)
//! transfers the accumulator tallies into the baselines without any
//! visible change in published volumes.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config;
use crate::config::defaults::{FLOW_WINDOW_SECS, L_PER_M3, ML_PER_L};
use crate::device::FlowMeter;
use crate::periods;
use crate::stats;
use crate::storage::StateSnapshot;
use crate::types::{
    FlowExtremes, LeakEvent, PeriodKind, PeriodValues, ResetTimestamps, Sample, WaterSnapshot,
};

use super::leak::LeakDetector;

/// Seconds in the 24-hour statistics window.
const DAY_SECS: i64 = 24 * 3600;

/// Stateful aggregation core for one monitored device.
pub struct WaterMonitor {
    /// Persisted running totals per period (liters), excluding whatever
    /// the device accumulators have collected since their last reset.
    baselines: PeriodValues,
    /// Boundary-test instants per recurring period.
    reset_ts: ResetTimestamps,

    /// Every tick's instantaneous flow rate, short rolling window.
    flow_samples: Vec<Sample>,
    /// One entry per finalized hour (liters).
    hourly_consumption: Vec<Sample>,
    /// One entry per finalized day (liters).
    daily_consumption: Vec<Sample>,
    /// One (max, min) flow entry per finalized hour; feeds leak detection.
    hourly_flow_stats: Vec<FlowExtremes>,

    /// Running extremes for the hour currently in progress.
    hourly_max_flow: Option<f64>,
    hourly_min_flow: Option<f64>,

    /// Latest instantaneous values from the device.
    flow_rate: f64,
    volume_delta_ml: f64,

    leak: LeakDetector,
    /// Set on a leak transition, cleared exactly once by
    /// [`consume_leak_event`](Self::consume_leak_event).
    pending_leak_event: Option<LeakEvent>,

    // Statistics
    ticks_processed: u64,
    ticks_skipped: u64,
    boundaries_crossed: u64,
    leak_transitions: u64,
}

impl WaterMonitor {
    /// Zero-initialized monitor (first run, no persisted state).
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::from_snapshot(&StateSnapshot::zero(now))
    }

    /// Restore a monitor from a persisted snapshot.
    ///
    /// Sample buffers start empty — they are never persisted and their
    /// loss across a restart is acceptable.
    pub fn from_snapshot(snapshot: &StateSnapshot) -> Self {
        Self {
            baselines: snapshot.baselines,
            reset_ts: snapshot.reset_timestamps,
            flow_samples: Vec::new(),
            hourly_consumption: Vec::new(),
            daily_consumption: Vec::new(),
            hourly_flow_stats: Vec::new(),
            hourly_max_flow: None,
            hourly_min_flow: None,
            flow_rate: 0.0,
            volume_delta_ml: 0.0,
            leak: LeakDetector::new(snapshot.water_leak_detected),
            pending_leak_event: None,
            ticks_processed: 0,
            ticks_skipped: 0,
            boundaries_crossed: 0,
            leak_transitions: 0,
        }
    }

    /// Process one tick.
    ///
    /// When the device is unavailable the tick only trims buffers: no
    /// accumulation happens, published volumes and flow stay unchanged,
    /// and the device accumulators are not touched.
    pub fn on_update(&mut self, device: &mut dyn FlowMeter, now: DateTime<Utc>) {
        let now_ts = now.timestamp();

        if !device.is_available() {
            self.ticks_skipped += 1;
            debug!("Device unavailable — tick skipped");
            self.trim_buffers(now_ts);
            return;
        }

        self.flow_rate = device.flow_rate();
        self.volume_delta_ml = device.volume_delta();
        self.ticks_processed += 1;

        self.flow_samples.push(Sample::new(now_ts, self.flow_rate));

        // Running extremes for the hour in progress. Updated before
        // reconciliation so the sample closing an hour is included in
        // that hour's extremes.
        self.hourly_max_flow = Some(
            self.hourly_max_flow
                .map_or(self.flow_rate, |m| m.max(self.flow_rate)),
        );
        self.hourly_min_flow = Some(
            self.hourly_min_flow
                .map_or(self.flow_rate, |m| m.min(self.flow_rate)),
        );

        // Each period reconciles independently: a problem in one bucket
        // must not block the others.
        for period in PeriodKind::RECURRING {
            self.reconcile(device, period, now);
        }
        // Lifetime is cumulative-only; there is no boundary to handle.

        self.evaluate_leak(now_ts);
        self.trim_buffers(now_ts);
    }

    /// Boundary handling for one recurring period.
    ///
    /// On a crossing: the closing bucket's total (baseline + external
    /// accumulator) is finalized into the matching history buffer, both
    /// sides of the split counter restart at zero, and the reset
    /// instant advances by chaining `next_boundary` from the stored
    /// boundary — so a long gap replays every missed bucket instead of
    /// drifting. Missed buckets saw no flow and produce no history
    /// entries; no volume is lost.
    fn reconcile(&mut self, device: &mut dyn FlowMeter, period: PeriodKind, now: DateTime<Utc>) {
        let Some(last_reset) = self.reset_ts.get(period) else {
            return;
        };
        if !periods::is_new(period, last_reset, now) {
            return;
        }

        let external_l = device.accumulated_volume(period) / ML_PER_L;
        if !external_l.is_finite() {
            warn!(period = %period, "Non-finite accumulator value — skipping this period's fold");
            return;
        }
        let finalized = self.baselines.get(period) + external_l;
        let now_ts = now.timestamp();

        match period {
            PeriodKind::Hourly => {
                self.hourly_consumption.push(Sample::new(now_ts, finalized));
                // Close out the finished hour's flow extremes.
                if let (Some(max), Some(min)) = (self.hourly_max_flow, self.hourly_min_flow) {
                    self.hourly_flow_stats.push(FlowExtremes::new(now_ts, max, min));
                }
                // The tick opening the new hour seeds the next extremes.
                self.hourly_max_flow = Some(self.flow_rate);
                self.hourly_min_flow = Some(self.flow_rate);
            }
            PeriodKind::Daily => {
                self.daily_consumption.push(Sample::new(now_ts, finalized));
            }
            _ => {}
        }

        self.baselines.reset(period);
        device.reset_accumulator(period, now);

        let mut boundary = periods::next_boundary(period, last_reset);
        self.boundaries_crossed += 1;
        while periods::is_new(period, boundary, now) {
            boundary = periods::next_boundary(period, boundary);
            self.boundaries_crossed += 1;
        }
        self.reset_ts.set(period, boundary);

        debug!(period = %period, volume_l = finalized, "Period finalized");
    }

    /// Run the leak detector against the hourly minimum-flow history.
    ///
    /// Tariff-style settings are read from the live config on every
    /// evaluation, never cached across ticks.
    fn evaluate_leak(&mut self, now_ts: i64) {
        let cfg = config::get();
        let lookback_secs = cfg.leak.lookback_hours * 3600;
        let min_flow = stats::compute_min(
            self.hourly_flow_stats.iter().map(|s| (s.ts, s.min)),
            lookback_secs,
            now_ts,
        );
        // No finalized hours in the window yet: not enough history to
        // judge either way.
        let Some(min_flow) = min_flow else {
            return;
        };
        if let Some(event) = self.leak.evaluate(min_flow, cfg.leak.threshold_lpm) {
            self.leak_transitions += 1;
            self.pending_leak_event = Some(event);
        }
    }

    /// Drop expired entries from every sample buffer.
    fn trim_buffers(&mut self, now_ts: i64) {
        let cfg = config::get();
        stats::retain_recent(
            &mut self.flow_samples,
            |s| s.ts,
            cfg.retention.flow_window_secs,
            now_ts,
        );
        stats::retain_recent(
            &mut self.hourly_consumption,
            |s| s.ts,
            cfg.retention.hourly_consumption_secs,
            now_ts,
        );
        stats::retain_recent(
            &mut self.daily_consumption,
            |s| s.ts,
            cfg.retention.daily_consumption_secs,
            now_ts,
        );
        stats::retain_recent(
            &mut self.hourly_flow_stats,
            |s| s.ts,
            cfg.retention.flow_stats_secs,
            now_ts,
        );
    }

    /// Fold every device accumulator into the baselines and zero the
    /// accumulators, without changing any published volume: the
    /// baseline absorbs each external value before it is reset.
    ///
    /// Called before building a persistence snapshot so the snapshot
    /// captures the whole split counter.
    pub fn fold_external(&mut self, device: &mut dyn FlowMeter, now: DateTime<Utc>) {
        for period in PeriodKind::ALL {
            let external_l = device.accumulated_volume(period) / ML_PER_L;
            if !external_l.is_finite() {
                warn!(period = %period, "Non-finite accumulator value — not folding");
                continue;
            }
            if external_l != 0.0 {
                self.baselines.add(period, external_l);
                device.reset_accumulator(period, now);
            }
        }
    }

    /// Read and atomically clear the pending leak event.
    ///
    /// Exactly one consumer per tick must call this; a second call
    /// returns `None` (at-most-once delivery per transition).
    pub fn consume_leak_event(&mut self) -> Option<LeakEvent> {
        self.pending_leak_event.take()
    }

    /// Current total volume for `period` in liters: persisted baseline
    /// plus whatever the device accumulator has collected since its
    /// last reset.
    pub fn current_volume(&self, device: &dyn FlowMeter, period: PeriodKind) -> f64 {
        self.baselines.get(period) + device.accumulated_volume(period) / ML_PER_L
    }

    /// Flow rate captured on the latest processed tick (L/min).
    pub const fn flow_rate(&self) -> f64 {
        self.flow_rate
    }

    /// Volume delta captured on the latest processed tick (mL).
    pub const fn last_volume_delta_ml(&self) -> f64 {
        self.volume_delta_ml
    }

    /// Build the published aggregate snapshot for this tick.
    pub fn snapshot(&self, device: &dyn FlowMeter, now: DateTime<Utc>) -> WaterSnapshot {
        let cfg = config::get();
        let tariff = cfg.billing.water_tariff;
        let now_ts = now.timestamp();

        let daily_volume = self.current_volume(device, PeriodKind::Daily);
        let weekly_volume = self.current_volume(device, PeriodKind::Weekly);
        let monthly_volume = self.current_volume(device, PeriodKind::Monthly);

        WaterSnapshot {
            flow_rate: self.flow_rate,
            lifetime_volume: self.current_volume(device, PeriodKind::Lifetime),
            hourly_volume: self.current_volume(device, PeriodKind::Hourly),
            daily_volume,
            weekly_volume,
            monthly_volume,
            yearly_volume: self.current_volume(device, PeriodKind::Yearly),
            daily_cost: daily_volume / L_PER_M3 * tariff,
            weekly_cost: weekly_volume / L_PER_M3 * tariff,
            monthly_cost: monthly_volume / L_PER_M3 * tariff,
            avg_flow_1h: stats::compute_average(
                self.flow_samples.iter().map(|s| (s.ts, s.value)),
                FLOW_WINDOW_SECS,
                now_ts,
            ),
            max_flow_24h: stats::compute_max(
                self.hourly_flow_stats.iter().map(|s| (s.ts, s.max)),
                DAY_SECS,
                now_ts,
            ),
            min_flow_24h: stats::compute_min(
                self.hourly_flow_stats.iter().map(|s| (s.ts, s.min)),
                DAY_SECS,
                now_ts,
            ),
            water_leak_detected: self.leak.is_detected(),
            flow_sample_count: self.flow_samples.len(),
            hourly_consumption_count: self.hourly_consumption.len(),
            daily_consumption_count: self.daily_consumption.len(),
            hourly_flow_stats_count: self.hourly_flow_stats.len(),
        }
    }

    /// Build the durable state snapshot for persistence.
    pub fn state_snapshot(&self, now: DateTime<Utc>) -> StateSnapshot {
        StateSnapshot {
            baselines: self.baselines,
            reset_timestamps: self.reset_ts,
            water_leak_detected: self.leak.is_detected(),
            saved_at: now,
        }
    }

    pub const fn water_leak_detected(&self) -> bool {
        self.leak.is_detected()
    }

    pub fn hourly_consumption(&self) -> &[Sample] {
        &self.hourly_consumption
    }

    pub fn daily_consumption(&self) -> &[Sample] {
        &self.daily_consumption
    }

    pub fn hourly_flow_stats(&self) -> &[FlowExtremes] {
        &self.hourly_flow_stats
    }

    /// Monitor statistics for logging and diagnostics.
    pub const fn stats(&self) -> MonitorStats {
        MonitorStats {
            ticks_processed: self.ticks_processed,
            ticks_skipped: self.ticks_skipped,
            boundaries_crossed: self.boundaries_crossed,
            leak_transitions: self.leak_transitions,
        }
    }
}

/// Monitor statistics.
#[derive(Debug, Clone, Copy)]
pub struct MonitorStats {
    pub ticks_processed: u64,
    pub ticks_skipped: u64,
    pub boundaries_crossed: u64,
    pub leak_transitions: u64,
}

impl std::fmt::Display for MonitorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Monitor: {} ticks ({} skipped), {} boundaries crossed, {} leak transitions",
            self.ticks_processed, self.ticks_skipped, self.boundaries_crossed, self.leak_transitions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::device::DropletDriver;
    use crate::types::DeviceReading;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single().unwrap()
    }

    fn driver_with_accumulators() -> DropletDriver {
        let mut driver = DropletDriver::new();
        for period in PeriodKind::ALL {
            driver.add_accumulator(period);
        }
        driver
    }

    fn reading(ts: DateTime<Utc>, flow: f64, delta_ml: f64) -> DeviceReading {
        DeviceReading {
            timestamp: ts,
            flow_rate: flow,
            volume_delta: delta_ml,
            available: true,
        }
    }

    fn ensure_config() {
        crate::config::init(MonitorConfig::default());
    }

    #[test]
    fn volumes_combine_baseline_and_accumulator() {
        ensure_config();
        let mut driver = driver_with_accumulators();
        let t0 = at(2024, 6, 1, 12, 0, 0);

        let mut snapshot = StateSnapshot::zero(t0);
        snapshot.baselines.set(PeriodKind::Daily, 5.0);
        snapshot.baselines.set(PeriodKind::Lifetime, 8500.0);
        let monitor = WaterMonitor::from_snapshot(&snapshot);

        driver.apply(&reading(t0, 2.0, 1000.0)); // 1.0 L in every accumulator

        assert_eq!(monitor.current_volume(&driver, PeriodKind::Daily), 6.0);
        assert_eq!(monitor.current_volume(&driver, PeriodKind::Lifetime), 8501.0);
        assert_eq!(monitor.current_volume(&driver, PeriodKind::Hourly), 1.0);
    }

    #[test]
    fn cost_follows_tariff() {
        let _guard = crate::config::test_lock();

        let mut config = MonitorConfig::default();
        config.billing.water_tariff = 5.0;
        crate::config::init(config);

        let t0 = at(2024, 6, 1, 12, 0, 0);
        let mut snapshot = StateSnapshot::zero(t0);
        snapshot.baselines.set(PeriodKind::Daily, 1000.0); // 1 m³
        let monitor = WaterMonitor::from_snapshot(&snapshot);
        let driver = driver_with_accumulators();

        let published = monitor.snapshot(&driver, t0);
        assert!((published.daily_cost - 5.0).abs() < 1e-9);

        crate::config::init(MonitorConfig::default());
    }

    #[test]
    fn unavailable_tick_changes_nothing() {
        ensure_config();
        let mut driver = driver_with_accumulators();
        let t0 = at(2024, 6, 1, 12, 0, 0);
        let mut monitor = WaterMonitor::new(t0);

        driver.apply(&reading(t0, 2.0, 500.0));
        monitor.on_update(&mut driver, t0);
        assert_eq!(monitor.flow_rate(), 2.0);
        assert_eq!(monitor.last_volume_delta_ml(), 500.0);
        let before = monitor.snapshot(&driver, t0);

        let t1 = t0 + chrono::Duration::seconds(30);
        driver.set_available(false);
        monitor.on_update(&mut driver, t1);
        let after = monitor.snapshot(&driver, t1);

        assert_eq!(before.daily_volume, after.daily_volume);
        assert_eq!(before.flow_rate, after.flow_rate);
        assert_eq!(monitor.stats().ticks_skipped, 1);
        // The accumulator tally was not reset or mutated by the skip.
        assert_eq!(driver.accumulated_volume(PeriodKind::Daily), 500.0);
    }

    #[test]
    fn hourly_boundary_finalizes_and_restarts() {
        ensure_config();
        let mut driver = driver_with_accumulators();
        let t0 = at(2024, 6, 1, 12, 10, 0);
        let mut snapshot = StateSnapshot::zero(t0);
        snapshot.baselines.set(PeriodKind::Hourly, 0.5);
        let mut monitor = WaterMonitor::from_snapshot(&snapshot);

        // 0.5 L accumulates on the device during the hour.
        driver.apply(&reading(t0, 2.0, 500.0));
        monitor.on_update(&mut driver, t0);
        assert!(monitor.hourly_consumption().is_empty());

        // Crossing into the next hour finalizes 1.0 L.
        let t1 = at(2024, 6, 1, 13, 0, 5);
        driver.apply(&reading(t1, 1.0, 0.0));
        monitor.on_update(&mut driver, t1);

        assert_eq!(monitor.hourly_consumption().len(), 1);
        assert!((monitor.hourly_consumption()[0].value - 1.0).abs() < 1e-9);
        // Both sides of the split counter restarted.
        assert_eq!(monitor.current_volume(&driver, PeriodKind::Hourly), 0.0);
        assert_eq!(driver.accumulated_volume(PeriodKind::Hourly), 0.0);
        // The finished hour's flow extremes were recorded.
        assert_eq!(monitor.hourly_flow_stats().len(), 1);
        assert_eq!(monitor.hourly_flow_stats()[0].max, 2.0);
        assert_eq!(monitor.hourly_flow_stats()[0].min, 1.0);
        // Reset instant landed on the exact hour start.
        assert_eq!(
            monitor.state_snapshot(t1).reset_timestamps.hourly,
            at(2024, 6, 1, 13, 0, 0)
        );
    }

    #[test]
    fn multi_hour_gap_replays_every_boundary() {
        ensure_config();
        let mut driver = driver_with_accumulators();
        let t0 = at(2024, 6, 1, 12, 10, 0);
        let mut monitor = WaterMonitor::new(t0);

        driver.apply(&reading(t0, 2.0, 750.0));
        monitor.on_update(&mut driver, t0);

        // Three hours of downtime, then ticks resume.
        let t1 = at(2024, 6, 1, 15, 20, 0);
        driver.apply(&reading(t1, 0.0, 0.0));
        monitor.on_update(&mut driver, t1);

        // One finalized entry carrying the whole gap's volume.
        assert_eq!(monitor.hourly_consumption().len(), 1);
        assert!((monitor.hourly_consumption()[0].value - 0.75).abs() < 1e-9);
        // Reset instant chained forward onto the current hour's start.
        assert_eq!(
            monitor.state_snapshot(t1).reset_timestamps.hourly,
            at(2024, 6, 1, 15, 0, 0)
        );
    }

    #[test]
    fn daily_boundary_appends_daily_entry() {
        ensure_config();
        let mut driver = driver_with_accumulators();
        let t0 = at(2024, 6, 1, 23, 50, 0);
        let mut snapshot = StateSnapshot::zero(t0);
        snapshot.baselines.set(PeriodKind::Daily, 4.0);
        let mut monitor = WaterMonitor::from_snapshot(&snapshot);

        driver.apply(&reading(t0, 3.0, 1000.0));
        monitor.on_update(&mut driver, t0);

        let t1 = at(2024, 6, 2, 0, 0, 30);
        driver.apply(&reading(t1, 0.0, 0.0));
        monitor.on_update(&mut driver, t1);

        assert_eq!(monitor.daily_consumption().len(), 1);
        assert!((monitor.daily_consumption()[0].value - 5.0).abs() < 1e-9);
        assert_eq!(monitor.current_volume(&driver, PeriodKind::Daily), 0.0);
    }

    #[test]
    fn fold_external_is_volume_continuous() {
        ensure_config();
        let mut driver = driver_with_accumulators();
        let t0 = at(2024, 6, 1, 12, 0, 0);
        let mut monitor = WaterMonitor::new(t0);

        driver.apply(&reading(t0, 2.0, 1234.0));
        monitor.on_update(&mut driver, t0);

        let before: Vec<f64> = PeriodKind::ALL
            .iter()
            .map(|&p| monitor.current_volume(&driver, p))
            .collect();

        monitor.fold_external(&mut driver, t0);

        for (i, &period) in PeriodKind::ALL.iter().enumerate() {
            let after = monitor.current_volume(&driver, period);
            assert!(
                (before[i] - after).abs() < 1e-9,
                "{period} volume jumped across fold: {} -> {after}",
                before[i]
            );
            assert_eq!(driver.accumulated_volume(period), 0.0);
        }
    }

    #[test]
    fn consume_leak_event_is_idempotent() {
        ensure_config();
        let t0 = at(2024, 6, 1, 12, 0, 0);
        let mut monitor = WaterMonitor::new(t0);
        monitor.pending_leak_event = Some(LeakEvent {
            kind: crate::types::LeakEventKind::Detected,
            min_flow: 0.5,
            threshold: 0.0,
        });

        assert!(monitor.consume_leak_event().is_some());
        assert!(monitor.consume_leak_event().is_none());
    }

    #[test]
    fn snapshot_reports_no_data_before_any_sample() {
        ensure_config();
        let t0 = at(2024, 6, 1, 12, 0, 0);
        let monitor = WaterMonitor::new(t0);
        let driver = driver_with_accumulators();

        let published = monitor.snapshot(&driver, t0);
        assert_eq!(published.avg_flow_1h, None);
        assert_eq!(published.max_flow_24h, None);
        assert_eq!(published.min_flow_24h, None);
    }
}
