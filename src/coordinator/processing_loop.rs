//! Unified reading processing loop shared across all input modes.
//!
//! Drives a [`WaterMonitor`] from any [`ReadingSource`]: applies each
//! reading to the driver, runs the tick, forwards the one-shot leak
//! event and advisory to the notification sink, republishes the
//! aggregate snapshot, and handles periodic plus shutdown persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config;
use crate::config::defaults::LEAK_ADVISORY_ID;
use crate::device::{DropletDriver, FlowMeter, ReadingEvent, ReadingSource};
use crate::notify::NotificationSink;
use crate::storage::SnapshotStore;
use crate::types::{DeviceReading, LeakEventKind, PeriodKind, WaterSnapshot};

use super::{MonitorStats, WaterMonitor};

/// Owns all state needed for the reading processing loop.
///
/// Built with [`new()`](ProcessingLoop::new), then consumed by
/// [`run()`](ProcessingLoop::run). Snapshots go out on the returned
/// watch channel — one notification per tick, not per field.
pub struct ProcessingLoop {
    monitor: WaterMonitor,
    driver: DropletDriver,
    store: Arc<dyn SnapshotStore>,
    sink: Arc<dyn NotificationSink>,
    snapshot_tx: watch::Sender<WaterSnapshot>,
    cancel: CancellationToken,
    last_save_ts: i64,
    last_seen: Option<DateTime<Utc>>,
}

impl ProcessingLoop {
    pub fn new(
        monitor: WaterMonitor,
        mut driver: DropletDriver,
        store: Arc<dyn SnapshotStore>,
        sink: Arc<dyn NotificationSink>,
        cancel: CancellationToken,
    ) -> (Self, watch::Receiver<WaterSnapshot>) {
        // Register every period accumulator on the driver at setup.
        for period in PeriodKind::ALL {
            driver.add_accumulator(period);
        }

        let (snapshot_tx, snapshot_rx) = watch::channel(WaterSnapshot::default());
        (
            Self {
                monitor,
                driver,
                store,
                sink,
                snapshot_tx,
                cancel,
                last_save_ts: 0,
                last_seen: None,
            },
            snapshot_rx,
        )
    }

    /// Run the processing loop until the source is exhausted or
    /// cancellation, then perform one final best-effort save.
    ///
    /// Returns final monitor statistics.
    pub async fn run<S: ReadingSource>(mut self, source: &mut S) -> MonitorStats {
        info!("Processing readings from {} source...", source.source_name());

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("[Monitor] Shutdown signal received");
                    break;
                }
                result = source.next_reading() => {
                    match result {
                        Ok(ev) => ev,
                        Err(e) => {
                            warn!("[Monitor] Source error: {}", e);
                            break;
                        }
                    }
                }
            };

            let reading = match event {
                ReadingEvent::Reading(r) => r,
                ReadingEvent::Eof => {
                    info!("[Monitor] Source reached end of data");
                    break;
                }
            };

            self.process_reading(&reading).await;
        }

        // Final best-effort save before releasing the device. A failure
        // here is logged, not escalated: at most one save interval's
        // worth of baseline delta is lost.
        let now = self.last_seen.unwrap_or_else(Utc::now);
        self.save_state(now).await;

        // Release the driver-side accumulators.
        for period in PeriodKind::ALL {
            self.driver.remove_accumulator(period);
        }

        self.monitor.stats()
    }

    async fn process_reading(&mut self, reading: &DeviceReading) {
        let now = reading.timestamp;
        self.last_seen = Some(now);

        self.driver.apply(reading);
        self.monitor.on_update(&mut self.driver, now);

        // Single authorized consumer of the one-shot transition event.
        if let Some(event) = self.monitor.consume_leak_event() {
            self.sink.leak_event(&event);
            match event.kind {
                LeakEventKind::Detected => self.sink.raise_advisory(LEAK_ADVISORY_ID),
                LeakEventKind::Cleared => self.sink.clear_advisory(LEAK_ADVISORY_ID),
            }
        }

        let snapshot = self.monitor.snapshot(&self.driver, now);
        self.snapshot_tx.send_replace(snapshot);

        let now_ts = now.timestamp();
        // Seed the save timer on the first reading so startup does not
        // trigger an immediate spurious save.
        if self.last_save_ts == 0 {
            self.last_save_ts = now_ts;
        }
        if now_ts - self.last_save_ts >= config::get().persistence.save_interval_secs {
            self.save_state(now).await;
        }
    }

    async fn save_state(&mut self, now: DateTime<Utc>) {
        self.monitor.fold_external(&mut self.driver, now);
        let snapshot = self.monitor.state_snapshot(now);
        match self.store.save(&snapshot).await {
            Ok(()) => {
                self.last_save_ts = now.timestamp();
                debug!(backend = self.store.backend_name(), "State saved");
            }
            Err(e) => {
                // In-memory state stays authoritative; retried at the
                // next save opportunity.
                warn!(error = %e, "State save failed");
            }
        }
    }
}
