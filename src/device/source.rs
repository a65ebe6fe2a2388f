//! Reading source abstraction for device data ingestion.
//!
//! Provides a unified trait for obtaining readings from different
//! sources: a simulated usage generator (poll mode) and stdin JSON
//! lines (push mode, one reading per line). Either way the service
//! loop awaits [`next_reading`](ReadingSource::next_reading) inside a
//! `select!` with cancellation.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::types::DeviceReading;

/// Events produced by a reading source.
pub enum ReadingEvent {
    /// A valid reading was obtained.
    Reading(DeviceReading),
    /// Source reached end of data (EOF for stdin, horizon for the
    /// simulator).
    Eof,
}

/// Trait abstracting where device readings come from.
#[async_trait]
pub trait ReadingSource: Send + 'static {
    /// Obtain the next reading, suspending until one is due.
    async fn next_reading(&mut self) -> Result<ReadingEvent>;

    /// Human-readable name for logging (e.g. "simulated", "stdin").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Stdin Source (JSON readings, one per line)
// ============================================================================

/// Reads JSON-formatted device readings from stdin.
///
/// Used with the simulation generator:
/// `./simulation --hours 2 | ./droplet-monitor --stdin`
pub struct StdinSource {
    reader: tokio::io::BufReader<tokio::io::Stdin>,
    line_buffer: String,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            reader: tokio::io::BufReader::new(tokio::io::stdin()),
            line_buffer: String::with_capacity(256),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadingSource for StdinSource {
    async fn next_reading(&mut self) -> Result<ReadingEvent> {
        use tokio::io::AsyncBufReadExt;
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(ReadingEvent::Eof);
            }
            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<DeviceReading>(line) {
                Ok(reading) => return Ok(ReadingEvent::Reading(reading)),
                Err(e) => {
                    tracing::warn!("[StdinSource] Failed to parse reading: {}", e);
                    // Skip malformed lines and keep reading.
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}

// ============================================================================
// Simulated Source (poll-mode stand-in)
// ============================================================================

/// Generates plausible household water usage at a fixed interval.
///
/// Mostly idle with short random draw events; an optional constant
/// seep models a slow leak. Simulated time advances by `interval_secs`
/// per reading while wall-clock sleeps are divided by `speed`.
pub struct SimulatedSource {
    rng: StdRng,
    interval_secs: u64,
    speed: u64,
    sim_time: DateTime<Utc>,
    /// Remaining ticks of the current draw event.
    draw_ticks: u32,
    /// Constant background flow modeling a leak (L/min); 0 disables.
    seep_lpm: f64,
    first: bool,
}

impl SimulatedSource {
    pub fn new(interval_secs: u64, speed: u64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            interval_secs: interval_secs.max(1),
            speed: speed.max(1),
            sim_time: Utc::now(),
            draw_ticks: 0,
            seep_lpm: 0.0,
            first: true,
        }
    }

    /// Add a constant background seep, as a leak scenario.
    pub fn with_seep(mut self, seep_lpm: f64) -> Self {
        self.seep_lpm = seep_lpm;
        self
    }

    fn sample_flow(&mut self) -> f64 {
        if self.draw_ticks == 0 && self.rng.gen_bool(0.1) {
            // A faucet/shower event lasting a handful of ticks.
            self.draw_ticks = self.rng.gen_range(1..=6);
        }
        let mut flow = self.seep_lpm;
        if self.draw_ticks > 0 {
            self.draw_ticks -= 1;
            let draw: f64 = Normal::new(6.0, 2.0)
                .map(|n| n.sample(&mut self.rng))
                .unwrap_or(6.0);
            flow += draw.max(0.5);
        }
        flow
    }
}

#[async_trait]
impl ReadingSource for SimulatedSource {
    async fn next_reading(&mut self) -> Result<ReadingEvent> {
        if self.first {
            self.first = false;
        } else {
            let sleep_ms = self.interval_secs * 1000 / self.speed;
            tokio::time::sleep(std::time::Duration::from_millis(sleep_ms.max(1))).await;
            self.sim_time += ChronoDuration::seconds(self.interval_secs as i64);
        }

        let flow_rate = self.sample_flow();
        let volume_delta = flow_rate * self.interval_secs as f64 / 60.0 * 1000.0; // mL

        Ok(ReadingEvent::Reading(DeviceReading {
            timestamp: self.sim_time,
            flow_rate,
            volume_delta,
            available: true,
        }))
    }

    fn source_name(&self) -> &str {
        "simulated"
    }
}
