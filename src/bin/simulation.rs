//! Droplet reading simulation
//!
//! Generates realistic water-usage readings for testing the monitor.
//! Simulates household scenarios including:
//! - Normal idle/usage cycles (faucets, showers)
//! - Heavy sustained usage
//! - A slow leak (constant seep that never returns to idle)
//! - Recovery back to normal
//!
//! # Usage
//! ```bash
//! ./simulation --hours 2 --speed 100 | ./droplet-monitor --stdin
//! ```

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::io::{self, Write};

use chrono::{Duration, Utc};
use droplet_monitor::types::DeviceReading;

// ============================================================================
// Usage Constants
// ============================================================================

/// Mean flow of a draw event (L/min)
const DRAW_FLOW_MEAN: f64 = 6.0;
/// Std-dev of draw event flow (L/min)
const DRAW_FLOW_STDDEV: f64 = 2.0;
/// Probability of a new draw event starting on any sample
const DRAW_PROBABILITY: f64 = 0.08;
/// Constant seep during the leak phase (L/min)
const LEAK_SEEP_LPM: f64 = 0.4;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "droplet-simulation")]
#[command(about = "Water usage simulation for droplet-monitor testing")]
#[command(version)]
struct Args {
    /// Simulation duration in hours (1-168)
    #[arg(short = 'H', long, default_value = "2", value_parser = clap::value_parser!(u32).range(1..=168))]
    hours: u32,

    /// Time compression factor (1 = real-time, 100 = 100x faster)
    #[arg(short, long, default_value = "100", value_parser = clap::value_parser!(u32).range(1..=100_000))]
    speed: u32,

    /// Seconds of simulated time between readings
    #[arg(long, default_value = "30")]
    sample_interval: u32,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Suppress phase log lines on stderr (only emit readings)
    #[arg(short, long)]
    quiet: bool,

    /// Skip the leak scenario and generate normal usage throughout
    #[arg(long)]
    no_leak: bool,
}

// ============================================================================
// Simulation Phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Normal idle/usage cycles (0-40%)
    Normal,
    /// Heavy sustained usage - laundry, irrigation (40-55%)
    HeavyUse,
    /// Slow leak - flow never returns to idle (55-85%)
    SlowLeak,
    /// Leak fixed, back to normal (85-100%)
    Recovery,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal Usage",
            Self::HeavyUse => "Heavy Usage (Laundry / Irrigation)",
            Self::SlowLeak => "Slow Leak (Constant Seep)",
            Self::Recovery => "Recovery (Leak Fixed)",
        }
    }

    fn from_progress(progress: f64, no_leak: bool) -> Self {
        if no_leak {
            return if progress < 0.5 { Self::Normal } else { Self::HeavyUse };
        }
        match progress {
            p if p < 0.40 => Self::Normal,
            p if p < 0.55 => Self::HeavyUse,
            p if p < 0.85 => Self::SlowLeak,
            _ => Self::Recovery,
        }
    }

    const fn seep(self) -> f64 {
        match self {
            Self::SlowLeak => LEAK_SEEP_LPM,
            _ => 0.0,
        }
    }

    const fn draw_probability(self) -> f64 {
        match self {
            Self::HeavyUse => 0.25,
            _ => DRAW_PROBABILITY,
        }
    }
}

// ============================================================================
// Generator
// ============================================================================

struct UsageGenerator {
    rng: StdRng,
    draw_ticks: u32,
}

impl UsageGenerator {
    fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng, draw_ticks: 0 }
    }

    fn sample(&mut self, phase: Phase) -> f64 {
        if self.draw_ticks == 0 && self.rng.gen_bool(phase.draw_probability()) {
            self.draw_ticks = self.rng.gen_range(1..=8);
        }
        let mut flow = phase.seep();
        if self.draw_ticks > 0 {
            self.draw_ticks -= 1;
            let draw = Normal::new(DRAW_FLOW_MEAN, DRAW_FLOW_STDDEV)
                .map(|n| n.sample(&mut self.rng))
                .unwrap_or(DRAW_FLOW_MEAN);
            flow += draw.max(0.5);
        }
        flow
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let total_samples = u64::from(args.hours) * 3600 / u64::from(args.sample_interval);
    let sleep_ms = u64::from(args.sample_interval) * 1000 / u64::from(args.speed);

    if !args.quiet {
        eprintln!(
            "droplet-simulation: {} h of readings, {} samples, {}x speed",
            args.hours, total_samples, args.speed
        );
    }

    let mut generator = UsageGenerator::new(args.seed);
    let mut sim_time = Utc::now();
    let mut last_phase = None;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for sample_idx in 0..total_samples {
        let progress = sample_idx as f64 / total_samples as f64;
        let phase = Phase::from_progress(progress, args.no_leak);
        if !args.quiet && last_phase != Some(phase) {
            eprintln!("[{:>5.1}%] Phase: {}", progress * 100.0, phase.name());
            last_phase = Some(phase);
        }

        let flow_rate = generator.sample(phase);
        let volume_delta = flow_rate * f64::from(args.sample_interval) / 60.0 * 1000.0; // mL

        let reading = DeviceReading {
            timestamp: sim_time,
            flow_rate,
            volume_delta,
            available: true,
        };
        serde_json::to_writer(&mut out, &reading)?;
        out.write_all(b"\n")?;
        out.flush()?;

        sim_time += Duration::seconds(i64::from(args.sample_interval));
        if sleep_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(sleep_ms)).await;
        }
    }

    if !args.quiet {
        eprintln!("droplet-simulation: done ({total_samples} readings)");
    }
    Ok(())
}
