//! Durable state snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PeriodValues, ResetTimestamps};

/// Everything the monitor needs to survive a restart.
///
/// Baselines are the sole persisted volume quantity; sample buffers are
/// deliberately not included (losing them on restart is acceptable).
/// Reset timestamps are persisted so a gap spanning a period boundary
/// folds into the correct bucket when ticks resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Per-period baseline volumes (liters).
    pub baselines: PeriodValues,

    /// Boundary-test instants per recurring period.
    pub reset_timestamps: ResetTimestamps,

    /// Leak detector state at save time.
    pub water_leak_detected: bool,

    /// When this snapshot was written.
    pub saved_at: DateTime<Utc>,
}

impl StateSnapshot {
    /// First-run snapshot: zero volumes, all reset points seeded at
    /// `now`, no leak.
    pub const fn zero(now: DateTime<Utc>) -> Self {
        Self {
            baselines: PeriodValues::new(),
            reset_timestamps: ResetTimestamps::all_at(now),
            water_leak_detected: false,
            saved_at: now,
        }
    }
}
