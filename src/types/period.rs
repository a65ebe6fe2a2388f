//! Accounting periods and per-period state containers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recurring accounting interval, or the special non-resetting
/// lifetime span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Lifetime,
}

impl PeriodKind {
    /// Every period, lifetime included.
    pub const ALL: [Self; 6] = [
        Self::Hourly,
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::Yearly,
        Self::Lifetime,
    ];

    /// Periods that reset at a boundary crossing. Lifetime is
    /// cumulative-only and never resets.
    pub const RECURRING: [Self; 5] = [
        Self::Hourly,
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::Yearly,
    ];

    /// Wire name used by the device driver's accumulator interface.
    pub const fn accumulator_name(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Lifetime => "lifetime",
        }
    }

    /// Inverse of [`accumulator_name`](Self::accumulator_name).
    pub fn from_accumulator_name(name: &str) -> Option<Self> {
        match name {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            "lifetime" => Some(Self::Lifetime),
            _ => None,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Hourly => 0,
            Self::Daily => 1,
            Self::Weekly => 2,
            Self::Monthly => 3,
            Self::Yearly => 4,
            Self::Lifetime => 5,
        }
    }
}

impl std::fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.accumulator_name())
    }
}

/// One `f64` per period, indexed by [`PeriodKind`].
///
/// Replaces a name-keyed map with a fixed array so a typo'd accumulator
/// name cannot create a phantom bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodValues([f64; 6]);

impl PeriodValues {
    pub const fn new() -> Self {
        Self([0.0; 6])
    }

    pub fn get(&self, period: PeriodKind) -> f64 {
        self.0[period.index()]
    }

    pub fn set(&mut self, period: PeriodKind, value: f64) {
        self.0[period.index()] = value;
    }

    pub fn add(&mut self, period: PeriodKind, value: f64) {
        self.0[period.index()] += value;
    }

    pub fn reset(&mut self, period: PeriodKind) {
        self.0[period.index()] = 0.0;
    }
}

/// The instant against which the next boundary crossing is tested,
/// one per recurring period.
///
/// Advanced by chaining `next_boundary` from the previous boundary
/// rather than jumping to "now", so long gaps still land each reset on
/// an exact period start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetTimestamps {
    pub hourly: DateTime<Utc>,
    pub daily: DateTime<Utc>,
    pub weekly: DateTime<Utc>,
    pub monthly: DateTime<Utc>,
    pub yearly: DateTime<Utc>,
}

impl ResetTimestamps {
    /// Seed every reset point at the same instant (startup / first
    /// observation).
    pub const fn all_at(now: DateTime<Utc>) -> Self {
        Self {
            hourly: now,
            daily: now,
            weekly: now,
            monthly: now,
            yearly: now,
        }
    }

    /// Reset instant for `period`; `None` for lifetime, which has no
    /// boundaries.
    pub const fn get(&self, period: PeriodKind) -> Option<DateTime<Utc>> {
        match period {
            PeriodKind::Hourly => Some(self.hourly),
            PeriodKind::Daily => Some(self.daily),
            PeriodKind::Weekly => Some(self.weekly),
            PeriodKind::Monthly => Some(self.monthly),
            PeriodKind::Yearly => Some(self.yearly),
            PeriodKind::Lifetime => None,
        }
    }

    /// Store a new reset instant for `period`. Ignored for lifetime.
    pub fn set(&mut self, period: PeriodKind, at: DateTime<Utc>) {
        match period {
            PeriodKind::Hourly => self.hourly = at,
            PeriodKind::Daily => self.daily = at,
            PeriodKind::Weekly => self.weekly = at,
            PeriodKind::Monthly => self.monthly = at,
            PeriodKind::Yearly => self.yearly = at,
            PeriodKind::Lifetime => {}
        }
    }
}
