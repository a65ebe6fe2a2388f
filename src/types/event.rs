//! Leak state transition events.

use serde::{Deserialize, Serialize};

/// Direction of a leak state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakEventKind {
    /// Sustained flow above the configured threshold was detected.
    Detected,
    /// A previously detected leak condition has cleared.
    Cleared,
}

impl std::fmt::Display for LeakEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detected => f.write_str("detected"),
            Self::Cleared => f.write_str("cleared"),
        }
    }
}

/// One-shot event emitted on a leak state transition.
///
/// Produced at most once per transition and consumed exactly once by
/// the downstream notifier (at-most-once delivery).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeakEvent {
    pub kind: LeakEventKind,

    /// Minimum flow observed over the lookback window (L/min).
    pub min_flow: f64,

    /// Threshold the minimum was compared against (L/min).
    pub threshold: f64,
}
