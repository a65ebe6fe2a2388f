//! Hysteresis-based leak detection.
//!
//! A genuine leak shows continuous nonzero flow: the minimum flow over
//! a multi-hour window never drops back to the idle floor, whereas
//! normal usage always has at least one near-idle sample. The detector
//! therefore compares the windowed minimum against a single threshold,
//! with the comparison direction keyed to the current state so the
//! output cannot chatter.

use tracing::{info, warn};

use crate::types::{LeakEvent, LeakEventKind};

/// Two-state (OK / LEAK) edge-triggered detector.
///
/// [`evaluate`](Self::evaluate) returns an event only on a state
/// transition — once per detection and once per clear, never repeated
/// while the state holds.
#[derive(Debug, Default)]
pub struct LeakDetector {
    leak_detected: bool,
}

impl LeakDetector {
    /// Start in the given state (restored from persistence).
    pub const fn new(leak_detected: bool) -> Self {
        Self { leak_detected }
    }

    pub const fn is_detected(&self) -> bool {
        self.leak_detected
    }

    /// Run one evaluation against the windowed minimum flow.
    ///
    /// `min_flow` strictly above `threshold` while OK flips to LEAK;
    /// `min_flow` at or below `threshold` while LEAK flips back. The
    /// exactly-boundary value counts as "no leak". Anything else is a
    /// no-op.
    pub fn evaluate(&mut self, min_flow: f64, threshold: f64) -> Option<LeakEvent> {
        if !self.leak_detected && min_flow > threshold {
            self.leak_detected = true;
            warn!(min_flow, threshold, "Leak detected: sustained flow above threshold");
            Some(LeakEvent {
                kind: LeakEventKind::Detected,
                min_flow,
                threshold,
            })
        } else if self.leak_detected && min_flow <= threshold {
            self.leak_detected = false;
            info!(min_flow, threshold, "Leak cleared: flow returned to idle");
            Some(LeakEvent {
                kind: LeakEventKind::Cleared,
                min_flow,
                threshold,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_once_for_sustained_flow() {
        let mut detector = LeakDetector::default();

        let first = detector.evaluate(0.5, 0.0);
        assert_eq!(first.map(|e| e.kind), Some(LeakEventKind::Detected));
        assert!(detector.is_detected());

        // Repeated evaluations above threshold stay silent.
        for _ in 0..24 {
            assert_eq!(detector.evaluate(0.5, 0.0), None);
        }
    }

    #[test]
    fn clears_once_when_flow_returns_to_idle() {
        let mut detector = LeakDetector::new(true);

        let event = detector.evaluate(0.0, 0.0).unwrap();
        assert_eq!(event.kind, LeakEventKind::Cleared);
        assert!(!detector.is_detected());

        assert_eq!(detector.evaluate(0.0, 0.0), None);
    }

    #[test]
    fn boundary_value_counts_as_no_leak() {
        let mut detector = LeakDetector::default();
        // Exactly at threshold: no detection while OK...
        assert_eq!(detector.evaluate(0.2, 0.2), None);

        // ...and clears while in LEAK.
        let mut leaking = LeakDetector::new(true);
        assert_eq!(
            leaking.evaluate(0.2, 0.2).map(|e| e.kind),
            Some(LeakEventKind::Cleared)
        );
    }

    #[test]
    fn event_carries_inputs() {
        let mut detector = LeakDetector::default();
        let event = detector.evaluate(0.8, 0.1).unwrap();
        assert_eq!(event.min_flow, 0.8);
        assert_eq!(event.threshold, 0.1);
    }
}
