//! Notification sink collaborator.
//!
//! Stands in for the host platform's event bus and issue registry: a
//! one-shot channel for leak state transitions plus a persistent,
//! user-actionable advisory keyed by a fixed identifier that can be
//! raised and retracted.

use tracing::{info, warn};

use crate::types::{LeakEvent, LeakEventKind};

/// Trait for delivering leak events and advisories to a host platform.
///
/// Implementations must be thread-safe (`Send + Sync`) for shared
/// access across async tasks.
pub trait NotificationSink: Send + Sync {
    /// Deliver a one-shot leak state transition event. Called at most
    /// once per transition.
    fn leak_event(&self, event: &LeakEvent);

    /// Raise a persistent advisory keyed by `id`. Raising an already
    /// raised advisory is a no-op for the sink.
    fn raise_advisory(&self, id: &str);

    /// Retract a previously raised advisory. Clearing an unknown `id`
    /// is a no-op.
    fn clear_advisory(&self, id: &str);
}

/// Log-backed sink — the default when no host platform is attached.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn leak_event(&self, event: &LeakEvent) {
        match event.kind {
            LeakEventKind::Detected => warn!(
                min_flow = event.min_flow,
                threshold = event.threshold,
                "Water leak detected"
            ),
            LeakEventKind::Cleared => info!(
                min_flow = event.min_flow,
                threshold = event.threshold,
                "Water leak cleared"
            ),
        }
    }

    fn raise_advisory(&self, id: &str) {
        warn!(advisory = id, "Advisory raised");
    }

    fn clear_advisory(&self, id: &str) {
        info!(advisory = id, "Advisory cleared");
    }
}
