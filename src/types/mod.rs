//! Core data types for the water monitor.
//!
//! Split by concern: accounting periods and per-period state arrays,
//! device readings and sample buffers, leak transition events, and the
//! aggregate snapshot published to downstream consumers.

mod event;
mod period;
mod reading;
mod snapshot;

pub use event::{LeakEvent, LeakEventKind};
pub use period::{PeriodKind, PeriodValues, ResetTimestamps};
pub use reading::{DeviceReading, FlowExtremes, Sample};
pub use snapshot::WaterSnapshot;
