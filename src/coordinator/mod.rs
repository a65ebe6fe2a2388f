//! Tick orchestration for the water monitor.
//!
//! [`WaterMonitor`] is the per-tick aggregation core, [`LeakDetector`]
//! its hysteresis state machine, and [`ProcessingLoop`] the service
//! loop wiring sources, driver, persistence, and notifications
//! together.

#[allow(clippy::module_inception)]
mod coordinator;
mod leak;
mod processing_loop;

pub use coordinator::{MonitorStats, WaterMonitor};
pub use leak::LeakDetector;
pub use processing_loop::ProcessingLoop;
