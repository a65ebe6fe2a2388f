//! Droplet Water Monitor
//!
//! Stateful aggregation core for the Droplet water-flow sensor.
//!
//! ## Architecture
//!
//! - **Water Monitor**: per-tick coordinator owning baselines, sample
//!   buffers, and the leak detector
//! - **Periods**: pure boundary calculations (hour/day/ISO-week/month/year)
//! - **Stats**: windowed average/min/max over bounded sample buffers
//! - **Device**: flow meter collaborator trait + reading sources
//! - **Storage**: crash-safe state snapshot persistence

pub mod config;
pub mod coordinator;
pub mod device;
pub mod notify;
pub mod periods;
pub mod stats;
pub mod storage;
pub mod types;

// Re-export the monitor core
pub use coordinator::{LeakDetector, MonitorStats, ProcessingLoop, WaterMonitor};

// Re-export collaborator contracts
pub use device::{DropletDriver, FlowMeter, ReadingEvent, ReadingSource, SimulatedSource, StdinSource};
pub use notify::{LogSink, NotificationSink};
pub use storage::{MemoryStore, SledStore, SnapshotStore, StateSnapshot, StorageError};

// Re-export commonly used types
pub use types::{
    DeviceReading, FlowExtremes, LeakEvent, LeakEventKind, PeriodKind, PeriodValues,
    ResetTimestamps, Sample, WaterSnapshot,
};

// Re-export configuration
pub use config::MonitorConfig;
