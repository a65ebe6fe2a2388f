//! State snapshot persistence.
//!
//! Abstracts durable storage of the monitor's restart-surviving state
//! so backends can be swapped without touching coordinator code:
//! - [`SledStore`]: embedded sled database, the production backend
//! - [`MemoryStore`]: in-memory store for tests and ephemeral runs

mod snapshot;
mod store;

pub use snapshot::StateSnapshot;
pub use store::{MemoryStore, SledStore, SnapshotStore, StorageError};
