//! Pluggable snapshot storage backends.

use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::warn;

use super::StateSnapshot;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Trait for durable snapshot storage, scoped to one device.
///
/// `save` overwrites the previous snapshot (idempotent overwrite, not
/// append). `load` returns `None` on first run; a corrupt stored value
/// also yields `None` (fail soft) rather than an error, so startup
/// never aborts on bad data.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, snapshot: &StateSnapshot) -> Result<(), StorageError>;

    async fn load(&self) -> Result<Option<StateSnapshot>, StorageError>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}

// ============================================================================
// Sled backend
// ============================================================================

/// Sled-backed snapshot store.
///
/// One JSON value under a fixed per-device key. Writes flush before
/// returning so a completed save survives an immediate crash.
#[derive(Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
    key: String,
}

impl SledStore {
    /// Open or create the state database at `path`, scoped to
    /// `device_id`.
    pub fn open<P: AsRef<Path>>(path: P, device_id: &str) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self::from_db(db, device_id))
    }

    /// Wrap an already opened database (tests, shared databases).
    pub fn from_db(db: sled::Db, device_id: &str) -> Self {
        Self {
            db: Arc::new(db),
            key: format!("state/{device_id}"),
        }
    }

    /// Storage key for this device's snapshot.
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl SnapshotStore for SledStore {
    async fn save(&self, snapshot: &StateSnapshot) -> Result<(), StorageError> {
        let value = serde_json::to_vec(snapshot)?;
        self.db.insert(self.key.as_bytes(), value)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<StateSnapshot>, StorageError> {
        let Some(value) = self.db.get(self.key.as_bytes())? else {
            return Ok(None);
        };
        match serde_json::from_slice::<StateSnapshot>(&value) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Stored snapshot is corrupt — starting from zero");
                Ok(None)
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-memory store for tests and ephemeral deployments.
///
/// Thread-safe via `RwLock`. Not durable — data lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: RwLock<Option<StateSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn save(&self, snapshot: &StateSnapshot) -> Result<(), StorageError> {
        let mut slot = self
            .slot
            .write()
            .map_err(|e| StorageError::Storage(e.to_string()))?;
        *slot = Some(snapshot.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<StateSnapshot>, StorageError> {
        let slot = self
            .slot
            .read()
            .map_err(|e| StorageError::Storage(e.to_string()))?;
        Ok(slot.clone())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PeriodKind;
    use chrono::{TimeZone, Utc};

    fn sample_snapshot() -> StateSnapshot {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().unwrap();
        let mut snapshot = StateSnapshot::zero(now);
        snapshot.baselines.set(PeriodKind::Lifetime, 8500.5);
        snapshot.baselines.set(PeriodKind::Daily, 123.4);
        snapshot.water_leak_detected = true;
        snapshot
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());

        let snapshot = sample_snapshot();
        store.save(&snapshot).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn memory_store_save_overwrites() {
        let store = MemoryStore::new();
        store.save(&sample_snapshot()).await.unwrap();

        let mut second = sample_snapshot();
        second.baselines.set(PeriodKind::Daily, 999.0);
        store.save(&second).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.baselines.get(PeriodKind::Daily), 999.0);
    }

    #[tokio::test]
    async fn trait_object_usable() {
        let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
        assert_eq!(store.backend_name(), "memory");
        store.save(&sample_snapshot()).await.unwrap();
        assert!(store.load().await.unwrap().is_some());
    }
}
