//! Persistence Round-Trip Tests
//!
//! Exercises the sled-backed snapshot store against a temporary
//! directory: save/load fidelity, overwrite semantics, reopen after
//! drop, and fail-soft handling of corrupt stored data.

use chrono::{TimeZone, Utc};
use tempfile::tempdir;
use tokio_test::assert_ok;

use droplet_monitor::{PeriodKind, SledStore, SnapshotStore, StateSnapshot};

fn sample_snapshot() -> StateSnapshot {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 34, 56).single().unwrap();
    let mut snapshot = StateSnapshot::zero(now);
    snapshot.baselines.set(PeriodKind::Lifetime, 8500.5);
    snapshot.baselines.set(PeriodKind::Daily, 123.4);
    snapshot.baselines.set(PeriodKind::Hourly, 0.75);
    snapshot.water_leak_detected = true;
    snapshot
}

#[tokio::test]
async fn sled_round_trip_preserves_state() {
    let dir = tempdir().unwrap();
    let store = SledStore::open(dir.path().join("state.db"), "droplet-001").unwrap();

    assert!(store.load().await.unwrap().is_none(), "fresh store is empty");

    let snapshot = sample_snapshot();
    store.save(&snapshot).await.unwrap();

    let loaded = store.load().await.unwrap().expect("snapshot must exist");
    assert!((loaded.baselines.get(PeriodKind::Lifetime) - 8500.5).abs() < 1e-12);
    assert!((loaded.baselines.get(PeriodKind::Daily) - 123.4).abs() < 1e-12);
    assert!((loaded.baselines.get(PeriodKind::Hourly) - 0.75).abs() < 1e-12);
    assert!(loaded.water_leak_detected);
    assert_eq!(loaded.reset_timestamps, snapshot.reset_timestamps);
    assert_eq!(loaded.saved_at, snapshot.saved_at);
}

#[tokio::test]
async fn save_is_idempotent_overwrite() {
    let dir = tempdir().unwrap();
    let store = SledStore::open(dir.path().join("state.db"), "droplet-001").unwrap();

    assert_ok!(store.save(&sample_snapshot()).await);

    let mut second = sample_snapshot();
    second.baselines.set(PeriodKind::Daily, 456.0);
    second.water_leak_detected = false;
    assert_ok!(store.save(&second).await);
    assert_ok!(store.save(&second).await); // repeated save is safe

    let loaded = store.load().await.unwrap().unwrap();
    assert_eq!(loaded.baselines.get(PeriodKind::Daily), 456.0);
    assert!(!loaded.water_leak_detected);
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.db");

    {
        let store = SledStore::open(&path, "droplet-001").unwrap();
        store.save(&sample_snapshot()).await.unwrap();
    }

    let reopened = SledStore::open(&path, "droplet-001").unwrap();
    let loaded = reopened.load().await.unwrap().expect("state must survive reopen");
    assert!((loaded.baselines.get(PeriodKind::Lifetime) - 8500.5).abs() < 1e-12);
}

#[tokio::test]
async fn snapshots_are_scoped_per_device() {
    let dir = tempdir().unwrap();
    let db = sled::open(dir.path().join("state.db")).unwrap();

    let store_a = SledStore::from_db(db.clone(), "droplet-a");
    let store_b = SledStore::from_db(db, "droplet-b");

    store_a.save(&sample_snapshot()).await.unwrap();
    assert!(store_a.load().await.unwrap().is_some());
    assert!(store_b.load().await.unwrap().is_none());
}

#[tokio::test]
async fn corrupt_stored_value_fails_soft() {
    let dir = tempdir().unwrap();
    let db = sled::open(dir.path().join("state.db")).unwrap();
    let store = SledStore::from_db(db.clone(), "droplet-001");

    db.insert(store.key().as_bytes(), b"{not valid json".as_slice())
        .unwrap();

    // Corruption yields a clean first-run start, never an error.
    let loaded = store.load().await.unwrap();
    assert!(loaded.is_none());
}
