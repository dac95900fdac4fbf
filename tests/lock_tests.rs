/// Distributed lock tests
///
/// Covers uncontended acquisition, the ack protocol between the two lowest
/// proposals, TTL self-healing, bounded polling, and failure propagation.
/// Run with: cargo test --test lock_tests

mod support;

use std::sync::Arc;
use std::time::Duration;

use support::{scope, FailingStore};

use widerow::core::LockConfig;
use widerow::{
    ColumnStore, ConsistencyLevel, LockId, LockManager, MemoryColumnStore, StoreError,
    VersionClock,
};

fn fast_config() -> LockConfig {
    LockConfig {
        poll_interval: Duration::from_millis(20),
        max_polls: 50,
        consistency: ConsistencyLevel::Quorum,
    }
}

fn manager(store: Arc<MemoryColumnStore>) -> LockManager {
    LockManager::new(store, Arc::new(VersionClock::new()), fast_config())
}

fn lock_id() -> LockId {
    LockId::new(scope(), "shard-7-compaction")
}

#[tokio::test]
async fn test_uncontended_acquire_and_unlock() {
    let store = Arc::new(MemoryColumnStore::new());
    let manager = manager(store.clone());
    let id = lock_id();

    let mut lock = manager.lock(id.clone());
    assert!(lock.try_lock(Duration::from_secs(5)).await.unwrap());
    assert!(lock.is_held());
    assert_eq!(store.column_count(&id.row_key()).await, 1);

    lock.unlock().await.unwrap();
    assert!(!lock.is_held());
    assert_eq!(store.column_count(&id.row_key()).await, 0);
}

#[tokio::test]
async fn test_loser_fails_fast_and_acks_the_leader() {
    let store = Arc::new(MemoryColumnStore::new());
    let manager = manager(store.clone());
    let id = lock_id();

    let mut first = manager.lock(id.clone());
    assert!(first.try_lock(Duration::from_secs(5)).await.unwrap());
    let leader_ticket = first.ticket().unwrap();

    let mut second = manager.lock(id.clone());
    assert!(!second.try_lock(Duration::from_secs(5)).await.unwrap());
    assert!(!second.is_held());

    // The loser left its proposal behind, carrying the leader's ticket as
    // its acknowledgement value
    let columns = store
        .read_top_columns(&id.row_key(), 2, ConsistencyLevel::Quorum)
        .await
        .unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].name, leader_ticket.as_bytes().to_vec());
    assert_eq!(columns[1].value, leader_ticket.as_bytes().to_vec());
}

#[tokio::test]
async fn test_mutual_exclusion_until_release() {
    let store = Arc::new(MemoryColumnStore::new());
    let manager = manager(store.clone());
    let id = lock_id();

    let mut first = manager.lock(id.clone());
    assert!(first.try_lock(Duration::from_secs(5)).await.unwrap());

    // The loser's abandoned proposal outlives its attempt only for its TTL
    let mut second = manager.lock(id.clone());
    assert!(!second.try_lock(Duration::from_millis(100)).await.unwrap());

    first.unlock().await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let mut third = manager.lock(id.clone());
    assert!(third.try_lock(Duration::from_secs(5)).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_proposers_admit_at_most_one_holder() {
    let store = Arc::new(MemoryColumnStore::new());
    let manager = manager(store.clone());
    let id = lock_id();

    let mut a = manager.lock(id.clone());
    let mut b = manager.lock(id.clone());

    let (ra, rb) = tokio::join!(
        a.try_lock(Duration::from_secs(5)),
        b.try_lock(Duration::from_secs(5)),
    );
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    assert!(!(ra && rb), "both proposers claimed the lock");
    assert!(ra || rb, "the race resolved to no holder at all");
}

#[tokio::test]
async fn test_leader_polls_until_successor_acks() {
    let store = Arc::new(MemoryColumnStore::new());
    let manager = manager(store.clone());
    let id = lock_id();
    let row = id.row_key();

    // A proposal that will sort after any real ticket, never acking
    let fake_second = widerow::Column::new(vec![0xFFu8; 16], Vec::new());
    store
        .write_column(&row, fake_second, ConsistencyLevel::Quorum)
        .await
        .unwrap();

    let mut lock = manager.lock(id.clone());
    let attempt = tokio::spawn(async move {
        let acquired = lock.try_lock(Duration::from_secs(5)).await.unwrap();
        (lock, acquired)
    });

    // While the leader polls, the fake successor writes its ack: the
    // leader's own ticket is the smallest column in the row
    tokio::time::sleep(Duration::from_millis(60)).await;
    let columns = store
        .read_top_columns(&row, 1, ConsistencyLevel::Quorum)
        .await
        .unwrap();
    let leader_bytes = columns[0].name.clone();
    let ack = widerow::Column::new(vec![0xFFu8; 16], leader_bytes);
    store
        .write_column(&row, ack, ConsistencyLevel::Quorum)
        .await
        .unwrap();

    let (lock, acquired) = attempt.await.unwrap();
    assert!(acquired, "the ack must resolve the leader's claim");
    assert!(lock.is_held());
}

#[tokio::test]
async fn test_poll_exhaustion_cleans_up_own_proposal() {
    let store = Arc::new(MemoryColumnStore::new());
    let config = LockConfig {
        poll_interval: Duration::from_millis(10),
        max_polls: 3,
        consistency: ConsistencyLevel::Quorum,
    };
    let manager = LockManager::new(store.clone(), Arc::new(VersionClock::new()), config);
    let id = lock_id();
    let row = id.row_key();

    // A silent successor that never acks and never expires within the test
    let fake_second = widerow::Column::new(vec![0xFFu8; 16], Vec::new());
    store
        .write_column(&row, fake_second, ConsistencyLevel::Quorum)
        .await
        .unwrap();

    let mut lock = manager.lock(id.clone());
    assert!(!lock.try_lock(Duration::from_secs(5)).await.unwrap());
    assert!(!lock.is_held());

    // The attempt deleted its own column; only the silent successor remains
    let columns = store
        .read_top_columns(&row, 10, ConsistencyLevel::Quorum)
        .await
        .unwrap();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].name, vec![0xFFu8; 16]);
}

#[tokio::test]
async fn test_abandoned_lock_self_heals_after_ttl() {
    let store = Arc::new(MemoryColumnStore::new());
    let manager = manager(store.clone());
    let id = lock_id();

    {
        let mut holder = manager.lock(id.clone());
        assert!(holder.try_lock(Duration::from_millis(80)).await.unwrap());
        // Crashed holder: never unlocks
    }

    tokio::time::sleep(Duration::from_millis(150)).await;

    let mut successor = manager.lock(id.clone());
    assert!(successor.try_lock(Duration::from_secs(5)).await.unwrap());
}

#[tokio::test]
async fn test_unlock_without_a_held_lock_is_an_error() {
    let manager = manager(Arc::new(MemoryColumnStore::new()));
    let mut lock = manager.lock(lock_id());

    let err = lock.unlock().await.unwrap_err();
    assert!(matches!(err, StoreError::Lock(_)));
}

#[tokio::test]
async fn test_store_outage_is_an_error_not_a_lost_race() {
    let manager = LockManager::new(
        Arc::new(FailingStore),
        Arc::new(VersionClock::new()),
        fast_config(),
    );
    let mut lock = manager.lock(lock_id());

    let err = lock.try_lock(Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, StoreError::Connection(_)));
}
