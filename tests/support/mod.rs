#![allow(dead_code)]

//! Shared fixtures for the integration suite.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use widerow::{
    Column, ColumnOp, ColumnStore, ConsistencyLevel, Entity, EntityId, EntityStore,
    IndexMaintainer, MemoryColumnStore, MutationBatch, Result, RowKey, Scope, StoreConfig,
    StoreError, Ticket,
};

/// IndexMaintainer that records every removal it is asked to perform
pub struct RecordingIndex {
    removed: Mutex<Vec<(EntityId, Ticket)>>,
}

impl RecordingIndex {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            removed: Mutex::new(Vec::new()),
        })
    }

    pub async fn removed(&self) -> Vec<(EntityId, Ticket)> {
        self.removed.lock().await.clone()
    }

    pub async fn removed_versions(&self, id: &EntityId) -> Vec<Ticket> {
        self.removed
            .lock()
            .await
            .iter()
            .filter(|(removed_id, _)| removed_id == id)
            .map(|(_, version)| *version)
            .collect()
    }
}

#[async_trait]
impl IndexMaintainer for RecordingIndex {
    async fn remove_from_index(&self, _scope: &Scope, id: &EntityId, version: Ticket) -> Result<()> {
        self.removed.lock().await.push((id.clone(), version));
        Ok(())
    }
}

/// IndexMaintainer whose removals always fail
pub struct FailingIndex;

#[async_trait]
impl IndexMaintainer for FailingIndex {
    async fn remove_from_index(
        &self,
        _scope: &Scope,
        _id: &EntityId,
        _version: Ticket,
    ) -> Result<()> {
        Err(StoreError::Connection("index collaborator unreachable".into()))
    }
}

/// ColumnStore that refuses every operation, simulating a store outage
pub struct FailingStore;

#[async_trait]
impl ColumnStore for FailingStore {
    async fn write_column(
        &self,
        _row: &RowKey,
        _column: Column,
        _consistency: ConsistencyLevel,
    ) -> Result<()> {
        Err(StoreError::Connection("store unreachable".into()))
    }

    async fn read_top_columns(
        &self,
        _row: &RowKey,
        _limit: usize,
        _consistency: ConsistencyLevel,
    ) -> Result<Vec<Column>> {
        Err(StoreError::Connection("store unreachable".into()))
    }

    async fn delete_column(
        &self,
        _row: &RowKey,
        _name: &[u8],
        _consistency: ConsistencyLevel,
    ) -> Result<()> {
        Err(StoreError::Connection("store unreachable".into()))
    }

    async fn batch_mutate(
        &self,
        _batch: MutationBatch,
        _consistency: ConsistencyLevel,
    ) -> Result<()> {
        Err(StoreError::Connection("store unreachable".into()))
    }
}

/// ColumnStore wrapper recording the delete-op count of every batch, for
/// asserting that compaction never issues an unbounded mutation
pub struct CountingStore {
    inner: MemoryColumnStore,
    delete_batches: Mutex<Vec<usize>>,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryColumnStore::new(),
            delete_batches: Mutex::new(Vec::new()),
        })
    }

    /// Delete-op counts of every batch that contained at least one delete
    pub async fn delete_batches(&self) -> Vec<usize> {
        self.delete_batches.lock().await.clone()
    }
}

#[async_trait]
impl ColumnStore for CountingStore {
    async fn write_column(
        &self,
        row: &RowKey,
        column: Column,
        consistency: ConsistencyLevel,
    ) -> Result<()> {
        self.inner.write_column(row, column, consistency).await
    }

    async fn read_top_columns(
        &self,
        row: &RowKey,
        limit: usize,
        consistency: ConsistencyLevel,
    ) -> Result<Vec<Column>> {
        self.inner.read_top_columns(row, limit, consistency).await
    }

    async fn delete_column(
        &self,
        row: &RowKey,
        name: &[u8],
        consistency: ConsistencyLevel,
    ) -> Result<()> {
        self.inner.delete_column(row, name, consistency).await
    }

    async fn batch_mutate(&self, batch: MutationBatch, consistency: ConsistencyLevel) -> Result<()> {
        let deletes = batch
            .ops()
            .iter()
            .filter(|op| matches!(op, ColumnOp::Delete { .. }))
            .count();
        if deletes > 0 {
            self.delete_batches.lock().await.push(deletes);
        }
        self.inner.batch_mutate(batch, consistency).await
    }
}

/// A store, a recording index, and an EntityStore wired over both
pub fn harness() -> (Arc<MemoryColumnStore>, Arc<RecordingIndex>, EntityStore) {
    harness_with(StoreConfig::new())
}

pub fn harness_with(
    config: StoreConfig,
) -> (Arc<MemoryColumnStore>, Arc<RecordingIndex>, EntityStore) {
    let store = Arc::new(MemoryColumnStore::new());
    let index = RecordingIndex::new();
    let entity_store = EntityStore::new(store.clone(), index.clone(), config);
    (store, index, entity_store)
}

pub fn scope() -> Scope {
    Scope::new(Uuid::new_v4(), "library")
}

pub fn book(title: &str) -> Entity {
    Entity::new("book", json!({ "title": title }))
}
