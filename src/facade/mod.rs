use std::sync::Arc;

use crate::core::{Entity, EntityId, Result, Scope, StoreConfig, Ticket, VersionClock};
use crate::lock::{LockId, LockManager, TicketLock};
use crate::mvcc::stages::WriteVerifier;
use crate::mvcc::WritePipeline;
use crate::notify::{IndexMaintainer, LifecycleNotifier};
use crate::store::memory::MemoryColumnStore;
use crate::store::ColumnStore;

/// One handle over the whole consistency core
///
/// Wires the column store, version clock, lifecycle notifier, write
/// pipeline, and lock manager together. This is the recommended entry point
/// for callers that don't need to assemble the pieces themselves.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use uuid::Uuid;
/// use widerow::{Entity, EntityStore, NullIndexMaintainer, Scope, StoreConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> widerow::Result<()> {
/// let store = EntityStore::in_memory(Arc::new(NullIndexMaintainer), StoreConfig::new());
/// let scope = Scope::new(Uuid::new_v4(), "books");
///
/// let created = store.create(&scope, Entity::new("book", json!({"title": "Dune"}))).await?;
/// let id = created.id().unwrap();
///
/// let current = store.load(&scope, &id).await?;
/// assert_eq!(current.as_ref().and_then(|e| e.version()), created.version());
/// # Ok(())
/// # }
/// ```
pub struct EntityStore {
    pipeline: WritePipeline,
    locks: LockManager,
    store: Arc<dyn ColumnStore>,
    config: StoreConfig,
}

impl EntityStore {
    /// Assemble the core over any ColumnStore implementation
    pub fn new(
        store: Arc<dyn ColumnStore>,
        index: Arc<dyn IndexMaintainer>,
        config: StoreConfig,
    ) -> Self {
        let clock = Arc::new(VersionClock::new());
        let notifier = Arc::new(LifecycleNotifier::new(
            index,
            Arc::clone(&store),
            config.clone(),
        ));
        let pipeline = WritePipeline::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            notifier,
            config.clone(),
        );
        let locks = LockManager::new(Arc::clone(&store), clock, config.lock.clone());

        Self {
            pipeline,
            locks,
            store,
            config,
        }
    }

    /// Assemble the core over an in-process MemoryColumnStore
    pub fn in_memory(index: Arc<dyn IndexMaintainer>, config: StoreConfig) -> Self {
        Self::new(Arc::new(MemoryColumnStore::new()), index, config)
    }

    /// Register a write-verification hook
    pub fn with_verifier(mut self, verifier: Arc<dyn WriteVerifier>) -> Self {
        self.pipeline = self.pipeline.with_verifier(verifier);
        self
    }

    pub async fn create(&self, scope: &Scope, entity: Entity) -> Result<Entity> {
        self.pipeline.create(scope, entity).await
    }

    pub async fn update(&self, scope: &Scope, entity: Entity) -> Result<Entity> {
        self.pipeline.update(scope, entity).await
    }

    pub async fn delete(&self, scope: &Scope, id: &EntityId) -> Result<()> {
        self.pipeline.delete(scope, id).await
    }

    pub async fn load(&self, scope: &Scope, id: &EntityId) -> Result<Option<Entity>> {
        self.pipeline.load(scope, id).await
    }

    pub async fn compact(&self, scope: &Scope, id: &EntityId) -> Result<Vec<Ticket>> {
        self.pipeline.compact(scope, id).await
    }

    /// A fresh proposer handle for one lock domain
    pub fn lock(&self, id: LockId) -> TicketLock {
        self.locks.lock(id)
    }

    /// Await background compactions and buffered index cleanup
    pub async fn quiesce(&self) {
        self.pipeline.quiesce().await
    }

    /// The underlying column store
    pub fn column_store(&self) -> &Arc<dyn ColumnStore> {
        &self.store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}
