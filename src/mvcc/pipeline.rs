// ============================================================================
// MVCC Write Pipeline
// ============================================================================

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::core::{Entity, EntityId, Result, Scope, StoreConfig, StoreError, Ticket, VersionClock};
use crate::notify::LifecycleNotifier;
use crate::store::ColumnStore;

use super::compaction::Compactor;
use super::keys;
use super::log::MvccLogReader;
use super::stages::{Create, MarkCommit, MarkStart, Update, WriteCommit, WriteStart, WriteVerifier, WriteVerify};

/// Entity-row columns read when resolving a load. The newest committed
/// payload is the top column unless commits raced the log read.
const LOAD_WINDOW: usize = 8;

/// Turns one logical entity mutation into the staged write sequence
///
/// Stages run sequentially for one write. Independent writes, including
/// racing updates to the same identity, run fully concurrently and are
/// disambiguated by their version tickets alone. Store errors abort the
/// current operation and propagate; retrying is the caller's decision and
/// always draws a fresh ticket.
pub struct WritePipeline {
    create_stage: Create,
    update_stage: Update,
    start_stage: WriteStart,
    verify_stage: WriteVerify,
    commit_stage: WriteCommit,
    mark_start_stage: MarkStart,
    mark_commit_stage: MarkCommit,
    log: MvccLogReader,
    compactor: Compactor,
    notifier: Arc<LifecycleNotifier>,
    store: Arc<dyn ColumnStore>,
    config: StoreConfig,
    compactions: Mutex<Vec<JoinHandle<()>>>,
}

impl WritePipeline {
    pub fn new(
        store: Arc<dyn ColumnStore>,
        clock: Arc<VersionClock>,
        notifier: Arc<LifecycleNotifier>,
        config: StoreConfig,
    ) -> Self {
        let log = MvccLogReader::new(Arc::clone(&store), config.clone());
        let compactor = Compactor::new(
            Arc::clone(&store),
            log.clone(),
            Arc::clone(&notifier),
            config.clone(),
        );

        Self {
            create_stage: Create::new(Arc::clone(&clock)),
            update_stage: Update::new(Arc::clone(&clock)),
            start_stage: WriteStart::new(Arc::clone(&store), config.clone()),
            verify_stage: WriteVerify::new(),
            commit_stage: WriteCommit::new(Arc::clone(&store), config.clone()),
            mark_start_stage: MarkStart::new(Arc::clone(&store), clock, config.clone()),
            mark_commit_stage: MarkCommit::new(Arc::clone(&store), config.clone()),
            log,
            compactor,
            notifier,
            store,
            config,
            compactions: Mutex::new(Vec::new()),
        }
    }

    /// Register a validation hook, run between start and commit
    pub fn with_verifier(mut self, verifier: Arc<dyn WriteVerifier>) -> Self {
        self.verify_stage.push(verifier);
        self
    }

    /// Persist a new entity; returns it with identity and version attached
    pub async fn create(&self, scope: &Scope, entity: Entity) -> Result<Entity> {
        let entity = self.create_stage.run(entity)?;
        let staged = self.start_stage.run(scope, entity).await?;
        self.verify_stage.run(scope, &staged).await?;
        let entity = self.commit_stage.run(scope, staged).await?;
        self.notifier.version_created(scope, &entity).await;
        Ok(entity)
    }

    /// Persist a new version of an existing entity
    ///
    /// The prior version's payload and log entries are left untouched until
    /// compaction; only the index converges on the newest version.
    pub async fn update(&self, scope: &Scope, entity: Entity) -> Result<Entity> {
        let entity = self.update_stage.run(entity)?;
        let staged = self.start_stage.run(scope, entity).await?;
        self.verify_stage.run(scope, &staged).await?;
        let entity = self.commit_stage.run(scope, staged).await?;
        self.notifier.version_created(scope, &entity).await;
        Ok(entity)
    }

    /// Remove an identity from the live set
    ///
    /// Mark-start and mark-commit mirror the write path's two stages.
    /// Physical purging runs asynchronously after the commit; `quiesce`
    /// awaits stragglers.
    pub async fn delete(&self, scope: &Scope, id: &EntityId) -> Result<()> {
        let staged = self.mark_start_stage.run(scope, id).await?;
        self.mark_commit_stage.run(scope, staged).await?;

        let compactor = self.compactor.clone();
        let scope = scope.clone();
        let id = id.clone();
        let handle = tokio::spawn(async move {
            if let Err(err) = compactor.compact(&scope, &id).await {
                warn!("background compaction for {} failed: {}", id, err);
            }
        });
        self.compactions.lock().await.push(handle);
        Ok(())
    }

    /// The current committed entity, or None
    ///
    /// The durability gate: a version is only readable through a Committed
    /// log entry. Active-only residue is invisible, and a committed
    /// tombstone resolves to None.
    pub async fn load(&self, scope: &Scope, id: &EntityId) -> Result<Option<Entity>> {
        let Some(newest) = self.log.newest_committed(scope, id).await? else {
            return Ok(None);
        };
        if newest.is_tombstone() {
            return Ok(None);
        }

        let row = keys::entity_row(scope, id);
        let wanted = keys::version_column(newest.version());
        let columns = self
            .store
            .read_top_columns(&row, LOAD_WINDOW, self.config.read_consistency)
            .await?;
        for column in columns {
            if column.name == wanted {
                let entity = rmp_serde::from_slice(&column.value).map_err(|err| {
                    StoreError::Corrupt(format!(
                        "payload of {} version {}: {}",
                        id,
                        newest.version(),
                        err
                    ))
                })?;
                return Ok(Some(entity));
            }
        }

        warn!("committed version {} of {} has no payload column", newest.version(), id);
        Ok(None)
    }

    /// Purge superseded versions now; returns the purged set
    pub async fn compact(&self, scope: &Scope, id: &EntityId) -> Result<Vec<Ticket>> {
        self.compactor.compact(scope, id).await
    }

    /// Log reader over this pipeline's store
    pub fn log(&self) -> &MvccLogReader {
        &self.log
    }

    /// Await background compactions and buffered index cleanup
    pub async fn quiesce(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut compactions = self.compactions.lock().await;
            compactions.drain(..).collect()
        };
        join_all(handles).await;
        self.notifier.quiesce().await;
    }
}
