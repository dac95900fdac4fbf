use std::sync::Arc;

use tracing::debug;

use crate::core::{EntityId, Result, Scope, StoreConfig, StoreError, Ticket};
use crate::notify::LifecycleNotifier;
use crate::store::{ColumnStore, MutationBatch};

use super::keys;
use super::log::MvccLogReader;

/// Physical purge of superseded versions
///
/// Runs after delete commits and on demand. Everything strictly older than
/// the newest committed entry is removed, payload column and log entries
/// alike, in bounded batches rather than one unbounded mutation. The newest
/// committed entry itself is retained, tombstone included, so readers keep
/// resolving a deleted identity to "absent" rather than to a stale older
/// version.
#[derive(Clone)]
pub struct Compactor {
    store: Arc<dyn ColumnStore>,
    log: MvccLogReader,
    notifier: Arc<LifecycleNotifier>,
    config: StoreConfig,
}

impl Compactor {
    pub fn new(
        store: Arc<dyn ColumnStore>,
        log: MvccLogReader,
        notifier: Arc<LifecycleNotifier>,
        config: StoreConfig,
    ) -> Self {
        Self {
            store,
            log,
            notifier,
            config,
        }
    }

    /// Purge superseded versions of one identity; returns the purged set
    pub async fn compact(&self, scope: &Scope, id: &EntityId) -> Result<Vec<Ticket>> {
        let Some(current) = self.log.newest_committed(scope, id).await? else {
            return Ok(Vec::new());
        };
        let current_version = current.version();

        let entity_row = keys::entity_row(scope, id);
        let log_row = keys::log_row(scope, id);
        let batch_size = self.config.compaction.batch_size.max(1);
        let mut purged: Vec<Ticket> = Vec::new();

        loop {
            // Each version contributes at most an Active and a Committed
            // entry; two extra columns cover the current version's own pair.
            let window = batch_size * 2 + 2;
            let entries = self.log.entries(scope, id, window).await?;

            let mut versions: Vec<Ticket> = Vec::new();
            let mut batch = MutationBatch::new();
            for entry in &entries {
                if entry.version() >= current_version {
                    continue;
                }
                if !versions.contains(&entry.version()) {
                    if versions.len() == batch_size {
                        break;
                    }
                    versions.push(entry.version());
                    batch = batch.delete(entity_row.clone(), keys::version_column(entry.version()));
                }
                batch = batch.delete(log_row.clone(), keys::log_column(entry.version(), entry.stage()));
            }

            if versions.is_empty() {
                break;
            }

            self.store
                .batch_mutate(batch, self.config.write_consistency)
                .await
                .map_err(|err| StoreError::WriteFailure(format!("compaction for {id}: {err}")))?;

            debug!("compacted {} versions of {}", versions.len(), id);
            let done = versions.len() < batch_size;
            purged.extend(versions);
            if done {
                break;
            }
        }

        if !purged.is_empty() {
            self.notifier.versions_deleted(scope, id, purged.clone()).await;
        }
        Ok(purged)
    }
}
