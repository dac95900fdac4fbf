// ============================================================================
// Version Lifecycle Notifier
// ============================================================================
//
// Decouples the write pipeline from secondary-index maintenance. The index
// collaborator only ever hears two things: a new version is durable (drop
// index entries for everything older), and a set of versions was physically
// purged (drop index entries for exactly that set).
//
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::core::{Entity, EntityId, Result, Scope, StoreConfig, Ticket};
use crate::mvcc::log::MvccLogReader;
use crate::store::ColumnStore;

/// How deep version_created looks for stale committed versions. Cleanup runs
/// after every commit, so the backlog beyond the newest version stays small;
/// anything missed converges on the next commit.
const PRIOR_VERSION_WINDOW: usize = 256;

/// The indexing collaborator's obligation
#[async_trait]
pub trait IndexMaintainer: Send + Sync {
    async fn remove_from_index(&self, scope: &Scope, id: &EntityId, version: Ticket) -> Result<()>;
}

/// An IndexMaintainer that maintains nothing
///
/// For callers without a secondary index, and for wiring examples.
pub struct NullIndexMaintainer;

#[async_trait]
impl IndexMaintainer for NullIndexMaintainer {
    async fn remove_from_index(
        &self,
        _scope: &Scope,
        _id: &EntityId,
        _version: Ticket,
    ) -> Result<()> {
        Ok(())
    }
}

/// Fires version lifecycle events toward the index collaborator
pub struct LifecycleNotifier {
    index: Arc<dyn IndexMaintainer>,
    log: MvccLogReader,
    config: StoreConfig,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl LifecycleNotifier {
    pub fn new(
        index: Arc<dyn IndexMaintainer>,
        store: Arc<dyn ColumnStore>,
        config: StoreConfig,
    ) -> Self {
        Self {
            index,
            log: MvccLogReader::new(store, config.clone()),
            config,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// A new version is durable: trim the index to the single newest version
    ///
    /// The write is already committed when this runs, so index failures are
    /// logged rather than surfaced; this is the documented eventual-consistency
    /// window, closed by the next commit's cleanup. Skipped entirely when
    /// stale-version cleanup is disabled.
    pub async fn version_created(&self, scope: &Scope, entity: &Entity) {
        if !self.config.cleanup.enabled {
            return;
        }
        let (Some(id), Some(version)) = (entity.id(), entity.version()) else {
            return;
        };

        match self
            .log
            .committed_versions(scope, &id, PRIOR_VERSION_WINDOW)
            .await
        {
            Ok(versions) => {
                for stale in versions.into_iter().filter(|v| *v < version) {
                    if let Err(err) = self.index.remove_from_index(scope, &id, stale).await {
                        warn!("index cleanup of {} version {} failed: {}", id, stale, err);
                    }
                }
            }
            Err(err) => warn!("could not list prior versions of {}: {}", id, err),
        }
    }

    /// Versions were physically purged: remove their index entries
    ///
    /// The list is cut into bounded buffers, each dispatched to a background
    /// task, so compacting an identity with a deep history neither blocks
    /// the caller nor lands one oversized batch on the index collaborator.
    pub async fn versions_deleted(&self, scope: &Scope, id: &EntityId, versions: Vec<Ticket>) {
        if versions.is_empty() {
            return;
        }

        let buffer_size = self.config.cleanup.buffer_size.max(1);
        let mut tasks = self.tasks.lock().await;
        for chunk in versions.chunks(buffer_size) {
            let index = Arc::clone(&self.index);
            let scope = scope.clone();
            let id = id.clone();
            let chunk = chunk.to_vec();
            tasks.push(tokio::spawn(async move {
                for version in chunk {
                    if let Err(err) = index.remove_from_index(&scope, &id, version).await {
                        warn!("index purge of {} version {} failed: {}", id, version, err);
                    }
                }
            }));
        }
    }

    /// Await every outstanding cleanup buffer
    pub async fn quiesce(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().await;
            tasks.drain(..).collect()
        };
        join_all(handles).await;
    }
}
