use std::sync::Arc;

use tracing::warn;

use crate::core::{EntityId, Result, Scope, StoreConfig, StoreError, Ticket};
use crate::store::ColumnStore;

use super::entity::MvccLogEntry;
use super::keys;

/// Widening-scan ceiling for committed-entry resolution. A log whose top
/// entries are all uncommitted residue this deep is pathological; the scan
/// gives up rather than read the row unboundedly.
const MAX_SCAN: usize = 1024;

/// Read side of the write log
///
/// Shared by entity loads, compaction, and index cleanup. All scans return
/// entries newest first, courtesy of the descending column encoding.
#[derive(Clone)]
pub struct MvccLogReader {
    store: Arc<dyn ColumnStore>,
    config: StoreConfig,
}

impl MvccLogReader {
    pub fn new(store: Arc<dyn ColumnStore>, config: StoreConfig) -> Self {
        Self { store, config }
    }

    /// Up to `limit` log entries for one identity, newest first
    pub async fn entries(
        &self,
        scope: &Scope,
        id: &EntityId,
        limit: usize,
    ) -> Result<Vec<MvccLogEntry>> {
        let row = keys::log_row(scope, id);
        let columns = self
            .store
            .read_top_columns(&row, limit, self.config.read_consistency)
            .await?;

        columns
            .iter()
            .map(|column| {
                rmp_serde::from_slice(&column.value)
                    .map_err(|err| StoreError::Corrupt(format!("log entry for {id}: {err}")))
            })
            .collect()
    }

    /// The newest committed entry, or None if no version ever committed
    ///
    /// Active entries with no committed counterpart are crash residue of
    /// writes that never became visible; the scan widens past them.
    pub async fn newest_committed(
        &self,
        scope: &Scope,
        id: &EntityId,
    ) -> Result<Option<MvccLogEntry>> {
        let mut limit = 16;
        loop {
            let entries = self.entries(scope, id, limit).await?;
            if let Some(found) = entries.iter().find(|entry| entry.is_committed()) {
                return Ok(Some(found.clone()));
            }
            if entries.len() < limit {
                return Ok(None);
            }
            if limit >= MAX_SCAN {
                warn!("no committed entry in the top {} log entries of {}", limit, id);
                return Ok(None);
            }
            limit *= 4;
        }
    }

    /// Versions of committed writes (tombstones excluded), newest first
    pub async fn committed_versions(
        &self,
        scope: &Scope,
        id: &EntityId,
        limit: usize,
    ) -> Result<Vec<Ticket>> {
        Ok(self
            .entries(scope, id, limit)
            .await?
            .into_iter()
            .filter(|entry| entry.is_committed() && !entry.is_tombstone())
            .map(|entry| entry.version())
            .collect())
    }
}
