use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use im::OrdMap;
use tokio::sync::RwLock;

use super::{Column, ColumnOp, ColumnStore, ConsistencyLevel, MutationBatch, RowKey};
use crate::core::Result;

#[derive(Debug, Clone)]
struct Cell {
    value: Vec<u8>,
    expires_at: Option<DateTime<Utc>>,
}

impl Cell {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process ColumnStore
///
/// Reference implementation of the adapter contract, used as the default
/// backend and as the store in tests. Rows hold ordered column maps; TTL
/// expiry is lazy: expired cells are skipped by reads and overwritten by
/// writes. Consistency levels are accepted and ignored, since a single
/// process has nothing to tune.
pub struct MemoryColumnStore {
    rows: RwLock<HashMap<RowKey, OrdMap<Vec<u8>, Cell>>>,
}

impl MemoryColumnStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    fn apply(rows: &mut HashMap<RowKey, OrdMap<Vec<u8>, Cell>>, op: ColumnOp, now: DateTime<Utc>) {
        match op {
            ColumnOp::Put { row, column } => {
                let expires_at = column
                    .ttl
                    .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
                    .map(|ttl| now + ttl);
                let cell = Cell {
                    value: column.value,
                    expires_at,
                };
                rows.entry(row).or_default().insert(column.name, cell);
            }
            ColumnOp::Delete { row, name } => {
                if let Some(columns) = rows.get_mut(&row) {
                    columns.remove(&name);
                    if columns.is_empty() {
                        rows.remove(&row);
                    }
                }
            }
        }
    }

    /// Number of live columns in a row (for tests and diagnostics)
    pub async fn column_count(&self, row: &RowKey) -> usize {
        let now = Utc::now();
        let rows = self.rows.read().await;
        rows.get(row)
            .map(|columns| columns.values().filter(|cell| cell.is_live(now)).count())
            .unwrap_or(0)
    }

    /// Value of one live column, if present (for tests and diagnostics)
    pub async fn get_column(&self, row: &RowKey, name: &[u8]) -> Option<Vec<u8>> {
        let now = Utc::now();
        let rows = self.rows.read().await;
        rows.get(row)
            .and_then(|columns| columns.get(name))
            .filter(|cell| cell.is_live(now))
            .map(|cell| cell.value.clone())
    }
}

impl Default for MemoryColumnStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ColumnStore for MemoryColumnStore {
    async fn write_column(
        &self,
        row: &RowKey,
        column: Column,
        _consistency: ConsistencyLevel,
    ) -> Result<()> {
        let mut rows = self.rows.write().await;
        Self::apply(
            &mut rows,
            ColumnOp::Put {
                row: row.clone(),
                column,
            },
            Utc::now(),
        );
        Ok(())
    }

    async fn read_top_columns(
        &self,
        row: &RowKey,
        limit: usize,
        _consistency: ConsistencyLevel,
    ) -> Result<Vec<Column>> {
        let now = Utc::now();
        let rows = self.rows.read().await;
        let Some(columns) = rows.get(row) else {
            return Ok(Vec::new());
        };

        Ok(columns
            .iter()
            .filter(|(_, cell)| cell.is_live(now))
            .take(limit)
            .map(|(name, cell)| Column::new(name.clone(), cell.value.clone()))
            .collect())
    }

    async fn delete_column(
        &self,
        row: &RowKey,
        name: &[u8],
        _consistency: ConsistencyLevel,
    ) -> Result<()> {
        let mut rows = self.rows.write().await;
        Self::apply(
            &mut rows,
            ColumnOp::Delete {
                row: row.clone(),
                name: name.to_vec(),
            },
            Utc::now(),
        );
        Ok(())
    }

    async fn batch_mutate(
        &self,
        batch: MutationBatch,
        _consistency: ConsistencyLevel,
    ) -> Result<()> {
        let now = Utc::now();
        // One write guard for the whole batch: all ops land or none are seen
        let mut rows = self.rows.write().await;
        for op in batch.into_ops() {
            Self::apply(&mut rows, op, now);
        }
        Ok(())
    }
}
