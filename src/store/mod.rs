// ============================================================================
// ColumnStore Adapter
// ============================================================================
//
// Narrow contract over the underlying wide-column store. Everything the MVCC
// pipeline and the distributed lock need reduces to four operations: TTL'd
// column upserts, top-N reads in ascending key order, column deletes, and
// all-or-nothing batches. Consistency is tunable per call.
//
// ============================================================================

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::Result;

/// Tunable read/write consistency, in the wide-column store's terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    One,
    LocalQuorum,
    Quorum,
    All,
}

impl Default for ConsistencyLevel {
    fn default() -> Self {
        ConsistencyLevel::LocalQuorum
    }
}

impl std::fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsistencyLevel::One => write!(f, "ONE"),
            ConsistencyLevel::LocalQuorum => write!(f, "LOCAL_QUORUM"),
            ConsistencyLevel::Quorum => write!(f, "QUORUM"),
            ConsistencyLevel::All => write!(f, "ALL"),
        }
    }
}

/// Key of one row in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey(String);

impl RowKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One column: opaque key and value bytes, with optional time-to-live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    pub ttl: Option<Duration>,
}

impl Column {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// One mutation inside a batch
#[derive(Debug, Clone)]
pub enum ColumnOp {
    Put { row: RowKey, column: Column },
    Delete { row: RowKey, name: Vec<u8> },
}

/// An ordered set of column mutations applied with all-or-nothing durability
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    ops: Vec<ColumnOp>,
}

impl MutationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(mut self, row: RowKey, column: Column) -> Self {
        self.ops.push(ColumnOp::Put { row, column });
        self
    }

    pub fn delete(mut self, row: RowKey, name: Vec<u8>) -> Self {
        self.ops.push(ColumnOp::Delete { row, name });
        self
    }

    pub fn ops(&self) -> &[ColumnOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<ColumnOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// The adapter contract consumed by the write pipeline and the lock
#[async_trait]
pub trait ColumnStore: Send + Sync {
    /// Upsert one column; last write wins. The column's `ttl` bounds its
    /// lifetime: the store expires it without any deleting writer.
    async fn write_column(
        &self,
        row: &RowKey,
        column: Column,
        consistency: ConsistencyLevel,
    ) -> Result<()>;

    /// Up to `limit` live columns of `row`, ascending by column key.
    /// Expired columns are skipped.
    async fn read_top_columns(
        &self,
        row: &RowKey,
        limit: usize,
        consistency: ConsistencyLevel,
    ) -> Result<Vec<Column>>;

    /// Remove one column.
    async fn delete_column(
        &self,
        row: &RowKey,
        name: &[u8],
        consistency: ConsistencyLevel,
    ) -> Result<()>;

    /// Apply every op in the batch with all-or-nothing durability.
    async fn batch_mutate(
        &self,
        batch: MutationBatch,
        consistency: ConsistencyLevel,
    ) -> Result<()>;
}
