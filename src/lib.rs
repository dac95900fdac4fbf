// ============================================================================
// widerow Library
// ============================================================================

//! Consistency core for a multi-tenant entity platform over a wide-column
//! store: a multi-version (MVCC) entity write pipeline with staged
//! durability and asynchronous version cleanup, and a cross-region
//! distributed lock built from time-ordered ticket proposals in the same
//! store. Both components derive their ordering and mutual-exclusion
//! guarantees from nothing but per-column writes, ascending top-N reads,
//! and per-column TTL, the [`store::ColumnStore`] contract.

pub mod core;
pub mod facade;
pub mod lock;
pub mod mvcc;
pub mod notify;
pub mod store;

// Re-export main types for convenience
pub use core::{Entity, EntityId, Result, Scope, StoreConfig, StoreError, Ticket, VersionClock};
pub use facade::EntityStore;
pub use lock::{LockCandidate, LockId, LockManager, LockOutcome, TicketLock};
pub use mvcc::{LogStage, MvccEntity, MvccLogEntry, MvccLogReader, WritePipeline, WriteVerifier};
pub use notify::{IndexMaintainer, LifecycleNotifier, NullIndexMaintainer};
pub use store::memory::MemoryColumnStore;
pub use store::{Column, ColumnOp, ColumnStore, ConsistencyLevel, MutationBatch, RowKey};
