//! Row and column layout of the MVCC store.
//!
//! Entity and log rows are keyed per scope and identity. Version columns use
//! a descending encoding (the bitwise complement of the ticket bytes) so
//! the adapter's ascending top-N read returns the newest version first. Log
//! columns additionally suffix a stage byte, letting the Active and
//! Committed entries of one version coexist and letting either be rewritten
//! idempotently.

use crate::core::{EntityId, Scope, Ticket};
use crate::store::RowKey;

use super::entity::LogStage;

const STAGE_ACTIVE: u8 = 0;
const STAGE_COMMITTED: u8 = 1;

/// Row holding one column per committed version payload
pub fn entity_row(scope: &Scope, id: &EntityId) -> RowKey {
    RowKey::new(format!(
        "ent:{}:{}:{}:{}",
        scope.application, scope.name, id.kind, id.uuid
    ))
}

/// Row holding the write log for one identity
pub fn log_row(scope: &Scope, id: &EntityId) -> RowKey {
    RowKey::new(format!(
        "log:{}:{}:{}:{}",
        scope.application, scope.name, id.kind, id.uuid
    ))
}

/// Column key of a version payload: descending-encoded ticket
pub fn version_column(version: Ticket) -> Vec<u8> {
    version.as_bytes().iter().map(|byte| !byte).collect()
}

/// Column key of a log entry: descending-encoded ticket plus stage byte
pub fn log_column(version: Ticket, stage: LogStage) -> Vec<u8> {
    let mut key = version_column(version);
    key.push(match stage {
        LogStage::Active => STAGE_ACTIVE,
        LogStage::Committed => STAGE_COMMITTED,
    });
    key
}
