// ============================================================================
// Distributed Lock
// ============================================================================
//
// Mutual exclusion over a named key, across regions, built from nothing but
// ordered-column writes and per-column TTL. Every proposer appends a
// time-ordered ticket column to the lock's row; the smallest live ticket
// owns the lock once its immediate successor has acknowledged it. Reading
// only the two lowest tickets bounds the cost per poll regardless of
// contention: no proposer further back can threaten the leader until the
// first two slots resolve.
//
// ============================================================================

pub mod manager;

pub use manager::{LockManager, TicketLock};

use crate::core::{Result, Scope, StoreError, Ticket};
use crate::store::{Column, RowKey};

/// One mutual-exclusion domain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockId {
    pub scope: Scope,
    pub name: String,
}

impl LockId {
    pub fn new(scope: Scope, name: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }

    /// The row holding every outstanding proposal for this lock
    pub fn row_key(&self) -> RowKey {
        RowKey::new(format!(
            "lck:{}:{}:{}",
            self.scope.application, self.scope.name, self.name
        ))
    }
}

impl std::fmt::Display for LockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.scope, self.name)
    }
}

/// Snapshot of the two lowest outstanding proposals
///
/// The three-way distinction on the second slot is load-bearing: absent,
/// present but silent, and present having acked the leader are different
/// protocol states, and the leader may only claim the lock in the first and
/// last of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockCandidate {
    pub first: Ticket,
    pub second: Option<Ticket>,
    pub second_acked: Option<Ticket>,
}

impl LockCandidate {
    /// Parse the top-two read of a lock row; None if the row has no live
    /// proposals.
    pub(crate) fn from_columns(columns: &[Column]) -> Result<Option<Self>> {
        let Some(first) = columns.first() else {
            return Ok(None);
        };

        let first = ticket_from_column_name(&first.name)?;
        let (second, second_acked) = match columns.get(1) {
            Some(column) => {
                let ticket = ticket_from_column_name(&column.name)?;
                let acked = if column.value.is_empty() {
                    None
                } else {
                    Some(ticket_from_ack_value(&column.value)?)
                };
                (Some(ticket), acked)
            }
            None => (None, None),
        };

        Ok(Some(Self {
            first,
            second,
            second_acked,
        }))
    }

    /// Has the second proposal acknowledged the current first?
    pub fn first_is_acked(&self) -> bool {
        self.second_acked == Some(self.first)
    }

    /// The decision rule, from the point of view of `ticket`
    pub fn judge(&self, ticket: Ticket) -> LockOutcome {
        if self.first != ticket {
            return LockOutcome::Lost;
        }
        if self.second.is_none() {
            return LockOutcome::Acquired;
        }
        if self.first_is_acked() {
            return LockOutcome::Acquired;
        }
        // A second proposal exists and has not confirmed us as leader; it
        // may not have seen us yet. An ack naming an expired earlier leader
        // also lands here and resolves when that proposal expires.
        LockOutcome::Undecided
    }
}

/// Result of judging one poll of the lock row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    Acquired,
    Lost,
    Undecided,
}

fn ticket_from_column_name(name: &[u8]) -> Result<Ticket> {
    <[u8; 16]>::try_from(name)
        .map(Ticket::from_bytes)
        .map_err(|_| StoreError::Corrupt(format!("lock column key of {} bytes", name.len())))
}

fn ticket_from_ack_value(value: &[u8]) -> Result<Ticket> {
    <[u8; 16]>::try_from(value)
        .map(Ticket::from_bytes)
        .map_err(|_| StoreError::Corrupt(format!("lock ack value of {} bytes", value.len())))
}
