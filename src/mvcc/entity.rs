// ============================================================================
// MVCC Ledger Types
// ============================================================================
//
// The durability ledger: a log entry exists in Active state the instant a
// write begins and is advanced to Committed only once the payload itself is
// durable. A payload is never readable without a Committed entry for its
// exact (id, version).
//
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::core::{Entity, EntityId, Ticket};

/// Durability stage of one log entry
///
/// ```text
/// Active ──commit──> Committed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogStage {
    /// The write has begun; the version is not yet readable
    Active,

    /// The payload (or tombstone) is durable; the version is readable
    Committed,
}

impl LogStage {
    pub fn is_committed(&self) -> bool {
        matches!(self, LogStage::Committed)
    }
}

impl std::fmt::Display for LogStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogStage::Active => write!(f, "ACTIVE"),
            LogStage::Committed => write!(f, "COMMITTED"),
        }
    }
}

/// One entry in the write log
///
/// `tombstone` distinguishes delete tickets from write tickets: a committed
/// tombstone removes the identity from the live set without touching the
/// historical payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MvccLogEntry {
    id: EntityId,
    version: Ticket,
    stage: LogStage,
    tombstone: bool,
}

impl MvccLogEntry {
    pub fn write_started(id: EntityId, version: Ticket) -> Self {
        Self {
            id,
            version,
            stage: LogStage::Active,
            tombstone: false,
        }
    }

    pub fn write_committed(id: EntityId, version: Ticket) -> Self {
        Self {
            id,
            version,
            stage: LogStage::Committed,
            tombstone: false,
        }
    }

    pub fn delete_started(id: EntityId, version: Ticket) -> Self {
        Self {
            id,
            version,
            stage: LogStage::Active,
            tombstone: true,
        }
    }

    pub fn delete_committed(id: EntityId, version: Ticket) -> Self {
        Self {
            id,
            version,
            stage: LogStage::Committed,
            tombstone: true,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn version(&self) -> Ticket {
        self.version
    }

    pub fn stage(&self) -> LogStage {
        self.stage
    }

    pub fn is_committed(&self) -> bool {
        self.stage.is_committed()
    }

    pub fn is_tombstone(&self) -> bool {
        self.tombstone
    }
}

/// An addressed version, with the payload once one has been attached
///
/// The payload is absent for log-only stages: the start of a delete records
/// a version that never carries an entity body.
#[derive(Debug, Clone, PartialEq)]
pub struct MvccEntity {
    id: EntityId,
    version: Ticket,
    entity: Option<Entity>,
}

impl MvccEntity {
    pub fn new(id: EntityId, version: Ticket) -> Self {
        Self {
            id,
            version,
            entity: None,
        }
    }

    pub fn with_entity(id: EntityId, version: Ticket, entity: Entity) -> Self {
        Self {
            id,
            version,
            entity: Some(entity),
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn version(&self) -> Ticket {
        self.version
    }

    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    pub fn into_entity(self) -> Option<Entity> {
        self.entity
    }
}
