// ============================================================================
// Write Pipeline Stages
// ============================================================================
//
// One logical mutation runs as a sequence of idempotent, independently
// durable stages. Each stage consumes the previous stage's typed output, so
// the ordering is checked at compile time. A crash between stages leaves a
// detectable state: an Active log entry with no Committed counterpart marks
// a version that was never visible and can be discarded.
//
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::core::{Entity, EntityId, Result, Scope, StoreConfig, StoreError, Ticket, VersionClock};
use crate::store::{Column, ColumnStore, MutationBatch};

use super::entity::{LogStage, MvccEntity, MvccLogEntry};
use super::keys;

fn encode_log_entry(entry: &MvccLogEntry) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec(entry)?)
}

fn encode_entity(entity: &Entity) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec(entity)?)
}

/// Assigns identity to a draft entity
pub struct Create {
    clock: Arc<VersionClock>,
}

impl Create {
    pub fn new(clock: Arc<VersionClock>) -> Self {
        Self { clock }
    }

    pub fn run(&self, entity: Entity) -> Result<Entity> {
        if entity.has_identity() {
            return Err(StoreError::InvalidState(format!(
                "create called on {} entity that already has an identity; use update",
                entity.kind()
            )));
        }

        let ticket = self.clock.next();
        Ok(entity.with_identity(ticket, Utc::now()))
    }
}

/// Assigns a fresh version to an existing entity
pub struct Update {
    clock: Arc<VersionClock>,
}

impl Update {
    pub fn new(clock: Arc<VersionClock>) -> Self {
        Self { clock }
    }

    pub fn run(&self, entity: Entity) -> Result<Entity> {
        if !entity.has_identity() {
            return Err(StoreError::InvalidState(format!(
                "update called on {} entity with no identity; use create",
                entity.kind()
            )));
        }

        let ticket = self.clock.next();
        Ok(entity.with_new_version(ticket, Utc::now()))
    }
}

/// Persists the Active log entry, the recovery checkpoint
pub struct WriteStart {
    store: Arc<dyn ColumnStore>,
    config: StoreConfig,
}

impl WriteStart {
    pub fn new(store: Arc<dyn ColumnStore>, config: StoreConfig) -> Self {
        Self { store, config }
    }

    pub async fn run(&self, scope: &Scope, entity: Entity) -> Result<MvccEntity> {
        let id = entity.id().ok_or_else(|| {
            StoreError::InvalidState("start write requires an entity with identity".into())
        })?;
        let version = entity.version().ok_or_else(|| {
            StoreError::InvalidState("start write requires a versioned entity".into())
        })?;

        let entry = MvccLogEntry::write_started(id.clone(), version);
        let batch = MutationBatch::new().put(
            keys::log_row(scope, &id),
            Column::new(keys::log_column(version, LogStage::Active), encode_log_entry(&entry)?),
        );
        self.store
            .batch_mutate(batch, self.config.write_consistency)
            .await
            .map_err(|err| StoreError::WriteFailure(format!("start write for {id}: {err}")))?;

        debug!("write started for {} version {}", id, version);
        Ok(MvccEntity::with_entity(id, version, entity))
    }
}

/// Validation extension point, run between start and commit
///
/// Verifiers never mutate store state; a verifier error aborts the write
/// before anything becomes readable.
#[async_trait]
pub trait WriteVerifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn verify(&self, scope: &Scope, entity: &MvccEntity) -> Result<()>;
}

/// Runs every registered verifier; no verifiers means a no-op stage
#[derive(Default)]
pub struct WriteVerify {
    verifiers: Vec<Arc<dyn WriteVerifier>>,
}

impl WriteVerify {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, verifier: Arc<dyn WriteVerifier>) {
        self.verifiers.push(verifier);
    }

    pub async fn run(&self, scope: &Scope, entity: &MvccEntity) -> Result<()> {
        for verifier in &self.verifiers {
            debug!("verifier {} on {} version {}", verifier.name(), entity.id(), entity.version());
            verifier.verify(scope, entity).await?;
        }
        Ok(())
    }
}

/// Writes the payload and the Committed log entry in one atomic batch
pub struct WriteCommit {
    store: Arc<dyn ColumnStore>,
    config: StoreConfig,
}

impl WriteCommit {
    pub fn new(store: Arc<dyn ColumnStore>, config: StoreConfig) -> Self {
        Self { store, config }
    }

    pub async fn run(&self, scope: &Scope, staged: MvccEntity) -> Result<Entity> {
        let id = staged.id().clone();
        let version = staged.version();
        let entity = staged.into_entity().ok_or_else(|| {
            StoreError::InvalidState(format!("commit for {id} requires an entity payload"))
        })?;

        let entry = MvccLogEntry::write_committed(id.clone(), version);
        let batch = MutationBatch::new()
            .put(
                keys::entity_row(scope, &id),
                Column::new(keys::version_column(version), encode_entity(&entity)?),
            )
            .put(
                keys::log_row(scope, &id),
                Column::new(keys::log_column(version, LogStage::Committed), encode_log_entry(&entry)?),
            );
        self.store
            .batch_mutate(batch, self.config.write_consistency)
            .await
            .map_err(|err| {
                StoreError::WriteFailure(format!("commit for {id} version {version}: {err}"))
            })?;

        debug!("committed {} version {}", id, version);
        Ok(entity)
    }
}

/// Records an in-flight delete under a fresh delete ticket
pub struct MarkStart {
    store: Arc<dyn ColumnStore>,
    clock: Arc<VersionClock>,
    config: StoreConfig,
}

impl MarkStart {
    pub fn new(store: Arc<dyn ColumnStore>, clock: Arc<VersionClock>, config: StoreConfig) -> Self {
        Self { store, clock, config }
    }

    pub async fn run(&self, scope: &Scope, id: &EntityId) -> Result<MvccEntity> {
        let ticket = self.clock.next();
        let entry = MvccLogEntry::delete_started(id.clone(), ticket);
        let batch = MutationBatch::new().put(
            keys::log_row(scope, id),
            Column::new(keys::log_column(ticket, LogStage::Active), encode_log_entry(&entry)?),
        );
        self.store
            .batch_mutate(batch, self.config.write_consistency)
            .await
            .map_err(|err| StoreError::WriteFailure(format!("mark start for {id}: {err}")))?;

        debug!("delete started for {} ticket {}", id, ticket);
        Ok(MvccEntity::new(id.clone(), ticket))
    }
}

/// Commits the tombstone, removing the identity from the live set
pub struct MarkCommit {
    store: Arc<dyn ColumnStore>,
    config: StoreConfig,
}

impl MarkCommit {
    pub fn new(store: Arc<dyn ColumnStore>, config: StoreConfig) -> Self {
        Self { store, config }
    }

    pub async fn run(&self, scope: &Scope, staged: MvccEntity) -> Result<Ticket> {
        let id = staged.id().clone();
        let version = staged.version();

        let entry = MvccLogEntry::delete_committed(id.clone(), version);
        let batch = MutationBatch::new().put(
            keys::log_row(scope, &id),
            Column::new(keys::log_column(version, LogStage::Committed), encode_log_entry(&entry)?),
        );
        self.store
            .batch_mutate(batch, self.config.write_consistency)
            .await
            .map_err(|err| {
                StoreError::WriteFailure(format!("mark commit for {id} ticket {version}: {err}"))
            })?;

        debug!("delete committed for {} ticket {}", id, version);
        Ok(version)
    }
}
