use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::Ticket;

/// One tenant collection: the application it belongs to plus the collection
/// name. Every row key in the store is qualified by a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub application: Uuid,
    pub name: String,
}

impl Scope {
    pub fn new(application: Uuid, name: impl Into<String>) -> Self {
        Self {
            application,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.application, self.name)
    }
}

/// Stable entity identity, shared by every version of the entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pub uuid: Uuid,
    pub kind: String,
}

impl EntityId {
    pub fn new(uuid: Uuid, kind: impl Into<String>) -> Self {
        Self {
            uuid,
            kind: kind.into(),
        }
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.uuid)
    }
}

/// An opaque, application-defined document
///
/// A freshly constructed entity has no identity; the write pipeline's create
/// stage attaches one. Committed entities are immutable; an update commits a
/// new version for the same identity rather than touching the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    kind: String,
    uuid: Option<Uuid>,
    version: Option<Ticket>,
    created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    document: Value,
}

impl Entity {
    /// A draft entity with no identity, ready for the create path
    pub fn new(kind: impl Into<String>, document: Value) -> Self {
        Self {
            kind: kind.into(),
            uuid: None,
            version: None,
            created: None,
            updated: None,
            document,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn uuid(&self) -> Option<Uuid> {
        self.uuid
    }

    pub fn id(&self) -> Option<EntityId> {
        self.uuid.map(|uuid| EntityId::new(uuid, self.kind.clone()))
    }

    pub fn version(&self) -> Option<Ticket> {
        self.version
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Mutable access to the document, for edits between load and update
    pub fn document_mut(&mut self) -> &mut Value {
        &mut self.document
    }

    pub fn has_identity(&self) -> bool {
        self.uuid.is_some()
    }

    /// Attach a fresh identity (create path): the ticket becomes both the
    /// stable uuid and the first version.
    pub(crate) fn with_identity(mut self, ticket: Ticket, now: DateTime<Utc>) -> Self {
        self.uuid = Some(ticket.as_uuid());
        self.version = Some(ticket);
        self.created = Some(now);
        self.updated = Some(now);
        self
    }

    /// Assign a fresh version (update path), leaving identity untouched
    pub(crate) fn with_new_version(mut self, ticket: Ticket, now: DateTime<Utc>) -> Self {
        self.version = Some(ticket);
        self.updated = Some(now);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::VersionClock;
    use serde_json::json;

    #[test]
    fn test_draft_has_no_identity() {
        let entity = Entity::new("book", json!({"title": "Dune"}));
        assert!(!entity.has_identity());
        assert!(entity.id().is_none());
        assert!(entity.version().is_none());
    }

    #[test]
    fn test_with_identity_populates_all_fields() {
        let clock = VersionClock::new();
        let ticket = clock.next();
        let now = Utc::now();

        let entity = Entity::new("book", json!({})).with_identity(ticket, now);
        assert_eq!(entity.uuid(), Some(ticket.as_uuid()));
        assert_eq!(entity.version(), Some(ticket));
        assert_eq!(entity.created(), Some(now));
        assert_eq!(entity.updated(), Some(now));
    }

    #[test]
    fn test_new_version_preserves_identity() {
        let clock = VersionClock::new();
        let first = clock.next();
        let now = Utc::now();
        let entity = Entity::new("book", json!({})).with_identity(first, now);

        let second = clock.next();
        let later = Utc::now();
        let updated = entity.clone().with_new_version(second, later);

        assert_eq!(updated.uuid(), entity.uuid());
        assert_eq!(updated.created(), entity.created());
        assert_eq!(updated.version(), Some(second));
        assert!(updated.version() > entity.version());
    }
}
