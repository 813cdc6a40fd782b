//! In-memory snapshot backend
//!
//! A [`Snapshot`] holds clients, users and entities loaded from one JSON
//! document and serves all three collaborator traits. It backs the
//! `scopectl` diagnostics and the scenario tests.
//!
//! ```json
//! {
//!   "clients":  [{ "id": "A1", "company_name": "Acme Co" }],
//!   "users":    [{ "id": "u1", "role": "CLIENT", "assigned_clients": "A1" }],
//!   "entities": [{ "id": "e1", "kind": "artwork", "client_ref": "A1",
//!                  "date": "2024-05-01", "title": "Poster", "status": "draft" }]
//! }
//! ```

use crate::error::{GrantError, LookupError, ScopeError, SnapshotError};
use crate::federation::{ClientFieldQuery, EntityKind, EntityLookup, RangeFilters, ScopedEntity};
use crate::grant_source::GrantSource;
use crate::types::{UserContext, UserId};
use async_trait::async_trait;
use chrono::NaiveDate;
use scope_directory::{ClientId, ClientRecord, ClientRegistry, RegistryError};
use scope_grant::RawGrant;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Client-owned entity row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Primary key
    pub id: String,
    /// Entity type
    pub kind: EntityKind,
    /// Client id or legacy company name
    #[serde(alias = "clientRef")]
    pub client_ref: String,
    /// Scheduled or due date; the ordering key
    pub date: NaiveDate,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Workflow status
    #[serde(default)]
    pub status: String,
}

impl EntityRecord {
    /// Create entity
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: EntityKind,
        client_ref: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            client_ref: client_ref.into(),
            date,
            title: String::new(),
            status: String::new(),
        }
    }

    /// With title
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

impl ScopedEntity for EntityRecord {
    type OrderKey = NaiveDate;

    fn key(&self) -> &str {
        &self.id
    }

    fn order_key(&self) -> NaiveDate {
        self.date
    }

    fn client_ref(&self) -> &str {
        &self.client_ref
    }
}

/// Stored user row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    /// User id
    pub id: UserId,
    /// Role as stored; parsed on use
    pub role: String,
    /// Stored grant fields
    #[serde(flatten)]
    pub grant: RawGrant,
}

impl UserEntry {
    /// Create user entry
    #[must_use]
    pub fn new(id: impl Into<UserId>, role: impl Into<String>, grant: RawGrant) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            grant,
        }
    }

    /// Parse into a request context
    ///
    /// # Errors
    /// Returns `ScopeError::UnknownRole` for an unrecognized role string.
    pub fn context(&self) -> Result<UserContext, ScopeError> {
        Ok(UserContext::new(self.id.clone(), self.role.parse()?))
    }
}

/// Clients, users and entities held in memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Client registry rows, including soft-deleted ones
    #[serde(default)]
    pub clients: Vec<ClientRecord>,
    /// Users and their grants
    #[serde(default)]
    pub users: Vec<UserEntry>,
    /// Client-owned entities
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

impl Snapshot {
    /// Create snapshot
    #[must_use]
    pub fn new(clients: Vec<ClientRecord>, users: Vec<UserEntry>, entities: Vec<EntityRecord>) -> Self {
        Self {
            clients,
            users,
            entities,
        }
    }

    /// Parse JSON
    ///
    /// # Errors
    /// Returns `SnapshotError::Parse` for malformed JSON.
    pub fn from_json_str(source: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load a JSON file
    ///
    /// # Errors
    /// Returns `SnapshotError::Io` if the file cannot be read, otherwise as
    /// [`Snapshot::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = Self::from_json_str(&source)?;
        tracing::info!(
            "Loaded snapshot {} ({} clients, {} users, {} entities)",
            path.display(),
            snapshot.clients.len(),
            snapshot.users.len(),
            snapshot.entities.len()
        );
        Ok(snapshot)
    }

    /// Find a user
    #[must_use]
    pub fn user(&self, id: &UserId) -> Option<&UserEntry> {
        self.users.iter().find(|u| &u.id == id)
    }

    fn entities_of(&self, kind: EntityKind, filters: &RangeFilters) -> impl Iterator<Item = &EntityRecord> {
        let filters = filters.clone();
        self.entities
            .iter()
            .filter(move |e| e.kind == kind && filters.matches(e.date, &e.status))
    }
}

#[async_trait]
impl ClientRegistry for Snapshot {
    async fn get_by_ids(&self, ids: &[ClientId]) -> Result<Vec<ClientRecord>, RegistryError> {
        let wanted: HashSet<&ClientId> = ids.iter().collect();
        Ok(self
            .clients
            .iter()
            .filter(|c| wanted.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn get_all_active(&self) -> Result<Vec<ClientRecord>, RegistryError> {
        Ok(self.clients.iter().filter(|c| c.is_active()).cloned().collect())
    }
}

#[async_trait]
impl GrantSource for Snapshot {
    async fn raw_grant(&self, user: &UserId) -> Result<RawGrant, GrantError> {
        self.user(user)
            .map(|u| u.grant.clone())
            .ok_or_else(|| GrantError::UnknownUser(user.clone()))
    }
}

#[async_trait]
impl EntityLookup for Snapshot {
    type Entity = EntityRecord;

    async fn query_by_client_field(
        &self,
        kind: EntityKind,
        query: &ClientFieldQuery,
        filters: &RangeFilters,
    ) -> Result<Vec<EntityRecord>, LookupError> {
        Ok(self
            .entities_of(kind, filters)
            .filter(|e| query.matches(&e.client_ref))
            .cloned()
            .collect())
    }

    async fn query_unscoped(
        &self,
        kind: EntityKind,
        filters: &RangeFilters,
    ) -> Result<Vec<EntityRecord>, LookupError> {
        Ok(self.entities_of(kind, filters).cloned().collect())
    }
}
