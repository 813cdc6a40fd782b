//! Testing utilities for the client scope workspace
//!
//! Shared fixtures, fault-injecting collaborators and service builders.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use scope_core::{
    ClientFieldQuery, EntityKind, EntityLookup, EntityRecord, LookupError, RangeFilters,
    ScopeConfig, ScopeService, Snapshot, UserEntry,
};
use scope_directory::{ClientId, ClientRecord, ClientRegistry, IdSyntax, RegistryError};
use scope_grant::{GrantValue, RawGrant};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Identifier syntax used by the fixtures: a letter followed by digits
pub const SHORT_ID_PATTERN: &str = r"[A-Za-z]\d+";

pub fn short_id_config() -> ScopeConfig {
    ScopeConfig::new().with_id_syntax(IdSyntax::pattern(SHORT_ID_PATTERN).unwrap())
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

pub fn artwork(id: &str, client_ref: &str, d: u32) -> EntityRecord {
    EntityRecord::new(id, EntityKind::Artwork, client_ref, day(d))
        .with_title(format!("Artwork {id}"))
        .with_status("approved")
}

/// Registry with duplicate "Acme Co" rows, a deleted client and users for
/// every role
pub fn agency_snapshot() -> Snapshot {
    let clients = vec![
        ClientRecord::new("A1", "Acme Co"),
        ClientRecord::new("A2", "acme co "),
        ClientRecord::new("B1", "Beta Ltd"),
        ClientRecord::new("c2", "Gamma Foods"),
        ClientRecord::new("D1", "Delta Corp").soft_deleted(),
    ];

    let users = vec![
        UserEntry::new("admin", "ADMIN", RawGrant::absent()),
        UserEntry::new("client-empty", "CLIENT", RawGrant::absent()),
        UserEntry::new(
            "client-acme",
            "CLIENT",
            RawGrant::assigned(GrantValue::list(["Acme Co"])),
        ),
        UserEntry::new(
            "agency",
            "AGENCY_ADMIN",
            RawGrant::assigned(GrantValue::joined("c1,c2,c3")),
        ),
        UserEntry::new("designer-a2", "DESIGNER", RawGrant::legacy("A2")),
        UserEntry::new(
            "designer-deleted",
            "DESIGNER",
            RawGrant::assigned(GrantValue::list(["D1"])),
        ),
        UserEntry::new("ghost", "SUPERUSER", RawGrant::legacy("A1")),
    ];

    let entities = vec![
        artwork("art-a1", "A1", 1),
        artwork("art-a2", "A2", 2).with_status("draft"),
        artwork("art-acme-legacy", "ACME CO", 3),
        artwork("art-b1", "B1", 4),
        artwork("art-c1", "c1", 5),
        artwork("art-c2", "c2", 6),
        artwork("art-c3", "c3", 7),
        artwork("art-d1", "D1", 8),
        EntityRecord::new("camp-a1", EntityKind::Campaign, "A1", day(1)),
    ];

    Snapshot::new(clients, users, entities)
}

pub fn service_over(snapshot: Snapshot, config: ScopeConfig) -> ScopeService<Snapshot> {
    let snapshot = Arc::new(snapshot);
    ScopeService::new(snapshot.clone(), snapshot.clone(), snapshot, config)
}

pub fn service_with_lookup<L: EntityLookup + 'static>(
    snapshot: Snapshot,
    lookup: Arc<L>,
    config: ScopeConfig,
) -> ScopeService<L> {
    let snapshot = Arc::new(snapshot);
    ScopeService::new(snapshot.clone(), snapshot, lookup, config)
}

pub fn keys(rows: &[EntityRecord]) -> Vec<&str> {
    rows.iter().map(|e| e.id.as_str()).collect()
}

/// Lookup wrapper that fails or stalls chosen queries and records calls
pub struct FaultyLookup<L> {
    inner: L,
    fail_on: Vec<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<ClientFieldQuery>>,
    unscoped_calls: AtomicUsize,
}

impl<L: EntityLookup> FaultyLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            fail_on: Vec::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
            unscoped_calls: AtomicUsize::new(0),
        }
    }

    /// Fail any scoped query carrying this value
    #[must_use]
    pub fn failing_on(mut self, value: impl Into<String>) -> Self {
        self.fail_on.push(value.into());
        self
    }

    /// Sleep before answering every query
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn scoped_calls(&self) -> Vec<ClientFieldQuery> {
        self.calls.lock().clone()
    }

    pub fn unscoped_calls(&self) -> usize {
        self.unscoped_calls.load(Ordering::SeqCst)
    }

    async fn stall(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl<L: EntityLookup> EntityLookup for FaultyLookup<L> {
    type Entity = L::Entity;

    async fn query_by_client_field(
        &self,
        kind: EntityKind,
        query: &ClientFieldQuery,
        filters: &RangeFilters,
    ) -> Result<Vec<Self::Entity>, LookupError> {
        self.calls.lock().push(query.clone());
        self.stall().await;
        if query.values.iter().any(|v| self.fail_on.contains(v)) {
            return Err(LookupError::Unavailable(format!(
                "injected failure for {:?}",
                query.values
            )));
        }
        self.inner.query_by_client_field(kind, query, filters).await
    }

    async fn query_unscoped(
        &self,
        kind: EntityKind,
        filters: &RangeFilters,
    ) -> Result<Vec<Self::Entity>, LookupError> {
        self.unscoped_calls.fetch_add(1, Ordering::SeqCst);
        self.stall().await;
        self.inner.query_unscoped(kind, filters).await
    }
}

/// Registry that is always down
#[derive(Debug, Default)]
pub struct UnavailableRegistry;

#[async_trait]
impl ClientRegistry for UnavailableRegistry {
    async fn get_by_ids(&self, _ids: &[ClientId]) -> Result<Vec<ClientRecord>, RegistryError> {
        Err(RegistryError::Unavailable("registry offline".to_string()))
    }

    async fn get_all_active(&self) -> Result<Vec<ClientRecord>, RegistryError> {
        Err(RegistryError::Unavailable("registry offline".to_string()))
    }
}

pub fn service_with_registry<R: ClientRegistry + 'static>(
    snapshot: Snapshot,
    registry: R,
    config: ScopeConfig,
) -> ScopeService<Snapshot> {
    let snapshot = Arc::new(snapshot);
    ScopeService::new(Arc::new(registry), snapshot.clone(), snapshot, config)
}
