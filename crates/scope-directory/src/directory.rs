//! Client directory
//!
//! Resolves a normalized grant against the client registry:
//!
//! 1. Classify each reference as id-shaped or name-shaped
//! 2. Bulk-fetch rows for id-shaped references
//! 3. Bulk-fetch active rows and build the [`NameIndex`]
//! 4. Match name-shaped references against the index
//! 5. Expand every resolved name to its whole equivalence class
//!
//! Every input reference ends up with exactly one [`GrantOutcome`].

use crate::error::{DirectoryError, DirectoryResult};
use crate::name_index::{NameIndex, NormalizedName};
use crate::record::{ClientId, ClientRecord, IdSyntax};
use crate::registry::ClientRegistry;
use scope_grant::IdentifierSet;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// What a single grant reference resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GrantOutcome {
    /// Id-shaped reference matched an active row
    MatchedId {
        /// Matched id
        id: ClientId,
        /// Company name of the row
        company_name: String,
    },

    /// Name-shaped reference matched one or more active rows
    MatchedName {
        /// Canonical company name
        company_name: String,
        /// Every active id with that name
        ids: BTreeSet<ClientId>,
    },

    /// Id-shaped reference matched a soft-deleted row
    DeletedClient {
        /// Deleted row id
        id: ClientId,
        /// Company name of the row
        company_name: String,
    },

    /// Deleted row removed from scope by caller policy
    ExcludedDeleted {
        /// Deleted row id
        id: ClientId,
    },

    /// Matched neither an id nor a name; kept as a raw value
    Unresolved,
}

impl GrantOutcome {
    /// Check if the reference contributed nothing from the registry
    #[inline]
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }
}

/// Output of [`ClientDirectory::resolve`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryResolution {
    /// Every id reached, directly or through name expansion
    pub resolved_ids: BTreeSet<ClientId>,

    /// Canonical company names of every class reached
    pub resolved_names: BTreeSet<String>,

    /// References that matched nothing
    pub unresolved: BTreeSet<String>,

    /// Id to company name
    pub id_to_name: BTreeMap<ClientId, String>,

    /// Canonical company name to ids
    pub name_to_ids: BTreeMap<String, BTreeSet<ClientId>>,

    /// Resolved ids that point at soft-deleted rows
    pub deleted_ids: BTreeSet<ClientId>,

    /// Ids added only by duplicate-name expansion
    pub expanded_ids: BTreeSet<ClientId>,

    /// Per-reference outcome, keyed by the normalized reference
    pub outcomes: BTreeMap<String, GrantOutcome>,
}

impl DirectoryResolution {
    /// Check if nothing at all was resolved or left unresolved
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved_ids.is_empty() && self.resolved_names.is_empty() && self.unresolved.is_empty()
    }

    /// Drop soft-deleted ids from the resolved set
    ///
    /// Their outcomes become [`GrantOutcome::ExcludedDeleted`]. Names are
    /// untouched since deleted rows never contribute a name.
    pub fn exclude_deleted(&mut self) {
        for id in std::mem::take(&mut self.deleted_ids) {
            self.resolved_ids.remove(&id);
            self.id_to_name.remove(&id);
            self.outcomes.insert(id.as_str().to_string(), GrantOutcome::ExcludedDeleted { id });
        }
    }

    fn record_class(&mut self, canonical: &str, ids: &BTreeSet<ClientId>) {
        self.resolved_names.insert(canonical.to_string());
        self.name_to_ids
            .entry(canonical.to_string())
            .or_default()
            .extend(ids.iter().cloned());
        for id in ids {
            self.id_to_name
                .entry(id.clone())
                .or_insert_with(|| canonical.to_string());
            if self.resolved_ids.insert(id.clone()) {
                self.expanded_ids.insert(id.clone());
            }
        }
    }
}

/// Resolver from grant references to registry clients
#[derive(Debug, Clone, Default)]
pub struct ClientDirectory {
    id_syntax: IdSyntax,
}

impl ClientDirectory {
    /// Create directory with the registry's identifier syntax
    #[inline]
    #[must_use]
    pub fn new(id_syntax: IdSyntax) -> Self {
        Self { id_syntax }
    }

    /// Identifier syntax in use
    #[inline]
    #[must_use]
    pub fn id_syntax(&self) -> &IdSyntax {
        &self.id_syntax
    }

    /// Resolve a normalized grant
    ///
    /// # Errors
    /// Returns `DirectoryError::LookupFailed` if either registry read fails.
    /// Nothing is resolved in that case (fail closed).
    pub async fn resolve(
        &self,
        registry: &dyn ClientRegistry,
        references: &IdentifierSet,
    ) -> DirectoryResult<DirectoryResolution> {
        let mut resolution = DirectoryResolution::default();
        if references.is_empty() {
            return Ok(resolution);
        }

        // 1. Classify
        let (id_shaped, name_shaped): (Vec<&String>, Vec<&String>) = references
            .iter()
            .partition(|reference| self.id_syntax.is_id_shaped(reference));
        tracing::debug!(
            "Classified {} id-shaped and {} name-shaped references",
            id_shaped.len(),
            name_shaped.len()
        );

        // 2. Bulk id lookup
        let by_id = if id_shaped.is_empty() {
            HashMap::new()
        } else {
            let ids: Vec<ClientId> = id_shaped.iter().map(|s| ClientId::new(s.as_str())).collect();
            let rows = registry.get_by_ids(&ids).await.map_err(|e| {
                tracing::error!("Client registry get_by_ids failed: {}", e);
                DirectoryError::lookup("get_by_ids", e)
            })?;
            rows.into_iter()
                .map(|row| (row.id.clone(), row))
                .collect::<HashMap<ClientId, ClientRecord>>()
        };

        // 3. Name index over active rows
        let active = registry.get_all_active().await.map_err(|e| {
            tracing::error!("Client registry get_all_active failed: {}", e);
            DirectoryError::lookup("get_all_active", e)
        })?;
        let index = NameIndex::from_rows(&active);

        let mut seeds: BTreeSet<NormalizedName> = BTreeSet::new();

        for reference in id_shaped {
            let id = ClientId::new(reference.as_str());
            match by_id.get(&id) {
                Some(row) if row.deleted => {
                    tracing::warn!("Grant references soft-deleted client {}", id);
                    resolution.resolved_ids.insert(id.clone());
                    resolution.deleted_ids.insert(id.clone());
                    resolution.id_to_name.insert(id.clone(), row.company_name.trim().to_string());
                    resolution.outcomes.insert(
                        reference.clone(),
                        GrantOutcome::DeletedClient {
                            id,
                            company_name: row.company_name.trim().to_string(),
                        },
                    );
                }
                Some(row) => {
                    let name = NormalizedName::new(&row.company_name);
                    let company_name = name
                        .as_ref()
                        .and_then(|name| index.get(name))
                        .map_or_else(
                            || row.company_name.trim().to_string(),
                            |entry| entry.canonical.clone(),
                        );
                    if let Some(name) = name {
                        seeds.insert(name);
                    }
                    resolution.resolved_ids.insert(id.clone());
                    resolution.id_to_name.insert(id.clone(), company_name.clone());
                    resolution
                        .outcomes
                        .insert(reference.clone(), GrantOutcome::MatchedId { id, company_name });
                }
                None => {
                    resolution.unresolved.insert(reference.clone());
                    resolution.outcomes.insert(reference.clone(), GrantOutcome::Unresolved);
                }
            }
        }

        // 4. Name matching
        for reference in name_shaped {
            let matched = NormalizedName::new(reference)
                .and_then(|name| index.get(&name).map(|entry| (name, entry)));
            match matched {
                Some((name, entry)) => {
                    resolution.resolved_ids.extend(entry.ids.iter().cloned());
                    resolution.outcomes.insert(
                        reference.clone(),
                        GrantOutcome::MatchedName {
                            company_name: entry.canonical.clone(),
                            ids: entry.ids.clone(),
                        },
                    );
                    seeds.insert(name);
                }
                None => {
                    resolution.unresolved.insert(reference.clone());
                    resolution.outcomes.insert(reference.clone(), GrantOutcome::Unresolved);
                }
            }
        }

        // 5. Expansion: name classes are disjoint, so one pass over the seeds is closed.
        // Directly reached ids were inserted above, so only new ids count as expanded.
        for name in &seeds {
            match index.get(name) {
                Some(entry) => resolution.record_class(&entry.canonical, &entry.ids),
                None => {
                    // active by id but missing from the active scan (registry changed between reads)
                    tracing::warn!("Company name '{}' not present in active client index", name);
                }
            }
        }

        if !resolution.unresolved.is_empty() {
            tracing::warn!(
                "{} grant reference(s) matched no client: {:?}",
                resolution.unresolved.len(),
                resolution.unresolved
            );
        }
        tracing::debug!(
            "Directory resolved {} ids across {} names ({} via expansion)",
            resolution.resolved_ids.len(),
            resolution.resolved_names.len(),
            resolution.expanded_ids.len()
        );

        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::registry::MockClientRegistry;

    const ACME_1: &str = "64b7f0c2a1e3d4f5a6b7c8d1";
    const ACME_2: &str = "64b7f0c2a1e3d4f5a6b7c8d2";
    const BETA: &str = "64b7f0c2a1e3d4f5a6b7c8d3";
    const GONE: &str = "64b7f0c2a1e3d4f5a6b7c8d4";

    fn rows() -> Vec<ClientRecord> {
        vec![
            ClientRecord::new(ACME_1, "Acme Co"),
            ClientRecord::new(ACME_2, "acme co "),
            ClientRecord::new(BETA, "Beta Ltd"),
            ClientRecord::new(GONE, "Acme Co").soft_deleted(),
        ]
    }

    fn registry_with(all: Vec<ClientRecord>) -> MockClientRegistry {
        let mut mock = MockClientRegistry::new();
        let by_id_rows = all.clone();
        mock.expect_get_by_ids().returning(move |ids| {
            Ok(by_id_rows
                .iter()
                .filter(|row| ids.contains(&row.id))
                .cloned()
                .collect())
        });
        mock.expect_get_all_active()
            .returning(move || Ok(all.iter().filter(|r| r.is_active()).cloned().collect()));
        mock
    }

    fn ids(items: &[&str]) -> BTreeSet<ClientId> {
        items.iter().map(|s| ClientId::from(*s)).collect()
    }

    #[tokio::test]
    async fn empty_grant_touches_nothing() {
        let mut mock = MockClientRegistry::new();
        mock.expect_get_by_ids().never();
        mock.expect_get_all_active().never();

        let resolution = ClientDirectory::default()
            .resolve(&mock, &IdentifierSet::new())
            .await
            .unwrap();
        assert!(resolution.is_empty());
    }

    #[tokio::test]
    async fn name_reference_expands_to_duplicates() {
        let registry = registry_with(rows());
        let grant: IdentifierSet = ["ACME CO"].iter().collect();

        let resolution = ClientDirectory::default().resolve(&registry, &grant).await.unwrap();

        assert_eq!(resolution.resolved_ids, ids(&[ACME_1, ACME_2]));
        assert_eq!(resolution.resolved_names.len(), 1);
        assert!(resolution.resolved_names.contains("Acme Co"));
        assert!(resolution.unresolved.is_empty());
        assert!(resolution.expanded_ids.is_empty());
    }

    #[tokio::test]
    async fn id_reference_expands_through_company_name() {
        let registry = registry_with(rows());
        let grant: IdentifierSet = [ACME_2].iter().collect();

        let resolution = ClientDirectory::default().resolve(&registry, &grant).await.unwrap();

        assert_eq!(resolution.resolved_ids, ids(&[ACME_1, ACME_2]));
        assert_eq!(resolution.expanded_ids, ids(&[ACME_1]));
        assert_eq!(
            resolution.name_to_ids.get("Acme Co"),
            Some(&ids(&[ACME_1, ACME_2]))
        );
        assert_eq!(resolution.id_to_name.get(&ClientId::from(ACME_1)).unwrap(), "Acme Co");
    }

    #[tokio::test]
    async fn id_match_reports_canonical_company_name() {
        let registry = registry_with(rows());
        let grant: IdentifierSet = [ACME_2, "acme co"].iter().collect();

        let resolution = ClientDirectory::default().resolve(&registry, &grant).await.unwrap();

        assert_eq!(
            resolution.outcomes.get(ACME_2),
            Some(&GrantOutcome::MatchedId {
                id: ClientId::from(ACME_2),
                company_name: "Acme Co".to_string(),
            })
        );
        assert!(matches!(
            resolution.outcomes.get("acme co"),
            Some(GrantOutcome::MatchedName { company_name, .. }) if company_name == "Acme Co"
        ));
        assert_eq!(resolution.id_to_name.get(&ClientId::from(ACME_2)).unwrap(), "Acme Co");
    }

    #[tokio::test]
    async fn deleted_row_resolves_by_id_without_expanding() {
        let registry = registry_with(rows());
        let grant: IdentifierSet = [GONE].iter().collect();

        let resolution = ClientDirectory::default().resolve(&registry, &grant).await.unwrap();

        assert_eq!(resolution.resolved_ids, ids(&[GONE]));
        assert_eq!(resolution.deleted_ids, ids(&[GONE]));
        assert!(resolution.resolved_names.is_empty());
        assert!(matches!(
            resolution.outcomes.get(GONE),
            Some(GrantOutcome::DeletedClient { .. })
        ));
    }

    #[tokio::test]
    async fn exclude_deleted_reports_instead_of_dropping() {
        let registry = registry_with(rows());
        let grant: IdentifierSet = [GONE, BETA].iter().collect();

        let mut resolution = ClientDirectory::default().resolve(&registry, &grant).await.unwrap();
        resolution.exclude_deleted();

        assert_eq!(resolution.resolved_ids, ids(&[BETA]));
        assert!(resolution.deleted_ids.is_empty());
        assert!(matches!(
            resolution.outcomes.get(GONE),
            Some(GrantOutcome::ExcludedDeleted { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_references_are_reported() {
        let registry = registry_with(rows());
        let missing_id = "64b7f0c2a1e3d4f5a6b7c8ff";
        let grant: IdentifierSet = [missing_id, "Nobody Inc", "Acme"].iter().collect();

        let resolution = ClientDirectory::default().resolve(&registry, &grant).await.unwrap();

        assert!(resolution.resolved_ids.is_empty());
        assert_eq!(resolution.unresolved.len(), 3);
        assert!(resolution.outcomes.values().all(GrantOutcome::is_unresolved));
    }

    #[tokio::test]
    async fn every_reference_gets_one_outcome() {
        let registry = registry_with(rows());
        let grant: IdentifierSet = [ACME_1, "beta ltd", GONE, "stray"].iter().collect();

        let resolution = ClientDirectory::default().resolve(&registry, &grant).await.unwrap();

        assert_eq!(resolution.outcomes.len(), grant.len());
        for reference in &grant {
            assert!(resolution.outcomes.contains_key(reference));
        }
    }

    #[tokio::test]
    async fn get_by_ids_failure_fails_closed() {
        let mut mock = MockClientRegistry::new();
        mock.expect_get_by_ids()
            .returning(|_| Err(RegistryError::Unavailable("down".into())));
        mock.expect_get_all_active().never();

        let grant: IdentifierSet = [ACME_1].iter().collect();
        let err = ClientDirectory::default().resolve(&mock, &grant).await.unwrap_err();
        assert_eq!(err.operation(), "get_by_ids");
    }

    #[tokio::test]
    async fn get_all_active_failure_fails_closed() {
        let mut mock = MockClientRegistry::new();
        mock.expect_get_all_active()
            .returning(|| Err(RegistryError::QueryFailed("timeout".into())));

        let grant: IdentifierSet = ["Acme Co"].iter().collect();
        let err = ClientDirectory::default().resolve(&mock, &grant).await.unwrap_err();
        assert_eq!(err.operation(), "get_all_active");
    }

    #[tokio::test]
    async fn custom_syntax_classifies_short_ids() {
        let registry = registry_with(vec![ClientRecord::new("c2", "Gamma")]);
        let directory = ClientDirectory::new(IdSyntax::pattern(r"c\d+").unwrap());
        let grant: IdentifierSet = ["c1", "c2", "c3"].iter().collect();

        let resolution = directory.resolve(&registry, &grant).await.unwrap();

        assert_eq!(resolution.resolved_ids, ids(&["c2"]));
        let expected: BTreeSet<String> = ["c1", "c3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(resolution.unresolved, expected);
    }
}
