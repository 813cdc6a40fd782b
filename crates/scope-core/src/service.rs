//! Scope service
//!
//! Wires the pipeline together for one request:
//!
//! ```text
//! GrantSource → IdentifierSet → ClientDirectory → AccessScopeCalculator
//!            → EntityQueryFederator → ResultMerger
//! ```

use crate::config::ScopeConfig;
use crate::error::{ScopeError, ScopeResult};
use crate::federation::{EntityKind, EntityLookup, EntityQueryFederator, FederatedResult, RangeFilters};
use crate::grant_source::GrantSource;
use crate::report::ScopeReport;
use crate::scope::{AccessScopeCalculator, ScopeDecision};
use crate::types::UserContext;
use scope_directory::{ClientDirectory, ClientRegistry, DirectoryResolution, RequestCache};
use scope_grant::IdentifierSet;
use std::sync::Arc;

/// Role-scoped access over client-owned entities
pub struct ScopeService<L: EntityLookup + ?Sized> {
    registry: Arc<dyn ClientRegistry>,
    grants: Arc<dyn GrantSource>,
    lookup: Arc<L>,
    directory: ClientDirectory,
    calculator: AccessScopeCalculator,
    federator: EntityQueryFederator,
    config: ScopeConfig,
}

impl<L: EntityLookup + ?Sized> ScopeService<L> {
    /// Create service over its collaborators
    #[must_use]
    pub fn new(
        registry: Arc<dyn ClientRegistry>,
        grants: Arc<dyn GrantSource>,
        lookup: Arc<L>,
        config: ScopeConfig,
    ) -> Self {
        tracing::info!(
            "Scope service ready (id syntax: {}, deadline: {}ms, include deleted: {})",
            config.id_syntax.name(),
            config.request_timeout_ms,
            config.include_deleted_clients
        );
        Self {
            registry,
            grants,
            lookup,
            directory: ClientDirectory::new(config.id_syntax.clone()),
            calculator: AccessScopeCalculator::new(config.include_deleted_clients),
            federator: EntityQueryFederator::new(config.request_timeout()),
            config,
        }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    /// Compute the access scope for a user
    ///
    /// Administrators short-circuit without reading their grant or the
    /// registry.
    ///
    /// # Errors
    /// Fails closed with `GrantLookupFailed` or `DirectoryLookupFailed` when
    /// a collaborator cannot be read.
    pub async fn resolve_scope(
        &self,
        user: &UserContext,
        cache: &RequestCache,
    ) -> ScopeResult<ScopeDecision> {
        if user.role.is_unrestricted() {
            tracing::info!("User {} is {}; scope unrestricted", user.id, user.role);
            return Ok(ScopeDecision::Unrestricted);
        }

        let resolution = self.resolve_grant(user, cache).await?;
        let decision = self.calculator.decide(user.role, &resolution);
        tracing::info!("User {} ({}) scope: {}", user.id, user.role, decision.kind());
        Ok(decision)
    }

    /// Run the scoped lookups for a decision
    ///
    /// # Errors
    /// Returns `DeadlineExceeded` when the configured deadline expires and
    /// `FederationFailed` when every lookup failed.
    pub async fn fetch_scoped(
        &self,
        kind: EntityKind,
        decision: &ScopeDecision,
        filters: &RangeFilters,
    ) -> ScopeResult<FederatedResult<L::Entity>> {
        let result = self
            .federator
            .fetch(self.lookup.as_ref(), kind, decision, filters)
            .await?;
        if result.partial {
            tracing::warn!(
                "Partial {} result: {} subset(s) failed",
                kind,
                result.failures.len()
            );
        }
        Ok(result)
    }

    /// Resolve and fetch in one call with a fresh request cache
    ///
    /// # Errors
    /// As [`ScopeService::resolve_scope`] and [`ScopeService::fetch_scoped`].
    pub async fn fetch_for_user(
        &self,
        user: &UserContext,
        kind: EntityKind,
        filters: &RangeFilters,
    ) -> ScopeResult<FederatedResult<L::Entity>> {
        let cache = RequestCache::new();
        let decision = self.resolve_scope(user, &cache).await?;
        self.fetch_scoped(kind, &decision, filters).await
    }

    /// Explain a user's scope value by value
    ///
    /// # Errors
    /// As [`ScopeService::resolve_scope`].
    pub async fn explain(&self, user: &UserContext, cache: &RequestCache) -> ScopeResult<ScopeReport> {
        let resolution = if user.role.is_unrestricted() {
            DirectoryResolution::default()
        } else {
            self.resolve_grant(user, cache).await?
        };
        let decision = self.calculator.decide(user.role, &resolution);
        Ok(ScopeReport::new(user.id.clone(), user.role, decision, &resolution))
    }

    async fn resolve_grant(
        &self,
        user: &UserContext,
        cache: &RequestCache,
    ) -> ScopeResult<DirectoryResolution> {
        let raw = self.grants.raw_grant(&user.id).await.map_err(|e| {
            tracing::error!("Grant lookup failed for user {}: {}", user.id, e);
            ScopeError::grant(user.id.clone(), e)
        })?;

        let references = IdentifierSet::normalize(&raw);
        tracing::debug!("User {} grant normalized to {} value(s)", user.id, references.len());

        let registry = cache.wrap(self.registry.as_ref());
        let mut resolution = self.directory.resolve(&registry, &references).await?;
        self.calculator.apply_policy(&mut resolution);
        Ok(resolution)
    }
}

impl<L: EntityLookup + ?Sized> std::fmt::Debug for ScopeService<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
