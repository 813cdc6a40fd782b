//! Request-scoped registry cache
//!
//! A [`RequestCache`] lives exactly as long as one inbound request. Access
//! grants and registry rows may change between requests, so nothing here is
//! ever shared process-wide: create one per request and drop it afterwards.

use crate::error::RegistryError;
use crate::record::{ClientId, ClientRecord};
use crate::registry::ClientRegistry;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Statistics for one request's cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Ids with a cached answer (hit or known miss)
    pub id_entries: usize,

    /// Whether the active-row scan has been loaded
    pub active_loaded: bool,

    /// Registry calls actually issued
    pub registry_calls: u64,
}

/// Memo of registry reads for a single request
#[derive(Debug, Default)]
pub struct RequestCache {
    /// `None` records a confirmed miss
    by_id: DashMap<ClientId, Option<ClientRecord>>,
    active: OnceCell<Arc<Vec<ClientRecord>>>,
    registry_calls: AtomicU64,
}

impl RequestCache {
    /// Create empty cache for a new request
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a registry so reads go through this cache
    #[inline]
    #[must_use]
    pub fn wrap<'a>(&'a self, registry: &'a dyn ClientRegistry) -> CachedRegistry<'a> {
        CachedRegistry {
            inner: registry,
            cache: self,
        }
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            id_entries: self.by_id.len(),
            active_loaded: self.active.initialized(),
            registry_calls: self.registry_calls.load(Ordering::Relaxed),
        }
    }
}

/// Registry decorator backed by a [`RequestCache`]
///
/// Failed reads are not cached, so a retry within the same request goes
/// back to the registry.
#[derive(Clone, Copy)]
pub struct CachedRegistry<'a> {
    inner: &'a dyn ClientRegistry,
    cache: &'a RequestCache,
}

impl std::fmt::Debug for CachedRegistry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedRegistry")
            .field("cache", &self.cache.stats())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ClientRegistry for CachedRegistry<'_> {
    async fn get_by_ids(&self, ids: &[ClientId]) -> Result<Vec<ClientRecord>, RegistryError> {
        let mut found = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();

        for id in ids {
            match self.cache.by_id.get(id) {
                Some(entry) => {
                    if let Some(record) = entry.value() {
                        found.push(record.clone());
                    }
                }
                None => missing.push(id.clone()),
            }
        }

        if missing.is_empty() {
            return Ok(found);
        }

        self.cache.registry_calls.fetch_add(1, Ordering::Relaxed);
        let fetched = self.inner.get_by_ids(&missing).await?;

        for id in &missing {
            self.cache.by_id.entry(id.clone()).or_insert(None);
        }
        for record in fetched {
            self.cache.by_id.insert(record.id.clone(), Some(record.clone()));
            found.push(record);
        }

        Ok(found)
    }

    async fn get_all_active(&self) -> Result<Vec<ClientRecord>, RegistryError> {
        let rows = self
            .cache
            .active
            .get_or_try_init(|| async {
                self.cache.registry_calls.fetch_add(1, Ordering::Relaxed);
                self.inner.get_all_active().await.map(Arc::new)
            })
            .await?;
        Ok((**rows).clone())
    }
}
