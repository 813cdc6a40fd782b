//! Client registry collaborator
//!
//! Provides the [`ClientRegistry`] trait the directory reads through.

use crate::error::RegistryError;
use crate::record::{ClientId, ClientRecord};
use async_trait::async_trait;
use std::sync::Arc;

/// Read access to the client registry
///
/// Implementations own the persistence layer; the directory only issues
/// bulk reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Fetch rows for the given ids, including soft-deleted rows
    ///
    /// Ids with no row are simply absent from the result.
    async fn get_by_ids(&self, ids: &[ClientId]) -> Result<Vec<ClientRecord>, RegistryError>;

    /// Fetch every non-deleted row
    async fn get_all_active(&self) -> Result<Vec<ClientRecord>, RegistryError>;
}

#[async_trait]
impl<T: ClientRegistry + ?Sized> ClientRegistry for Arc<T> {
    async fn get_by_ids(&self, ids: &[ClientId]) -> Result<Vec<ClientRecord>, RegistryError> {
        (**self).get_by_ids(ids).await
    }

    async fn get_all_active(&self) -> Result<Vec<ClientRecord>, RegistryError> {
        (**self).get_all_active().await
    }
}
