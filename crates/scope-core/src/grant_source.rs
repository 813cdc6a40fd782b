//! Grant accessor collaborator

use crate::error::GrantError;
use crate::types::UserId;
use async_trait::async_trait;
use scope_grant::RawGrant;
use std::sync::Arc;

/// Read access to users' stored client grants
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GrantSource: Send + Sync {
    /// Stored grant for a user, in whatever shape it was written
    async fn raw_grant(&self, user: &UserId) -> Result<RawGrant, GrantError>;
}

#[async_trait]
impl<T: GrantSource + ?Sized> GrantSource for Arc<T> {
    async fn raw_grant(&self, user: &UserId) -> Result<RawGrant, GrantError> {
        (**self).raw_grant(user).await
    }
}
