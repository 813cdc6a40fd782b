//! Scope Core
//!
//! Role-scoped access computation over client-owned entities:
//! - Reads a user's stored grant and normalizes it
//! - Resolves it against the client registry, expanding duplicate names
//! - Applies role policy to produce a [`ScopeDecision`]
//! - Federates scoped entity lookups and merges the results
//!
//! # Example
//!
//! ```rust,ignore
//! use scope_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let snapshot = Arc::new(Snapshot::load("snapshot.json")?);
//! let service = ScopeService::new(snapshot.clone(), snapshot.clone(), snapshot, ScopeConfig::new());
//!
//! let user = UserContext::new("u1", Role::Client);
//! let cache = RequestCache::new();
//! let decision = service.resolve_scope(&user, &cache).await?;
//! let result = service
//!     .fetch_scoped(EntityKind::Artwork, &decision, &RangeFilters::new())
//!     .await?;
//!
//! println!("{} rows (partial: {})", result.rows.len(), result.partial);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod federation;
pub mod grant_source;
pub mod memory;
pub mod merge;
pub mod report;
pub mod scope;
pub mod service;
pub mod types;

pub use config::ScopeConfig;
pub use error::{ConfigError, GrantError, LookupError, ScopeError, ScopeResult, SnapshotError};
pub use federation::{
    plan_queries, ClientFieldQuery, DateWindow, EntityKind, EntityLookup, EntityQueryFederator,
    FederatedResult, FieldMatch, RangeFilters, ScopeSubset, ScopedEntity, SubsetFailure,
};
pub use grant_source::GrantSource;
pub use memory::{EntityRecord, Snapshot, UserEntry};
pub use merge::ResultMerger;
pub use report::{ReferenceOutcome, ScopeReport};
pub use scope::{AccessScopeCalculator, EmptyReason, ResolvedScope, ScopeDecision};
pub use service::ScopeService;
pub use types::{Role, UserContext, UserId};

pub use scope_directory::{
    ClientDirectory, ClientId, ClientRecord, ClientRegistry, DirectoryError, DirectoryResolution,
    GrantOutcome, IdSyntax, RegistryError, RequestCache,
};
pub use scope_grant::{GrantValue, IdentifierSet, RawGrant};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Scope Core
    pub use crate::{
        EntityKind, EntityLookup, FederatedResult, GrantSource, RangeFilters, RequestCache, Role,
        ScopeConfig, ScopeDecision, ScopeError, ScopeService, Snapshot, UserContext,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
