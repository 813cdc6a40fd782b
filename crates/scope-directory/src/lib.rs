//! Scope Directory
//!
//! Resolves a user's normalized grant against the client registry.
//!
//! # Core Concepts
//!
//! - [`ClientRegistry`]: the bulk-read collaborator over registry rows
//! - [`IdSyntax`]: decides id-shaped vs name-shaped references
//! - [`NameIndex`]: normalized company name → every active id (duplicate classes)
//! - [`ClientDirectory`]: the resolver, producing a [`DirectoryResolution`]
//! - [`RequestCache`]: memo of registry reads for exactly one request
//!
//! # Example
//!
//! ```rust,ignore
//! use scope_directory::{ClientDirectory, IdSyntax, RequestCache};
//! use scope_grant::{GrantValue, IdentifierSet, RawGrant};
//!
//! let cache = RequestCache::new();
//! let directory = ClientDirectory::new(IdSyntax::ObjectId);
//!
//! let grant = IdentifierSet::normalize(&RawGrant::assigned(GrantValue::joined("Acme Co")));
//! let resolution = directory.resolve(&cache.wrap(&registry), &grant).await?;
//!
//! // Every registry row named "Acme Co" is now in scope
//! println!("{:?}", resolution.resolved_ids);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod directory;
pub mod error;
pub mod name_index;
pub mod record;
pub mod registry;

pub use cache::{CacheStats, CachedRegistry, RequestCache};
pub use directory::{ClientDirectory, DirectoryResolution, GrantOutcome};
pub use error::{DirectoryError, DirectoryResult, RegistryError};
pub use name_index::{NameEntry, NameIndex, NormalizedName};
pub use record::{ClientId, ClientRecord, IdSyntax};
pub use registry::ClientRegistry;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
