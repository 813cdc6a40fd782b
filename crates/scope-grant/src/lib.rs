//! Scope Grant
//!
//! Normalization of a user's stored client grant.
//!
//! # Core Concepts
//!
//! - [`GrantValue`]: one stored value in whatever shape it was written
//! - [`RawGrant`]: the assigned-clients field plus the legacy single field
//! - [`IdentifierSet`]: canonical set of trimmed, non-empty references
//!
//! # Example
//!
//! ```rust
//! use scope_grant::{GrantValue, IdentifierSet, RawGrant};
//!
//! let grant = RawGrant::assigned(GrantValue::joined("c1, c2,,c3"));
//! let ids = IdentifierSet::normalize(&grant);
//!
//! assert_eq!(ids.len(), 3);
//! assert!(ids.contains("c2"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod identifier_set;
mod raw;

pub use identifier_set::IdentifierSet;
pub use raw::{GrantValue, RawGrant};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
