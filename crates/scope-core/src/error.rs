//! Error types for scope resolution
//!
//! Provides error handling for:
//! - Grant accessor failures
//! - Client registry failures (via [`DirectoryError`])
//! - Entity lookup failures
//! - Configuration and snapshot loading
//!
//! Every failure before federation is fail-closed: no scope is produced.

use crate::federation::SubsetFailure;
use crate::types::UserId;
use scope_directory::DirectoryError;
use std::path::PathBuf;

/// Main scope resolution error
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    /// Client registry could not be read
    #[error("directory lookup failed: {0}")]
    DirectoryLookupFailed(#[from] DirectoryError),

    /// User's stored grant could not be read
    #[error("grant lookup failed for user {user}: {source}")]
    GrantLookupFailed {
        /// User whose grant was requested
        user: UserId,
        /// Accessor error
        #[source]
        source: GrantError,
    },

    /// Stored role string is not a known role
    #[error("unknown role: {0:?}")]
    UnknownRole(String),

    /// Every scoped lookup failed
    #[error("all {} entity lookup(s) failed", failures.len())]
    FederationFailed {
        /// Per-subset failures
        failures: Vec<SubsetFailure>,
    },

    /// Request deadline expired during federation
    #[error("request deadline exceeded after {timeout_ms}ms")]
    DeadlineExceeded {
        /// Configured deadline
        timeout_ms: u64,
    },
}

impl ScopeError {
    /// Create grant lookup failure
    #[inline]
    pub fn grant(user: UserId, source: GrantError) -> Self {
        Self::GrantLookupFailed { user, source }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DirectoryLookupFailed(_)
            | Self::DeadlineExceeded { .. }
            | Self::FederationFailed { .. } => true,
            Self::GrantLookupFailed { source, .. } => source.is_retryable(),
            Self::UnknownRole(_) => false,
        }
    }
}

/// Errors raised by an [`EntityLookup`](crate::EntityLookup) backend
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Backend unreachable
    #[error("entity store unavailable: {0}")]
    Unavailable(String),

    /// Query rejected or failed mid-flight
    #[error("entity query failed: {0}")]
    QueryFailed(String),

    /// Backend-specific failure
    #[error("entity store backend error: {source}")]
    Backend {
        /// Underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl LookupError {
    /// Wrap a backend error
    pub fn backend(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend {
            source: source.into(),
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Errors raised by a [`GrantSource`](crate::GrantSource)
#[derive(Debug, thiserror::Error)]
pub enum GrantError {
    /// No such user
    #[error("unknown user: {0}")]
    UnknownUser(UserId),

    /// Grant store unreachable
    #[error("grant store unavailable: {0}")]
    Unavailable(String),
}

impl GrantError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Snapshot loading errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// File could not be read
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        /// Snapshot path
        path: PathBuf,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// JSON did not parse
    #[error("invalid snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for scope operations
pub type ScopeResult<T> = Result<T, ScopeError>;
