//! Error types for the client directory
//!
//! Registry failures are never swallowed: a directory that cannot reach the
//! registry fails closed and the caller decides how to retry.

/// Errors raised by a [`ClientRegistry`](crate::ClientRegistry) backend
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Backend unreachable
    #[error("client registry unavailable: {0}")]
    Unavailable(String),

    /// Query rejected or failed mid-flight
    #[error("client registry query failed: {0}")]
    QueryFailed(String),

    /// Backend-specific failure
    #[error("client registry backend error: {source}")]
    Backend {
        /// Underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RegistryError {
    /// Wrap a backend error
    pub fn backend(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend {
            source: source.into(),
        }
    }
}

/// Directory resolution errors
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// A registry lookup failed; resolution was aborted
    #[error("registry lookup `{operation}` failed: {source}")]
    LookupFailed {
        /// Registry operation that failed
        operation: &'static str,
        /// Registry error
        #[source]
        source: RegistryError,
    },
}

impl DirectoryError {
    /// Create lookup failure for an operation
    #[inline]
    pub fn lookup(operation: &'static str, source: RegistryError) -> Self {
        Self::LookupFailed { operation, source }
    }

    /// Registry operation that failed
    #[inline]
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::LookupFailed { operation, .. } => operation,
        }
    }
}

/// Result type alias for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;
