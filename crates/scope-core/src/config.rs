//! Scope service configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! request_timeout_ms = 2000
//! include_deleted_clients = false
//!
//! [id_syntax]
//! kind = "pattern"
//! pattern = 'c\d+'
//! ```

use crate::error::ConfigError;
use scope_directory::IdSyntax;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Scope service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScopeConfig {
    /// Syntax of registry identifiers
    pub id_syntax: IdSyntax,
    /// Deadline for federated entity lookups
    pub request_timeout_ms: u64,
    /// Keep soft-deleted clients reached by id in scope
    pub include_deleted_clients: bool,
}

impl ScopeConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` for malformed TOML or an invalid id
    /// pattern, and `ConfigError::Invalid` for out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`ScopeConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!("Loaded scope config from {}", path.display());
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for a zero deadline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Federation deadline
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// With identifier syntax
    #[inline]
    #[must_use]
    pub fn with_id_syntax(mut self, id_syntax: IdSyntax) -> Self {
        self.id_syntax = id_syntax;
        self
    }

    /// With federation deadline in milliseconds
    #[inline]
    #[must_use]
    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    /// With deleted-client policy
    #[inline]
    #[must_use]
    pub fn with_include_deleted_clients(mut self, include: bool) -> Self {
        self.include_deleted_clients = include;
        self
    }
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            id_syntax: IdSyntax::default(),
            request_timeout_ms: 5_000,
            include_deleted_clients: true,
        }
    }
}
