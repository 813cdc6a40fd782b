//! Core types for scope resolution

use crate::error::ScopeError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// User identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create user id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Role of the requesting user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum Role {
    /// Sees every client
    Administrator,
    /// Agency staff managing a set of clients
    AgencyAdmin,
    /// Agency staff producing content for a set of clients
    Designer,
    /// End-client user
    Client,
}

impl Role {
    /// Check if role bypasses client scoping
    #[inline]
    #[must_use]
    pub fn is_unrestricted(self) -> bool {
        matches!(self, Self::Administrator)
    }

    /// Canonical stored form
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "ADMINISTRATOR",
            Self::AgencyAdmin => "AGENCY_ADMIN",
            Self::Designer => "DESIGNER",
            Self::Client => "CLIENT",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ScopeError;

    /// Parse a stored role string
    ///
    /// Case, `-`, `_` and spaces are ignored. Unknown strings are an error,
    /// never a default role.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "admin" | "administrator" => Ok(Self::Administrator),
            "agencyadmin" => Ok(Self::AgencyAdmin),
            "designer" => Ok(Self::Designer),
            "client" => Ok(Self::Client),
            _ => Err(ScopeError::UnknownRole(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ScopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Requesting user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// User id
    pub id: UserId,
    /// Parsed role
    pub role: Role,
}

impl UserContext {
    /// Create user context
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self { id: id.into(), role }
    }
}
