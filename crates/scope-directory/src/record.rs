//! Client registry rows and identifier syntax
//!
//! Provides [`ClientId`], [`ClientRecord`] and [`IdSyntax`], the rule that
//! decides whether a raw grant value is id-shaped or name-shaped.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};

/// Stable client identifier as stored in the registry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Wrap a registry identifier
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

    /// Consume into string
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One row of the client registry
///
/// Company names are not unique; duplicate rows under the same name are a
/// known legacy condition. Rows are soft-deleted, never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Stable identifier
    pub id: ClientId,

    /// Free-text company name
    #[serde(alias = "companyName")]
    pub company_name: String,

    /// Soft-delete tombstone
    #[serde(default)]
    pub deleted: bool,
}

impl ClientRecord {
    /// Create an active record
    #[must_use]
    pub fn new(id: impl Into<ClientId>, company_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            company_name: company_name.into(),
            deleted: false,
        }
    }

    /// Mark record as soft-deleted
    #[inline]
    #[must_use]
    pub fn soft_deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// Check if record is active
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}

static OBJECT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("object id pattern compiles"));

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern compiles")
});

/// Syntax of registry identifiers
///
/// Anything that does not match is treated as a company name.
#[derive(Debug, Clone, Default)]
pub enum IdSyntax {
    /// 24 hexadecimal characters
    #[default]
    ObjectId,

    /// Hyphenated UUID
    Uuid,

    /// Custom pattern, matched against the whole value
    Pattern(Regex),
}

impl IdSyntax {
    /// Compile a custom pattern
    ///
    /// The pattern is anchored so it must match the entire value.
    ///
    /// # Errors
    /// Returns the regex compilation error for an invalid pattern.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{pattern})$")).map(Self::Pattern)
    }

    /// Check if a trimmed value is id-shaped
    #[must_use]
    pub fn is_id_shaped(&self, value: &str) -> bool {
        match self {
            Self::ObjectId => OBJECT_ID.is_match(value),
            Self::Uuid => UUID.is_match(value),
            Self::Pattern(re) => re.is_match(value),
        }
    }

    /// Short name used in logs and config
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ObjectId => "object_id",
            Self::Uuid => "uuid",
            Self::Pattern(_) => "pattern",
        }
    }
}

/// Serialized form of [`IdSyntax`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum IdSyntaxSpec {
    ObjectId,
    Uuid,
    Pattern { pattern: String },
}

impl IdSyntaxSpec {
    fn compile(self) -> Result<IdSyntax, regex::Error> {
        match self {
            Self::ObjectId => Ok(IdSyntax::ObjectId),
            Self::Uuid => Ok(IdSyntax::Uuid),
            Self::Pattern { pattern } => IdSyntax::pattern(&pattern),
        }
    }

    fn describe(syntax: &IdSyntax) -> Self {
        match syntax {
            IdSyntax::ObjectId => Self::ObjectId,
            IdSyntax::Uuid => Self::Uuid,
            IdSyntax::Pattern(re) => {
                // strip the anchoring added by IdSyntax::pattern
                let anchored = re.as_str();
                let inner = anchored
                    .strip_prefix("^(?:")
                    .and_then(|s| s.strip_suffix(")$"))
                    .unwrap_or(anchored);
                Self::Pattern {
                    pattern: inner.to_string(),
                }
            }
        }
    }
}

impl Serialize for IdSyntax {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        IdSyntaxSpec::describe(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for IdSyntax {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IdSyntaxSpec::deserialize(deserializer)?
            .compile()
            .map_err(serde::de::Error::custom)
    }
}
