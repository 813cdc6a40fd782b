//! Raw grant values as they come out of storage
//!
//! The "assigned clients" field of a user was written by several generations
//! of data-entry screens, so the same logical grant shows up as a JSON array,
//! a comma-joined string, a single legacy identifier, or nothing at all.
//! Deserialization never fails on these shapes: unexpected element types are
//! stringified when that is meaningful and skipped otherwise.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One stored grant value, before normalization
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum GrantValue {
    /// Field missing or null
    #[default]
    Absent,

    /// Sequence of references
    List(Vec<String>),

    /// Comma-separated references in one string
    Joined(String),

    /// A single reference that must not be split (legacy field)
    Single(String),
}

impl GrantValue {
    /// Build a list value
    #[must_use]
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a comma-joined value
    #[inline]
    #[must_use]
    pub fn joined(value: impl Into<String>) -> Self {
        Self::Joined(value.into())
    }

    /// Build a single unsplit value
    #[inline]
    #[must_use]
    pub fn single(value: impl Into<String>) -> Self {
        Self::Single(value.into())
    }

    /// Check if the value is absent
    #[inline]
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Interpret a JSON value as a single unsplit reference
    #[must_use]
    pub fn single_from_json(value: Value) -> Self {
        match scalar_to_string(&value) {
            Some(s) => Self::Single(s),
            None => {
                if !value.is_null() {
                    tracing::debug!("Ignoring non-scalar legacy grant value: {}", value);
                }
                Self::Absent
            }
        }
    }
}

impl From<Value> for GrantValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::String(s) => Self::Joined(s),
            Value::Array(items) => Self::List(
                items
                    .iter()
                    .filter_map(|item| {
                        let converted = scalar_to_string(item);
                        if converted.is_none() {
                            tracing::debug!("Dropping malformed grant element: {}", item);
                        }
                        converted
                    })
                    .collect(),
            ),
            Value::Number(n) => Self::Single(n.to_string()),
            other => {
                tracing::debug!("Ignoring malformed grant value: {}", other);
                Self::Absent
            }
        }
    }
}

impl From<GrantValue> for Value {
    fn from(value: GrantValue) -> Self {
        match value {
            GrantValue::Absent => Value::Null,
            GrantValue::List(items) => Value::Array(items.into_iter().map(Value::String).collect()),
            GrantValue::Joined(s) | GrantValue::Single(s) => Value::String(s),
        }
    }
}

/// Strings pass through, numbers are stringified, everything else is rejected
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn legacy_from_json<'de, D>(deserializer: D) -> Result<GrantValue, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(GrantValue::single_from_json(value))
}

/// The full stored grant of one user
///
/// Both fields are read: newer rows populate `assigned_clients`, older rows
/// only carry the single legacy client id, and some rows carry both.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawGrant {
    /// Multi-valued "assigned clients" field
    #[serde(default, alias = "assignedClients")]
    pub assigned_clients: GrantValue,

    /// Legacy single client reference
    #[serde(default, alias = "clientId", deserialize_with = "legacy_from_json")]
    pub legacy_client_id: GrantValue,
}

impl RawGrant {
    /// Grant with nothing stored
    #[inline]
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Grant from an assigned-clients value only
    #[inline]
    #[must_use]
    pub fn assigned(value: GrantValue) -> Self {
        Self {
            assigned_clients: value,
            legacy_client_id: GrantValue::Absent,
        }
    }

    /// Grant from the legacy single field only
    #[inline]
    #[must_use]
    pub fn legacy(value: impl Into<String>) -> Self {
        Self {
            assigned_clients: GrantValue::Absent,
            legacy_client_id: GrantValue::single(value),
        }
    }

    /// Set the legacy field
    #[inline]
    #[must_use]
    pub fn with_legacy(mut self, value: impl Into<String>) -> Self {
        self.legacy_client_id = GrantValue::single(value);
        self
    }

    /// Check if neither field carries anything
    #[inline]
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.assigned_clients.is_absent() && self.legacy_client_id.is_absent()
    }
}
