//! Canonical set of client references
//!
//! Provides [`IdentifierSet`], the only form of a grant the rest of the
//! pipeline ever sees.

use crate::raw::{GrantValue, RawGrant};
use serde::Serialize;
use std::collections::btree_set;
use std::collections::BTreeSet;

/// Set of trimmed, non-empty client references
///
/// Invariants:
/// - every element is trimmed
/// - no element is empty
/// - no duplicates (ordering is lexical and carries no meaning)
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct IdentifierSet(BTreeSet<String>);

impl IdentifierSet {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Normalize a user's stored grant
    ///
    /// Reads both the multi-valued field and the legacy single field.
    /// Never fails: malformed values degrade to fewer elements.
    #[must_use]
    pub fn normalize(grant: &RawGrant) -> Self {
        let mut set = Self::from_value(&grant.assigned_clients);
        set.extend_value(&grant.legacy_client_id);
        set
    }

    /// Normalize one stored value
    #[must_use]
    pub fn from_value(value: &GrantValue) -> Self {
        let mut set = Self::new();
        set.extend_value(value);
        set
    }

    fn extend_value(&mut self, value: &GrantValue) {
        match value {
            GrantValue::Absent => {}
            GrantValue::List(items) => {
                for item in items {
                    self.insert(item);
                }
            }
            GrantValue::Joined(joined) => {
                for part in joined.split(',') {
                    self.insert(part);
                }
            }
            GrantValue::Single(single) => {
                self.insert(single);
            }
        }
    }

    /// Insert a reference after trimming
    ///
    /// Returns `false` when the value was empty after trimming or already present.
    pub fn insert(&mut self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.0.insert(trimmed.to_string())
    }

    /// Check membership (exact, post-trim form)
    #[inline]
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value)
    }

    /// Number of references
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate references in lexical order
    #[inline]
    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.0.iter()
    }

    /// Union of two sets
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Borrow the underlying set
    #[inline]
    #[must_use]
    pub fn as_set(&self) -> &BTreeSet<String> {
        &self.0
    }

    /// Consume into the underlying set
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> BTreeSet<String> {
        self.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for IdentifierSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item.as_ref());
        }
        set
    }
}

impl<S: AsRef<str>> Extend<S> for IdentifierSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item.as_ref());
        }
    }
}

impl IntoIterator for IdentifierSet {
    type Item = String;
    type IntoIter = btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a IdentifierSet {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
