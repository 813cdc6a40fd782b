//! Company-name index over active registry rows
//!
//! Provides [`NameIndex`], a multimap from normalized company name to every
//! active client id carrying that name. Each entry is one equivalence class
//! of duplicate client records.

use crate::record::{ClientId, ClientRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

/// Company name after trimming and case folding
///
/// Matching is exact on this form: no fuzzy or substring matching.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedName(String);

impl NormalizedName {
    /// Normalize a company name
    ///
    /// Returns `None` when the name is blank.
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_lowercase()))
        }
    }

    /// Borrow normalized form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NormalizedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One equivalence class of client rows sharing a company name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameEntry {
    /// Display form: trimmed name of the lowest id in the class
    pub canonical: String,

    /// Every active id with this name
    pub ids: BTreeSet<ClientId>,
}

/// Multimap from normalized company name to active client ids
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: BTreeMap<NormalizedName, NameEntry>,
    indexed_rows: usize,
}

impl NameIndex {
    /// Build index from registry rows
    ///
    /// Soft-deleted rows are skipped even if the backend returned them, and
    /// rows with a blank company name cannot be matched by name.
    #[must_use]
    pub fn from_rows(rows: &[ClientRecord]) -> Self {
        let mut sorted: Vec<&ClientRecord> = rows.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        let mut index = Self::default();
        for row in sorted {
            if row.deleted {
                tracing::warn!("Registry returned soft-deleted client {} as active; skipping", row.id);
                continue;
            }
            let Some(key) = NormalizedName::new(&row.company_name) else {
                tracing::debug!("Client {} has a blank company name; not indexed", row.id);
                continue;
            };

            let entry = index.entries.entry(key).or_insert_with(|| NameEntry {
                canonical: row.company_name.trim().to_string(),
                ids: BTreeSet::new(),
            });
            if entry.ids.insert(row.id.clone()) {
                index.indexed_rows += 1;
            }
        }
        index
    }

    /// Look up by normalized name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &NormalizedName) -> Option<&NameEntry> {
        self.entries.get(name)
    }

    /// Look up by raw name
    #[must_use]
    pub fn lookup(&self, raw: &str) -> Option<&NameEntry> {
        NormalizedName::new(raw).and_then(|name| self.entries.get(&name))
    }

    /// Number of distinct names
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if index is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of rows indexed
    #[inline]
    #[must_use]
    pub fn indexed_rows(&self) -> usize {
        self.indexed_rows
    }

    /// Names shared by more than one client id
    pub fn duplicates(&self) -> impl Iterator<Item = (&NormalizedName, &NameEntry)> {
        self.entries.iter().filter(|(_, entry)| entry.ids.len() > 1)
    }

    /// Check if any class contains the id
    #[must_use]
    pub fn contains_id(&self, id: &ClientId) -> bool {
        self.entries.values().any(|entry| entry.ids.contains(id))
    }
}
