//! Entity query federation
//!
//! Translates a [`ScopeDecision`] into at most one lookup per non-empty
//! subset, runs them concurrently under the request deadline and merges
//! the results. A failing subset does not abort the others; the result is
//! flagged `partial` instead.

use crate::error::{LookupError, ScopeError};
use crate::merge::ResultMerger;
use crate::scope::{ResolvedScope, ScopeDecision};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Client-owned entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Content calendar entry
    CalendarEntry,
    /// Artwork awaiting or past approval
    Artwork,
    /// Campaign
    Campaign,
}

impl EntityKind {
    /// Stored form
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CalendarEntry => "calendar_entry",
            Self::Artwork => "artwork",
            Self::Campaign => "campaign",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "calendar_entry" | "calendar" => Ok(Self::CalendarEntry),
            "artwork" => Ok(Self::Artwork),
            "campaign" => Ok(Self::Campaign),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// How client field values are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldMatch {
    /// Byte-for-byte
    Exact,
    /// After trimming and case folding
    CaseInsensitive,
}

/// Homogeneous match on an entity's client field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientFieldQuery {
    /// Values to match
    pub values: Vec<String>,
    /// Comparison used for every value
    pub field_match: FieldMatch,
}

impl ClientFieldQuery {
    /// Create query with one comparison for all values
    #[must_use]
    pub fn new<I, S>(values: I, field_match: FieldMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            field_match,
        }
    }

    /// Check if a client field value matches
    #[must_use]
    pub fn matches(&self, client_ref: &str) -> bool {
        match self.field_match {
            FieldMatch::Exact => self.values.iter().any(|v| v == client_ref),
            FieldMatch::CaseInsensitive => {
                let folded = client_ref.trim().to_lowercase();
                self.values.iter().any(|v| v.trim().to_lowercase() == folded)
            }
        }
    }
}

/// Inclusive date window; an open end is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// First included day
    pub from: Option<NaiveDate>,
    /// Last included day
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    /// Create window
    #[inline]
    #[must_use]
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Check if a day falls inside the window
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// Caller filters applied identically to every subset lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeFilters {
    /// Date window on the entity's ordering date
    pub window: Option<DateWindow>,
    /// Exact status match
    pub status: Option<String>,
}

impl RangeFilters {
    /// No filtering
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With date window
    #[inline]
    #[must_use]
    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Check date and status against the filters
    #[must_use]
    pub fn matches(&self, date: NaiveDate, status: &str) -> bool {
        self.window.map_or(true, |w| w.contains(date))
            && self.status.as_deref().map_or(true, |s| s == status)
    }
}

/// Entity carrying a client reference
pub trait ScopedEntity: Clone + Send + Sync + 'static {
    /// Ordering key; ties break on the primary key
    type OrderKey: Ord;

    /// Primary key
    fn key(&self) -> &str;

    /// Ordering key
    fn order_key(&self) -> Self::OrderKey;

    /// Client id or legacy company name
    fn client_ref(&self) -> &str;
}

/// Read access to client-owned entities
#[async_trait]
pub trait EntityLookup: Send + Sync {
    /// Row type returned by the store
    type Entity: ScopedEntity;

    /// Entities of `kind` whose client field matches `query`
    async fn query_by_client_field(
        &self,
        kind: EntityKind,
        query: &ClientFieldQuery,
        filters: &RangeFilters,
    ) -> Result<Vec<Self::Entity>, LookupError>;

    /// Entities of `kind` with no client filter
    async fn query_unscoped(
        &self,
        kind: EntityKind,
        filters: &RangeFilters,
    ) -> Result<Vec<Self::Entity>, LookupError>;
}

#[async_trait]
impl<T: EntityLookup + ?Sized> EntityLookup for Arc<T> {
    type Entity = T::Entity;

    async fn query_by_client_field(
        &self,
        kind: EntityKind,
        query: &ClientFieldQuery,
        filters: &RangeFilters,
    ) -> Result<Vec<Self::Entity>, LookupError> {
        (**self).query_by_client_field(kind, query, filters).await
    }

    async fn query_unscoped(
        &self,
        kind: EntityKind,
        filters: &RangeFilters,
    ) -> Result<Vec<Self::Entity>, LookupError> {
        (**self).query_unscoped(kind, filters).await
    }
}

/// One lookup issued by the federator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeSubset {
    /// Exact match on client ids
    ById,
    /// Case-insensitive match on company names
    ByName,
    /// Exact match on unresolved grant values
    ByRawFallback,
    /// No client filter
    Unscoped,
}

impl ScopeSubset {
    /// Stored form
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ById => "by_id",
            Self::ByName => "by_name",
            Self::ByRawFallback => "by_raw_fallback",
            Self::Unscoped => "unscoped",
        }
    }
}

impl Display for ScopeSubset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subset lookup that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsetFailure {
    /// Which lookup
    pub subset: ScopeSubset,
    /// Error message
    pub error: String,
    /// Whether the backend reported a transient error
    pub retryable: bool,
}

impl SubsetFailure {
    fn new(subset: ScopeSubset, error: &LookupError) -> Self {
        Self {
            subset,
            error: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// Merged rows plus failure report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FederatedResult<E> {
    /// Deduplicated rows sorted by ordering key then primary key
    pub rows: Vec<E>,
    /// Some subset failed; rows are incomplete
    pub partial: bool,
    /// Failed subsets
    pub failures: Vec<SubsetFailure>,
}

impl<E> FederatedResult<E> {
    /// Empty, complete result
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            partial: false,
            failures: Vec::new(),
        }
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Lookups needed for a restricted scope, one per non-empty subset
#[must_use]
pub fn plan_queries(scope: &ResolvedScope) -> Vec<(ScopeSubset, ClientFieldQuery)> {
    [
        (ScopeSubset::ById, scope.by_id(), FieldMatch::Exact),
        (ScopeSubset::ByName, scope.by_name(), FieldMatch::CaseInsensitive),
        (ScopeSubset::ByRawFallback, scope.by_raw_fallback(), FieldMatch::Exact),
    ]
    .into_iter()
    .filter(|(_, values, _)| !values.is_empty())
    .map(|(subset, values, field_match)| {
        (subset, ClientFieldQuery::new(values.iter().cloned(), field_match))
    })
    .collect()
}

/// Concurrent scoped lookups under a deadline
#[derive(Debug, Clone, Copy)]
pub struct EntityQueryFederator {
    deadline: Duration,
}

impl EntityQueryFederator {
    /// Create federator with a request deadline
    #[inline]
    #[must_use]
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// Request deadline
    #[inline]
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run the lookups a decision calls for
    ///
    /// # Errors
    /// - `ScopeError::DeadlineExceeded` if the deadline expires; outstanding
    ///   lookups are dropped
    /// - `ScopeError::FederationFailed` if every issued lookup failed
    pub async fn fetch<L>(
        &self,
        lookup: &L,
        kind: EntityKind,
        decision: &ScopeDecision,
        filters: &RangeFilters,
    ) -> Result<FederatedResult<L::Entity>, ScopeError>
    where
        L: EntityLookup + ?Sized,
    {
        let plan: Vec<(ScopeSubset, Option<ClientFieldQuery>)> = match decision {
            ScopeDecision::Empty(reason) => {
                tracing::debug!("Empty scope ({:?}); no {} lookups issued", reason, kind);
                return Ok(FederatedResult::empty());
            }
            ScopeDecision::Unrestricted => vec![(ScopeSubset::Unscoped, None)],
            ScopeDecision::Restricted(scope) => plan_queries(scope)
                .into_iter()
                .map(|(subset, query)| (subset, Some(query)))
                .collect(),
        };

        tracing::debug!("Issuing {} {} lookup(s)", plan.len(), kind);

        let lookups = plan.iter().map(|(subset, query)| async move {
            let result = match query {
                Some(query) => lookup.query_by_client_field(kind, query, filters).await,
                None => lookup.query_unscoped(kind, filters).await,
            };
            (*subset, result)
        });

        let outcomes = tokio::time::timeout(self.deadline, join_all(lookups))
            .await
            .map_err(|_| {
                let timeout_ms = u64::try_from(self.deadline.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!("{} federation exceeded deadline of {}ms", kind, timeout_ms);
                ScopeError::DeadlineExceeded { timeout_ms }
            })?;

        let issued = outcomes.len();
        let mut lists = Vec::with_capacity(issued);
        let mut failures = Vec::new();
        for (subset, result) in outcomes {
            match result {
                Ok(rows) => {
                    tracing::debug!("{} lookup {} returned {} row(s)", kind, subset, rows.len());
                    lists.push(rows);
                }
                Err(e) => {
                    tracing::warn!("{} lookup {} failed: {}", kind, subset, e);
                    failures.push(SubsetFailure::new(subset, &e));
                }
            }
        }

        if issued > 0 && failures.len() == issued {
            return Err(ScopeError::FederationFailed { failures });
        }

        let rows = ResultMerger::merge(lists);
        Ok(FederatedResult {
            rows,
            partial: !failures.is_empty(),
            failures,
        })
    }
}
