//! Access scope calculation
//!
//! Turns a role plus a directory resolution into a [`ScopeDecision`]. The
//! three subsets of a [`ResolvedScope`] are kept disjoint: a value lands in
//! `by_id` first, then `by_name`, then `by_raw_fallback`.

use crate::types::Role;
use scope_directory::DirectoryResolution;
use serde::Serialize;
use std::collections::BTreeSet;

/// Client values a restricted user may see, split by match strategy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedScope {
    by_id: BTreeSet<String>,
    by_name: BTreeSet<String>,
    by_raw_fallback: BTreeSet<String>,
}

impl ResolvedScope {
    /// Build a scope, dropping values already claimed by an earlier subset
    #[must_use]
    pub fn new<I, N, R>(by_id: I, by_name: N, by_raw_fallback: R) -> Self
    where
        I: IntoIterator<Item = String>,
        N: IntoIterator<Item = String>,
        R: IntoIterator<Item = String>,
    {
        let by_id: BTreeSet<String> = by_id.into_iter().collect();
        let by_name: BTreeSet<String> = by_name
            .into_iter()
            .filter(|name| !by_id.contains(name))
            .collect();
        let by_raw_fallback = by_raw_fallback
            .into_iter()
            .filter(|raw| !by_id.contains(raw) && !by_name.contains(raw))
            .collect();
        Self {
            by_id,
            by_name,
            by_raw_fallback,
        }
    }

    /// Build from a directory resolution
    #[must_use]
    pub fn from_resolution(resolution: &DirectoryResolution) -> Self {
        Self::new(
            resolution.resolved_ids.iter().map(|id| id.as_str().to_string()),
            resolution.resolved_names.iter().cloned(),
            resolution.unresolved.iter().cloned(),
        )
    }

    /// Values matched exactly against client ids
    #[inline]
    #[must_use]
    pub fn by_id(&self) -> &BTreeSet<String> {
        &self.by_id
    }

    /// Company names matched case-insensitively
    #[inline]
    #[must_use]
    pub fn by_name(&self) -> &BTreeSet<String> {
        &self.by_name
    }

    /// Unresolved grant values matched exactly
    #[inline]
    #[must_use]
    pub fn by_raw_fallback(&self) -> &BTreeSet<String> {
        &self.by_raw_fallback
    }

    /// Check if all subsets are empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty() && self.by_name.is_empty() && self.by_raw_fallback.is_empty()
    }

    /// Total values across subsets
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len() + self.by_name.len() + self.by_raw_fallback.len()
    }
}

/// Why a restricted user has an empty scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// Grant was absent or had no usable values
    NoGrant,
    /// Every value pointed at a deleted client excluded by policy
    AllExcluded,
}

/// Result of access scope calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "scope", rename_all = "snake_case")]
pub enum ScopeDecision {
    /// No client filter applies
    Unrestricted,
    /// User sees nothing
    Empty(EmptyReason),
    /// User sees only the listed clients
    Restricted(ResolvedScope),
}

impl ScopeDecision {
    /// Short name of the decision
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unrestricted => "unrestricted",
            Self::Empty(_) => "empty",
            Self::Restricted(_) => "restricted",
        }
    }

    /// Check if decision is unrestricted
    #[inline]
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }

    /// Check if decision is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty(_))
    }

    /// Restricted scope, if any
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Option<&ResolvedScope> {
        match self {
            Self::Restricted(scope) => Some(scope),
            _ => None,
        }
    }
}

/// Role policy over directory resolutions
#[derive(Debug, Clone, Copy)]
pub struct AccessScopeCalculator {
    include_deleted: bool,
}

impl AccessScopeCalculator {
    /// Create calculator with the deleted-client policy
    #[inline]
    #[must_use]
    pub fn new(include_deleted: bool) -> Self {
        Self { include_deleted }
    }

    /// Check if deleted clients reached by id stay in scope
    #[inline]
    #[must_use]
    pub fn includes_deleted(&self) -> bool {
        self.include_deleted
    }

    /// Apply the deleted-client policy to a resolution
    pub fn apply_policy(&self, resolution: &mut DirectoryResolution) {
        if !self.include_deleted && !resolution.deleted_ids.is_empty() {
            tracing::info!(
                "Excluding {} deleted client(s) from scope",
                resolution.deleted_ids.len()
            );
            resolution.exclude_deleted();
        }
    }

    /// Decide the scope for a role
    ///
    /// The resolution is ignored for unrestricted roles. For every other
    /// role an empty resolution is [`ScopeDecision::Empty`], never
    /// unrestricted.
    #[must_use]
    pub fn decide(&self, role: Role, resolution: &DirectoryResolution) -> ScopeDecision {
        if role.is_unrestricted() {
            return ScopeDecision::Unrestricted;
        }

        let scope = ResolvedScope::from_resolution(resolution);
        if !scope.is_empty() {
            return ScopeDecision::Restricted(scope);
        }

        let reason = if resolution.outcomes.is_empty() {
            EmptyReason::NoGrant
        } else {
            EmptyReason::AllExcluded
        };
        tracing::info!("Empty scope for {} ({:?})", role, reason);
        ScopeDecision::Empty(reason)
    }
}

impl Default for AccessScopeCalculator {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use scope_directory::{ClientId, GrantOutcome};

    fn resolution(ids: &[&str], names: &[&str], unresolved: &[&str]) -> DirectoryResolution {
        let mut resolution = DirectoryResolution::default();
        for id in ids {
            resolution.resolved_ids.insert(ClientId::from(*id));
            resolution.outcomes.insert((*id).to_string(), GrantOutcome::Unresolved);
        }
        resolution.resolved_names.extend(names.iter().map(ToString::to_string));
        for raw in unresolved {
            resolution.unresolved.insert((*raw).to_string());
            resolution.outcomes.insert((*raw).to_string(), GrantOutcome::Unresolved);
        }
        resolution
    }

    #[test]
    fn subsets_are_disjoint() {
        let scope = ResolvedScope::new(
            vec!["A1".to_string()],
            vec!["A1".to_string(), "Acme Co".to_string()],
            vec!["Acme Co".to_string(), "c9".to_string()],
        );

        assert_eq!(scope.by_id().len(), 1);
        assert_eq!(scope.by_name().iter().collect::<Vec<_>>(), vec!["Acme Co"]);
        assert_eq!(scope.by_raw_fallback().iter().collect::<Vec<_>>(), vec!["c9"]);
        assert_eq!(scope.len(), 3);
    }

    #[test]
    fn administrator_ignores_grant() {
        let calculator = AccessScopeCalculator::default();
        assert!(calculator
            .decide(Role::Administrator, &DirectoryResolution::default())
            .is_unrestricted());
    }

    #[test]
    fn empty_grant_is_empty_not_unrestricted() {
        let calculator = AccessScopeCalculator::default();
        let decision = calculator.decide(Role::Client, &DirectoryResolution::default());
        assert_eq!(decision, ScopeDecision::Empty(EmptyReason::NoGrant));
    }

    #[test]
    fn restricted_scope_carries_all_three_subsets() {
        let calculator = AccessScopeCalculator::default();
        let decision =
            calculator.decide(Role::AgencyAdmin, &resolution(&["c2"], &["Gamma"], &["c1", "c3"]));

        let scope = decision.scope().unwrap();
        assert!(scope.by_id().contains("c2"));
        assert!(scope.by_name().contains("Gamma"));
        assert_eq!(scope.by_raw_fallback().len(), 2);
        assert_eq!(decision.kind(), "restricted");
    }

    #[test]
    fn excluded_deleted_only_grant_is_empty() {
        let calculator = AccessScopeCalculator::new(false);
        let mut res = resolution(&["d1"], &[], &[]);
        res.deleted_ids.insert(ClientId::from("d1"));

        calculator.apply_policy(&mut res);
        let decision = calculator.decide(Role::Designer, &res);

        assert_eq!(decision, ScopeDecision::Empty(EmptyReason::AllExcluded));
        assert!(matches!(
            res.outcomes.get("d1"),
            Some(GrantOutcome::ExcludedDeleted { .. })
        ));
    }

    #[test]
    fn deleted_kept_by_default() {
        let calculator = AccessScopeCalculator::default();
        let mut res = resolution(&["d1"], &[], &[]);
        res.deleted_ids.insert(ClientId::from("d1"));

        calculator.apply_policy(&mut res);
        let decision = calculator.decide(Role::Designer, &res);
        assert!(decision.scope().unwrap().by_id().contains("d1"));
    }

    #[test]
    fn decision_serializes_with_tag() {
        let json = serde_json::to_value(ScopeDecision::Empty(EmptyReason::NoGrant)).unwrap();
        assert_eq!(json["decision"], "empty");
        assert_eq!(json["scope"], "no_grant");
    }

    fn role() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::Administrator),
            Just(Role::AgencyAdmin),
            Just(Role::Designer),
            Just(Role::Client),
        ]
    }

    proptest! {
        #[test]
        fn prop_scope_subsets_never_overlap(
            ids in proptest::collection::btree_set("[a-c]{1,2}", 0..6),
            names in proptest::collection::btree_set("[a-c]{1,2}", 0..6),
            raw in proptest::collection::btree_set("[a-c]{1,2}", 0..6),
        ) {
            let scope = ResolvedScope::new(ids.clone(), names.clone(), raw.clone());
            prop_assert!(scope.by_id().is_disjoint(scope.by_name()));
            prop_assert!(scope.by_id().is_disjoint(scope.by_raw_fallback()));
            prop_assert!(scope.by_name().is_disjoint(scope.by_raw_fallback()));

            let all: BTreeSet<String> = ids.union(&names).cloned().collect::<BTreeSet<_>>().union(&raw).cloned().collect();
            prop_assert_eq!(scope.len(), all.len());
        }

        #[test]
        fn prop_only_administrator_is_unrestricted(role in role(), empty in any::<bool>()) {
            let res = if empty { DirectoryResolution::default() } else { resolution(&["c1"], &[], &[]) };
            let decision = AccessScopeCalculator::default().decide(role, &res);
            prop_assert_eq!(decision.is_unrestricted(), role == Role::Administrator);
            if empty && role != Role::Administrator {
                prop_assert!(decision.is_empty());
            }
        }
    }
}
