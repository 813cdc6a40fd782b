//! Resolution report
//!
//! Explains, value by value, where each normalized grant value went.

use crate::scope::ScopeDecision;
use crate::types::{Role, UserId};
use scope_directory::{ClientId, DirectoryResolution, GrantOutcome};
use serde::Serialize;
use std::collections::BTreeSet;

/// Outcome of one grant value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceOutcome {
    /// Normalized grant value
    pub reference: String,
    /// What it resolved to
    #[serde(flatten)]
    pub outcome: GrantOutcome,
}

/// Per-request explanation of a scope decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeReport {
    /// Requesting user
    pub user: UserId,
    /// Parsed role
    pub role: Role,
    /// Final decision
    pub decision: ScopeDecision,
    /// One entry per normalized grant value, sorted by value
    pub outcomes: Vec<ReferenceOutcome>,
    /// Ids added only through duplicate-name expansion
    pub expanded_ids: BTreeSet<ClientId>,
}

impl ScopeReport {
    /// Build report from a policy-applied resolution
    #[must_use]
    pub fn new(
        user: UserId,
        role: Role,
        decision: ScopeDecision,
        resolution: &DirectoryResolution,
    ) -> Self {
        let outcomes = resolution
            .outcomes
            .iter()
            .map(|(reference, outcome)| ReferenceOutcome {
                reference: reference.clone(),
                outcome: outcome.clone(),
            })
            .collect();
        Self {
            user,
            role,
            decision,
            outcomes,
            expanded_ids: resolution.expanded_ids.clone(),
        }
    }

    /// Short name of the decision
    #[inline]
    #[must_use]
    pub fn decision_kind(&self) -> &'static str {
        self.decision.kind()
    }

    /// Values kept only as raw fallback
    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_unresolved())
            .map(|o| o.reference.as_str())
    }
}
