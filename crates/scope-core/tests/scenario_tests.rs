//! End-to-end scope scenarios over the agency fixture.
//!
//! Core guarantees exercised here:
//! - Duplicate client rows sharing a company name are one client for access.
//! - A restricted role never gets implicit full access.
//! - Grant values that match nothing still scope entities by raw value.
//! - Registry failures fail closed.

use pretty_assertions::assert_eq;
use scope_core::prelude::*;
use scope_core::{EmptyReason, GrantOutcome, UserId};
use scope_test_utils::{
    agency_snapshot, keys, service_over, service_with_registry, short_id_config,
    UnavailableRegistry,
};

fn context(snapshot: &Snapshot, user: &str) -> UserContext {
    snapshot.user(&UserId::from(user)).unwrap().context().unwrap()
}

async fn artworks_for(user: &str) -> (ScopeDecision, Vec<String>) {
    let snapshot = agency_snapshot();
    let ctx = context(&snapshot, user);
    let service = service_over(snapshot, short_id_config());

    let decision = service.resolve_scope(&ctx, &RequestCache::new()).await.unwrap();
    let result = service
        .fetch_scoped(EntityKind::Artwork, &decision, &RangeFilters::new())
        .await
        .unwrap();
    assert!(!result.partial);
    let ids = keys(&result.rows).into_iter().map(String::from).collect();
    (decision, ids)
}

/// Tenet: a grant naming a company reaches every row with that name.
///
/// A1 "Acme Co" and A2 "acme co " are the same client; legacy entities that
/// store the company name instead of an id are included too.
#[tokio::test]
async fn company_name_grant_reaches_duplicate_rows() {
    let (decision, rows) = artworks_for("client-acme").await;

    let scope = decision.scope().unwrap();
    assert_eq!(scope.by_id().iter().collect::<Vec<_>>(), vec!["A1", "A2"]);
    assert_eq!(scope.by_name().iter().collect::<Vec<_>>(), vec!["Acme Co"]);
    assert_eq!(rows, vec!["art-a1", "art-a2", "art-acme-legacy"]);
}

/// Tenet: a grant naming one duplicate's id reaches its twin.
#[tokio::test]
async fn legacy_id_grant_expands_to_twin() {
    let (_, rows) = artworks_for("designer-a2").await;
    assert_eq!(rows, vec!["art-a1", "art-a2", "art-acme-legacy"]);
}

/// Tenet: an end-client with no grant sees nothing.
#[tokio::test]
async fn empty_client_grant_is_empty_scope() {
    let (decision, rows) = artworks_for("client-empty").await;

    assert_eq!(decision, ScopeDecision::Empty(EmptyReason::NoGrant));
    assert!(rows.is_empty());
}

/// Tenet: unresolved grant values are kept as raw fallback, not dropped.
#[tokio::test]
async fn comma_joined_grant_mixes_resolved_and_raw() {
    let snapshot = agency_snapshot();
    let ctx = context(&snapshot, "agency");
    let service = service_over(snapshot, short_id_config());

    let report = service.explain(&ctx, &RequestCache::new()).await.unwrap();
    assert_eq!(report.unresolved().collect::<Vec<_>>(), vec!["c1", "c3"]);
    assert!(matches!(
        report.outcomes.iter().find(|o| o.reference == "c2").map(|o| &o.outcome),
        Some(GrantOutcome::MatchedId { .. })
    ));

    let (decision, rows) = artworks_for("agency").await;
    let scope = decision.scope().unwrap();
    assert_eq!(scope.by_id().iter().collect::<Vec<_>>(), vec!["c2"]);
    assert_eq!(scope.by_raw_fallback().iter().collect::<Vec<_>>(), vec!["c1", "c3"]);
    assert_eq!(rows, vec!["art-c1", "art-c2", "art-c3"]);
}

/// Tenet: administrators are unrestricted regardless of grant.
#[tokio::test]
async fn administrator_sees_every_artwork() {
    let (decision, rows) = artworks_for("admin").await;

    assert!(decision.is_unrestricted());
    assert_eq!(rows.len(), 8);
}

/// Tenet: deleted clients reached by id stay visible unless policy excludes them.
#[tokio::test]
async fn deleted_client_follows_policy() {
    let (decision, rows) = artworks_for("designer-deleted").await;
    assert!(decision.scope().unwrap().by_id().contains("D1"));
    assert_eq!(rows, vec!["art-d1"]);

    let snapshot = agency_snapshot();
    let ctx = context(&snapshot, "designer-deleted");
    let service = service_over(snapshot, short_id_config().with_include_deleted_clients(false));

    let report = service.explain(&ctx, &RequestCache::new()).await.unwrap();
    assert_eq!(report.decision, ScopeDecision::Empty(EmptyReason::AllExcluded));
    assert!(matches!(report.outcomes[0].outcome, GrantOutcome::ExcludedDeleted { .. }));
}

/// Tenet: range filters apply to every subset.
#[tokio::test]
async fn filters_apply_across_subsets() {
    let snapshot = agency_snapshot();
    let ctx = context(&snapshot, "client-acme");
    let service = service_over(snapshot, short_id_config());

    let result = service
        .fetch_for_user(&ctx, EntityKind::Artwork, &RangeFilters::new().with_status("approved"))
        .await
        .unwrap();
    assert_eq!(keys(&result.rows), vec!["art-a1", "art-acme-legacy"]);

    let campaigns = service
        .fetch_for_user(&ctx, EntityKind::Campaign, &RangeFilters::new())
        .await
        .unwrap();
    assert_eq!(keys(&campaigns.rows), vec!["camp-a1"]);
}

/// Tenet: an unreachable registry yields no scope at all.
#[tokio::test]
async fn registry_outage_fails_closed() {
    let snapshot = agency_snapshot();
    let ctx = context(&snapshot, "client-acme");
    let service = service_with_registry(snapshot, UnavailableRegistry, short_id_config());

    let err = service.resolve_scope(&ctx, &RequestCache::new()).await.unwrap_err();
    assert!(matches!(err, ScopeError::DirectoryLookupFailed(_)));
    assert!(err.is_retryable());
}

/// Tenet: unknown roles are rejected, never defaulted.
#[test]
fn unknown_role_is_rejected() {
    let snapshot = agency_snapshot();
    let err = snapshot.user(&UserId::from("ghost")).unwrap().context().unwrap_err();
    assert!(matches!(err, ScopeError::UnknownRole(ref role) if role == "SUPERUSER"));
}
