//! Federation behavior under failing and slow entity stores.
//!
//! Core guarantees exercised here:
//! - At most one lookup per non-empty subset, none for an empty scope.
//! - A failing subset degrades to a partial result, not an error.
//! - The request deadline cancels outstanding lookups.

use pretty_assertions::assert_eq;
use scope_core::prelude::*;
use scope_core::{FieldMatch, ScopeSubset, UserId};
use scope_test_utils::{agency_snapshot, keys, service_with_lookup, short_id_config, FaultyLookup};
use std::sync::Arc;
use std::time::Duration;

fn context(user: &str) -> UserContext {
    agency_snapshot()
        .user(&UserId::from(user))
        .unwrap()
        .context()
        .unwrap()
}

fn faulty() -> FaultyLookup<Snapshot> {
    FaultyLookup::new(agency_snapshot())
}

/// Tenet: each non-empty subset is queried once with its own match mode.
#[tokio::test]
async fn one_lookup_per_subset() {
    let lookup = Arc::new(faulty());
    let service = service_with_lookup(agency_snapshot(), lookup.clone(), short_id_config());

    let result = service
        .fetch_for_user(&context("agency"), EntityKind::Artwork, &RangeFilters::new())
        .await
        .unwrap();
    assert_eq!(keys(&result.rows), vec!["art-c1", "art-c2", "art-c3"]);

    let mut calls: Vec<(String, FieldMatch)> = lookup
        .scoped_calls()
        .into_iter()
        .map(|q| (q.values.join(","), q.field_match))
        .collect();
    calls.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        calls,
        vec![
            ("Gamma Foods".to_string(), FieldMatch::CaseInsensitive),
            ("c1,c3".to_string(), FieldMatch::Exact),
            ("c2".to_string(), FieldMatch::Exact),
        ]
    );
    assert_eq!(lookup.unscoped_calls(), 0);
}

/// Tenet: an empty scope issues no lookups at all.
#[tokio::test]
async fn empty_scope_issues_no_lookups() {
    let lookup = Arc::new(faulty());
    let service = service_with_lookup(agency_snapshot(), lookup.clone(), short_id_config());

    let result = service
        .fetch_for_user(&context("client-empty"), EntityKind::Artwork, &RangeFilters::new())
        .await
        .unwrap();

    assert!(result.is_empty());
    assert!(!result.partial);
    assert!(lookup.scoped_calls().is_empty());
    assert_eq!(lookup.unscoped_calls(), 0);
}

/// Tenet: administrators get exactly one unscoped lookup.
#[tokio::test]
async fn administrator_issues_single_unscoped_lookup() {
    let lookup = Arc::new(faulty());
    let service = service_with_lookup(agency_snapshot(), lookup.clone(), short_id_config());

    let result = service
        .fetch_for_user(&context("admin"), EntityKind::Artwork, &RangeFilters::new())
        .await
        .unwrap();

    assert_eq!(result.len(), 8);
    assert_eq!(lookup.unscoped_calls(), 1);
    assert!(lookup.scoped_calls().is_empty());
}

/// Tenet: one failing subset leaves the others' rows intact and flags the result.
#[tokio::test]
async fn failing_subset_yields_partial_result() {
    let lookup = Arc::new(faulty().failing_on("c1"));
    let service = service_with_lookup(agency_snapshot(), lookup, short_id_config());

    let result = service
        .fetch_for_user(&context("agency"), EntityKind::Artwork, &RangeFilters::new())
        .await
        .unwrap();

    assert!(result.partial);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].subset, ScopeSubset::ByRawFallback);
    assert!(result.failures[0].retryable);
    assert_eq!(keys(&result.rows), vec!["art-c2"]);
}

/// Tenet: when nothing succeeds the caller gets an error, not an empty page.
#[tokio::test]
async fn every_subset_failing_is_an_error() {
    let lookup = Arc::new(faulty().failing_on("c2"));
    let service = service_with_lookup(agency_snapshot(), lookup, short_id_config());
    let cache = RequestCache::new();
    let decision = service.resolve_scope(&context("designer-deleted"), &cache).await.unwrap();

    let only_c2 = ScopeDecision::Restricted(scope_core::ResolvedScope::new(
        vec!["c2".to_string()],
        Vec::new(),
        Vec::new(),
    ));
    let err = service
        .fetch_scoped(EntityKind::Artwork, &only_c2, &RangeFilters::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ScopeError::FederationFailed { .. }));
    assert!(err.is_retryable());

    // unrelated scope on the same service is unaffected
    let ok = service
        .fetch_scoped(EntityKind::Artwork, &decision, &RangeFilters::new())
        .await
        .unwrap();
    assert_eq!(keys(&ok.rows), vec!["art-d1"]);
}

/// Tenet: the deadline cancels slow lookups instead of returning silent partial data.
#[tokio::test(start_paused = true)]
async fn deadline_expiry_is_an_error() {
    let lookup = Arc::new(faulty().with_delay(Duration::from_secs(30)));
    let service = service_with_lookup(
        agency_snapshot(),
        lookup,
        short_id_config().with_request_timeout_ms(50),
    );

    let err = service
        .fetch_for_user(&context("client-acme"), EntityKind::Artwork, &RangeFilters::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ScopeError::DeadlineExceeded { timeout_ms: 50 }));
    assert!(err.is_retryable());
}

/// Tenet: lookups finishing inside the deadline are unaffected by it.
#[tokio::test(start_paused = true)]
async fn slow_but_timely_lookups_complete() {
    let lookup = Arc::new(faulty().with_delay(Duration::from_millis(20)));
    let service = service_with_lookup(
        agency_snapshot(),
        lookup,
        short_id_config().with_request_timeout_ms(1_000),
    );

    let result = service
        .fetch_for_user(&context("client-acme"), EntityKind::Artwork, &RangeFilters::new())
        .await
        .unwrap();
    assert_eq!(keys(&result.rows), vec!["art-a1", "art-a2", "art-acme-legacy"]);
}
