use super::common::*;
use crate::matching::domain::{ListingId, ListingStatus, ValidationError};
use crate::matching::ranking::{rank_candidates, RankOptions};

#[test]
fn ranking_orders_matches_by_score_then_recency_then_id() {
    let profile = budget_location_profile();
    let mut older_full = listing_with("lst-c", 290_000);
    older_full.listed_at = run_time() - chrono::Duration::days(5);
    let newer_full = listing_with("lst-a", 290_000);
    let mut partial = listing_with("lst-b", 340_000);
    partial.listed_at = run_time() - chrono::Duration::days(1);
    let listings = vec![partial, older_full, newer_full];

    let outcome = rank_candidates(
        &engine(),
        &profile,
        &listings,
        &RankOptions::default(),
        run_time(),
    )
    .expect("ranking succeeds");

    let ids: Vec<&str> = outcome
        .ranked
        .iter()
        .map(|result| result.listing_id.0.as_str())
        .collect();
    assert_eq!(ids, vec!["lst-a", "lst-c", "lst-b"]);
    assert_eq!(outcome.ranked[0].score, 100);
    assert_eq!(outcome.ranked[2].score, 73);
}

#[test]
fn equal_scores_and_times_order_by_listing_id() {
    let profile = budget_location_profile();
    let listings = vec![listing_with("lst-b", 290_000), listing_with("lst-a", 290_000)];

    let outcome = rank_candidates(
        &engine(),
        &profile,
        &listings,
        &RankOptions::default(),
        run_time(),
    )
    .expect("ranking succeeds");

    let ids: Vec<&str> = outcome
        .ranked
        .iter()
        .map(|result| result.listing_id.0.as_str())
        .collect();
    assert_eq!(ids, vec!["lst-a", "lst-b"]);
}

#[test]
fn inactive_listings_are_never_considered() {
    let profile = budget_location_profile();
    let mut delisted = listing_with("lst-off", 290_000);
    delisted.status = ListingStatus::Inactive;
    let mut withdrawn = listing_with("lst-gone", 290_000);
    withdrawn.status = ListingStatus::Withdrawn;
    let listings = vec![delisted, listing_with("lst-live", 290_000), withdrawn];

    let outcome = rank_candidates(
        &engine(),
        &profile,
        &listings,
        &RankOptions::default(),
        run_time(),
    )
    .expect("ranking succeeds");

    assert_eq!(outcome.considered, 1);
    assert_eq!(outcome.ranked.len(), 1);
    assert_eq!(outcome.ranked[0].listing_id, ListingId("lst-live".to_string()));
}

#[test]
fn scan_limit_caps_evaluated_listings() {
    let profile = budget_location_profile();
    let listings = vec![
        listing_with("lst-a", 290_000),
        listing_with("lst-b", 290_000),
        listing_with("lst-c", 290_000),
    ];
    let options = RankOptions {
        scan_limit: Some(2),
        ..RankOptions::default()
    };

    let outcome = rank_candidates(&engine(), &profile, &listings, &options, run_time())
        .expect("ranking succeeds");

    assert_eq!(outcome.considered, 2);
    assert_eq!(outcome.ranked.len(), 2);
}

#[test]
fn limit_truncates_after_ordering() {
    let profile = budget_location_profile();
    let listings = vec![
        listing_with("lst-partial", 340_000),
        listing_with("lst-a", 290_000),
        listing_with("lst-b", 290_000),
    ];
    let options = RankOptions {
        limit: 2,
        ..RankOptions::default()
    };

    let outcome = rank_candidates(&engine(), &profile, &listings, &options, run_time())
        .expect("ranking succeeds");

    assert_eq!(outcome.considered, 3);
    let ids: Vec<&str> = outcome
        .ranked
        .iter()
        .map(|result| result.listing_id.0.as_str())
        .collect();
    assert_eq!(ids, vec!["lst-a", "lst-b"], "the partial match is cut, not a full one");
}

#[test]
fn scores_below_the_floor_are_dropped() {
    let mut profile = empty_profile();
    profile.locations = vec!["Cascais".to_string()];
    let mut regional = listing_with("lst-region", 290_000);
    regional.city = "Carcavelos".to_string();
    regional.address = "Avenida do Mar 12".to_string();
    regional.state = "Cascais".to_string();

    let outcome = rank_candidates(
        &engine(),
        &profile,
        &[regional],
        &RankOptions::default(),
        run_time(),
    )
    .expect("ranking succeeds");

    assert_eq!(outcome.considered, 1);
    assert!(outcome.ranked.is_empty(), "40 sits below the default floor of 50");
}

#[test]
fn invalid_listing_is_reported_not_fatal() {
    let profile = budget_location_profile();
    let listings = vec![listing_with("lst-free", 0), listing_with("lst-good", 290_000)];

    let outcome = rank_candidates(
        &engine(),
        &profile,
        &listings,
        &RankOptions::default(),
        run_time(),
    )
    .expect("ranking succeeds");

    assert_eq!(outcome.considered, 2);
    assert_eq!(outcome.ranked.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(
        outcome.failures[0].error,
        ValidationError::UnpricedListing("lst-free".to_string())
    );
}

#[test]
fn reordering_the_input_does_not_change_the_ranking() {
    let profile = budget_location_profile();
    let mut listings = vec![
        listing_with("lst-a", 290_000),
        listing_with("lst-b", 340_000),
        listing_with("lst-c", 295_000),
    ];

    let first = rank_candidates(
        &engine(),
        &profile,
        &listings,
        &RankOptions::default(),
        run_time(),
    )
    .expect("ranking succeeds");
    listings.reverse();
    let second = rank_candidates(
        &engine(),
        &profile,
        &listings,
        &RankOptions::default(),
        run_time(),
    )
    .expect("ranking succeeds");

    assert_eq!(first.ranked, second.ranked);
}
