use chrono::{DateTime, Utc};

use super::domain::{Listing, ListingId, RequirementProfile, ValidationError};
use super::evaluation::{MatchEngine, MatchResult};

/// Knobs bounding a candidate ranking pass.
#[derive(Debug, Clone)]
pub struct RankOptions {
    /// Scores below this never make the list.
    pub min_score: u8,
    /// Maximum number of ranked results returned.
    pub limit: usize,
    /// Cap on how many active listings are even scored.
    pub scan_limit: Option<usize>,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            min_score: 50,
            limit: 5,
            scan_limit: None,
        }
    }
}

/// One listing that could not be scored during a ranking pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairFailure {
    pub listing_id: ListingId,
    pub error: ValidationError,
}

/// Ranked results plus the bookkeeping callers report on.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingOutcome {
    pub ranked: Vec<MatchResult>,
    /// Active listings actually scored (after the scan cap).
    pub considered: usize,
    pub failures: Vec<PairFailure>,
}

/// Score every active listing against one profile and rank the survivors.
///
/// Ordering is total and deterministic: score descending, then freshest
/// `listed_at`, then listing id ascending. A listing that fails validation is
/// recorded and skipped; it never aborts the pass.
pub fn rank_candidates(
    engine: &MatchEngine,
    profile: &RequirementProfile,
    listings: &[Listing],
    options: &RankOptions,
    computed_at: DateTime<Utc>,
) -> Result<RankingOutcome, ValidationError> {
    profile.validate()?;

    let scan_cap = options.scan_limit.unwrap_or(usize::MAX);
    let mut scored: Vec<(MatchResult, DateTime<Utc>)> = Vec::new();
    let mut failures = Vec::new();
    let mut considered = 0usize;

    for listing in listings.iter().filter(|listing| listing.is_active()) {
        if considered >= scan_cap {
            break;
        }
        considered += 1;

        match engine.score(profile, listing, computed_at) {
            Ok(result) if result.score >= options.min_score => {
                scored.push((result, listing.listed_at));
            }
            Ok(_) => {}
            Err(error) => failures.push(PairFailure {
                listing_id: listing.id.clone(),
                error,
            }),
        }
    }

    scored.sort_by(|a, b| {
        b.0.score
            .cmp(&a.0.score)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.0.listing_id.0.cmp(&b.0.listing_id.0))
    });
    scored.truncate(options.limit);

    Ok(RankingOutcome {
        ranked: scored.into_iter().map(|(result, _)| result).collect(),
        considered,
        failures,
    })
}
