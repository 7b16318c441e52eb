use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::dispatch::{DispatchError, DispatchPolicy, MatchDispatcher, PairDispatch};
use super::domain::{Listing, ListingId, ProfileId, RequirementProfile, ValidationError};
use super::evaluation::{MatchEngine, MatchResult};
use super::outreach::MessageDrafter;
use super::ranking::{rank_candidates, PairFailure, RankOptions, RankingOutcome};
use super::repository::{
    AlertRepository, BatchId, MatchAlert, NotificationGateway, RepositoryError,
};

/// Identity of one evaluation run: the batch key plus its clock reading.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub batch_id: BatchId,
    pub now: DateTime<Utc>,
}

impl RunContext {
    pub fn new(batch: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            batch_id: BatchId(batch.into()),
            now,
        }
    }
}

/// End-to-end match pipeline: evaluate, rank, dispatch.
pub struct MatchPipeline<R, N, D> {
    engine: MatchEngine,
    dispatcher: MatchDispatcher<R, N, D>,
}

impl<R, N, D> MatchPipeline<R, N, D>
where
    R: AlertRepository + 'static,
    N: NotificationGateway + 'static,
    D: MessageDrafter + 'static,
{
    pub fn new(engine: MatchEngine, dispatcher: MatchDispatcher<R, N, D>) -> Self {
        Self { engine, dispatcher }
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    /// Pure ranking pass with no side effects, for dashboard probes.
    pub fn rank(
        &self,
        profile: &RequirementProfile,
        listings: &[Listing],
        options: &RankOptions,
        computed_at: DateTime<Utc>,
    ) -> Result<RankingOutcome, ValidationError> {
        rank_candidates(&self.engine, profile, listings, options, computed_at)
    }

    /// Rank one profile against the listings and dispatch every survivor.
    pub fn run_for_profile(
        &self,
        profile: &RequirementProfile,
        listings: &[Listing],
        policy: &DispatchPolicy,
        ctx: &RunContext,
    ) -> Result<ProfileRunReport, DispatchError> {
        policy.validate()?;

        let ranking = rank_candidates(
            &self.engine,
            profile,
            listings,
            &policy.rank_options(),
            ctx.now,
        )?;

        let mut dispatches = Vec::with_capacity(ranking.ranked.len());
        for result in &ranking.ranked {
            // Ranked ids come from this same slice; a miss here means the
            // inputs were mutated mid-run and the report would be wrong.
            let listing = listings
                .iter()
                .find(|listing| listing.id == result.listing_id)
                .ok_or_else(|| DispatchError::MissingListing(result.listing_id.0.clone()))?;
            dispatches.push(self.dispatcher.dispatch_pair(
                profile,
                listing,
                result,
                policy,
                &ctx.batch_id,
            )?);
        }

        Ok(ProfileRunReport {
            profile_id: profile.id.clone(),
            considered: ranking.considered,
            results: ranking.ranked,
            dispatches,
            failures: ranking.failures,
        })
    }

    /// Run every live profile in turn; one profile's failure never stops the rest.
    pub fn run_batch(
        &self,
        profiles: &[RequirementProfile],
        listings: &[Listing],
        policy: &DispatchPolicy,
        ctx: &RunContext,
    ) -> BatchRunReport {
        let mut reports = Vec::new();
        let mut errors = Vec::new();
        let mut skipped_archived = 0usize;

        for profile in profiles {
            if profile.archived {
                skipped_archived += 1;
                continue;
            }
            match self.run_for_profile(profile, listings, policy, ctx) {
                Ok(report) => reports.push(report),
                Err(error) => {
                    warn!(profile = %profile.id.0, %error, "profile match run failed");
                    errors.push(ProfileRunFailure {
                        profile_id: profile.id.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        info!(
            batch = %ctx.batch_id.0,
            processed = reports.len(),
            failed = errors.len(),
            skipped_archived,
            "match batch completed"
        );

        BatchRunReport {
            batch_id: ctx.batch_id.clone(),
            processed: reports.len(),
            failed: errors.len(),
            skipped_archived,
            reports,
            errors,
        }
    }

    /// Open alerts for one profile, strongest first.
    pub fn open_alerts(&self, profile_id: &ProfileId) -> Result<Vec<MatchAlert>, RepositoryError> {
        self.dispatcher.open_alerts(profile_id)
    }
}

/// Outcome of one profile's pass over the listings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRunReport {
    pub profile_id: ProfileId,
    /// Active listings scored for this profile.
    pub considered: usize,
    pub results: Vec<MatchResult>,
    pub dispatches: Vec<PairDispatch>,
    pub failures: Vec<PairFailure>,
}

impl ProfileRunReport {
    pub fn alerts_raised(&self) -> usize {
        self.dispatches
            .iter()
            .filter(|dispatch| dispatch.dispatched())
            .count()
    }

    pub fn messages_drafted(&self) -> usize {
        self.dispatches
            .iter()
            .filter(|dispatch| dispatch.message.is_some())
            .count()
    }

    pub fn summary_view(&self) -> ProfileRunView {
        ProfileRunView {
            profile_id: self.profile_id.clone(),
            considered: self.considered,
            alerts_raised: self.alerts_raised(),
            messages_drafted: self.messages_drafted(),
            matches: self.results.clone(),
            dispatches: self.dispatches.clone(),
            failures: self
                .failures
                .iter()
                .map(|failure| PairFailureView {
                    listing_id: failure.listing_id.clone(),
                    error: failure.error.to_string(),
                })
                .collect(),
        }
    }
}

/// One profile that failed wholesale during a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRunFailure {
    pub profile_id: ProfileId,
    pub error: String,
}

/// Batch-level accounting across profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRunReport {
    pub batch_id: BatchId,
    pub processed: usize,
    pub failed: usize,
    pub skipped_archived: usize,
    pub reports: Vec<ProfileRunReport>,
    pub errors: Vec<ProfileRunFailure>,
}

impl BatchRunReport {
    pub fn summary_view(&self) -> BatchRunView {
        BatchRunView {
            batch_id: self.batch_id.clone(),
            processed: self.processed,
            failed: self.failed,
            skipped_archived: self.skipped_archived,
            profiles: self
                .reports
                .iter()
                .map(ProfileRunReport::summary_view)
                .collect(),
            errors: self.errors.clone(),
        }
    }
}

/// Serializable projection of a profile run for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileRunView {
    pub profile_id: ProfileId,
    pub considered: usize,
    pub alerts_raised: usize,
    pub messages_drafted: usize,
    pub matches: Vec<MatchResult>,
    pub dispatches: Vec<PairDispatch>,
    pub failures: Vec<PairFailureView>,
}

/// Stringified pair failure for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct PairFailureView {
    pub listing_id: ListingId,
    pub error: String,
}

/// Serializable projection of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRunView {
    pub batch_id: BatchId,
    pub processed: usize,
    pub failed: usize,
    pub skipped_archived: usize,
    pub profiles: Vec<ProfileRunView>,
    pub errors: Vec<ProfileRunFailure>,
}
