//! Buyer-profile match scoring and notification dispatch.
//!
//! Listings are scored against requirement profiles with a weighted rubric,
//! ranked deterministically, and pushed through a dispatch stage that raises
//! alerts, notifies handling agents, and drafts outreach copy for the
//! strongest pairs.

pub mod dispatch;
pub mod domain;
pub(crate) mod evaluation;
pub mod outreach;
pub mod pipeline;
pub(crate) mod ranking;
pub mod repository;
pub mod router;

#[cfg(test)]
mod tests;

pub use dispatch::{DispatchError, DispatchPolicy, MatchDispatcher, PairDispatch};
pub use domain::{
    IntentFilter, Listing, ListingId, ListingIntent, ListingStatus, ProfileId, PropertyType,
    RequirementProfile, ValidationError,
};
pub use evaluation::{
    CriterionKey, CriterionVerdict, CriterionWeights, EvaluationConfig, MatchEngine, MatchReport,
    MatchResult, VerdictStatus,
};
pub use outreach::{
    build_outreach_prompt, describe_requirements, DraftError, DraftRequest, DraftedMessage,
    MessageDrafter,
};
pub use pipeline::{
    BatchRunReport, BatchRunView, MatchPipeline, PairFailureView, ProfileRunFailure,
    ProfileRunReport, ProfileRunView, RunContext,
};
pub use ranking::{rank_candidates, PairFailure, RankOptions, RankingOutcome};
pub use repository::{
    AlertId, AlertRepository, AlertStatus, BatchId, MatchAlert, MatchAlertView, Notification,
    NotificationGateway, NotificationPriority, NotifyError, RepositoryError,
};
pub use router::matching_router;
