use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use super::domain::{Listing, ListingId, ProfileId, RequirementProfile, ValidationError};
use super::evaluation::MatchResult;
use super::outreach::{build_outreach_prompt, DraftRequest, DraftedMessage, MessageDrafter};
use super::ranking::RankOptions;
use super::repository::{
    AlertId, AlertRepository, AlertStatus, BatchId, MatchAlert, Notification, NotificationGateway,
    NotificationPriority, RepositoryError,
};

/// Threshold preset governing one evaluation context.
///
/// The alert threshold decides which scored pairs become alerts; the outreach
/// threshold additionally requests drafted buyer copy. Presets differ per
/// entry point, so a dashboard probe can cast wider than feed ingestion.
#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    /// Floor for a pair to appear in ranked results at all.
    pub min_score: u8,
    /// At or above this, a pair raises (or refreshes) an alert.
    pub alert_threshold: u8,
    /// At or above this, a pair additionally gets an outreach draft.
    pub outreach_threshold: u8,
    /// Scores at or above this notify with high priority.
    pub high_priority_cutoff: u8,
    pub candidate_limit: usize,
    pub scan_limit: Option<usize>,
    pub draft_timeout: Duration,
}

impl DispatchPolicy {
    /// Applied when new listings arrive from the feed.
    pub fn ingestion() -> Self {
        Self {
            min_score: 50,
            alert_threshold: 50,
            outreach_threshold: 70,
            high_priority_cutoff: 80,
            candidate_limit: 5,
            scan_limit: None,
            draft_timeout: Duration::from_secs(10),
        }
    }

    /// Wider net for interactive dashboard probes.
    pub fn dashboard() -> Self {
        Self {
            min_score: 40,
            alert_threshold: 60,
            outreach_threshold: 85,
            candidate_limit: 10,
            ..Self::ingestion()
        }
    }

    /// Scheduled digests honor the schedule's own score floor.
    pub fn scheduled_report(min_score: u8) -> Self {
        Self {
            min_score,
            alert_threshold: 55,
            outreach_threshold: 75,
            candidate_limit: 10,
            ..Self::ingestion()
        }
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.outreach_threshold <= self.alert_threshold {
            return Err(DispatchError::ThresholdOrder {
                alert: self.alert_threshold,
                outreach: self.outreach_threshold,
            });
        }
        Ok(())
    }

    pub(crate) fn rank_options(&self) -> RankOptions {
        RankOptions {
            min_score: self.min_score,
            limit: self.candidate_limit,
            scan_limit: self.scan_limit,
        }
    }
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::ingestion()
    }
}

/// What happened to one ranked pair during dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairDispatch {
    pub listing_id: ListingId,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<AlertId>,
    pub alert_created: bool,
    pub notified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<DraftedMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_error: Option<String>,
}

impl PairDispatch {
    pub fn dispatched(&self) -> bool {
        self.alert_id.is_some()
    }

    /// Outreach was owed but the collaborator could not deliver.
    pub fn message_unavailable(&self) -> bool {
        self.draft_error.is_some()
    }
}

/// Applies the dispatch policy to ranked pairs: alert persistence, handler
/// notification, and best-effort outreach drafting.
pub struct MatchDispatcher<R, N, D> {
    alerts: Arc<R>,
    notifier: Arc<N>,
    drafter: Arc<D>,
    /// BCP 47 tag for drafted outreach copy.
    language: String,
}

impl<R, N, D> MatchDispatcher<R, N, D>
where
    R: AlertRepository + 'static,
    N: NotificationGateway + 'static,
    D: MessageDrafter + 'static,
{
    pub fn new(alerts: Arc<R>, notifier: Arc<N>, drafter: Arc<D>) -> Self {
        Self {
            alerts,
            notifier,
            drafter,
            language: "pt-PT".to_string(),
        }
    }

    /// Draft outreach copy in this language instead of the default.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Dispatch one scored pair under the policy.
    ///
    /// Repository failures abort the call; notification and drafting failures
    /// do not, they are recorded on the returned outcome instead. An insert
    /// conflict means a concurrent run of the same batch already owns the
    /// pair, so the call reports it as dispatched without re-notifying.
    pub fn dispatch_pair(
        &self,
        profile: &RequirementProfile,
        listing: &Listing,
        result: &MatchResult,
        policy: &DispatchPolicy,
        batch: &BatchId,
    ) -> Result<PairDispatch, DispatchError> {
        let mut outcome = PairDispatch {
            listing_id: result.listing_id.clone(),
            score: result.score,
            alert_id: None,
            alert_created: false,
            notified: false,
            notify_error: None,
            message: None,
            draft_error: None,
        };

        if result.score < policy.alert_threshold {
            return Ok(outcome);
        }

        let summary = result.top_details(3).join("; ");
        let handler = profile
            .assigned_agent
            .as_deref()
            .map(str::trim)
            .filter(|agent| !agent.is_empty());

        // Set when this dispatch owes the handler a notification. Alert state
        // is persisted before the gateway call; a failed notify is recorded on
        // the outcome, never retried by a later run.
        let mut notify_as: Option<&str> = None;

        match self
            .alerts
            .find_open(&result.profile_id, &result.listing_id)?
        {
            Some(mut alert) => {
                // A still-open alert is refreshed in place; only a pending one
                // that just gained a handler notifies.
                let first_notify = alert.status == AlertStatus::Pending && handler.is_some();
                alert.score = result.score;
                alert.summary = summary.clone();
                alert.batch_id = batch.clone();
                alert.updated_at = result.computed_at;
                if first_notify {
                    alert.status = AlertStatus::Notified;
                    notify_as = handler;
                }
                outcome.alert_id = Some(alert.id.clone());
                self.alerts.update(alert)?;
            }
            None => {
                let id = AlertId::for_run(&result.profile_id, &result.listing_id, batch);
                let status = if handler.is_some() {
                    AlertStatus::Notified
                } else {
                    AlertStatus::Pending
                };
                let alert = MatchAlert {
                    id: id.clone(),
                    profile_id: result.profile_id.clone(),
                    listing_id: result.listing_id.clone(),
                    batch_id: batch.clone(),
                    score: result.score,
                    summary: summary.clone(),
                    status,
                    created_at: result.computed_at,
                    updated_at: result.computed_at,
                };

                match self.alerts.insert(alert) {
                    Ok(_) => {
                        outcome.alert_id = Some(id);
                        outcome.alert_created = true;
                        notify_as = handler;
                    }
                    Err(RepositoryError::Conflict) => {
                        debug!(alert = %id.0, "match alert already dispatched for this batch");
                        outcome.alert_id = Some(id);
                        return Ok(outcome);
                    }
                    Err(other) => return Err(other.into()),
                }
            }
        }

        if let Some(agent) = notify_as {
            let mut metadata = BTreeMap::new();
            metadata.insert("batch".to_string(), batch.0.clone());
            metadata.insert("score".to_string(), result.score.to_string());

            let notification = Notification {
                title: format!("New match for {}", profile.buyer_name),
                message: format!("{} scored {}%: {}", listing.title, result.score, summary),
                recipient: agent.to_string(),
                priority: NotificationPriority::from_score(
                    result.score,
                    policy.high_priority_cutoff,
                ),
                profile_id: result.profile_id.clone(),
                listing_id: result.listing_id.clone(),
                metadata,
            };

            match self.notifier.notify(notification) {
                Ok(()) => outcome.notified = true,
                Err(error) => {
                    warn!(listing = %result.listing_id.0, %error, "match notification failed");
                    outcome.notify_error = Some(error.to_string());
                }
            }
        }

        if result.score >= policy.outreach_threshold {
            let prompt = build_outreach_prompt(profile, listing, result, &self.language);
            match self.drafter.draft(DraftRequest {
                prompt,
                timeout: policy.draft_timeout,
            }) {
                Ok(message) => outcome.message = Some(message),
                Err(error) => {
                    warn!(listing = %result.listing_id.0, %error, "outreach draft unavailable");
                    outcome.draft_error = Some(error.to_string());
                }
            }
        }

        Ok(outcome)
    }

    /// Open alerts for a profile, strongest first.
    pub fn open_alerts(&self, profile_id: &ProfileId) -> Result<Vec<MatchAlert>, RepositoryError> {
        let mut alerts = self.alerts.open_for_profile(profile_id)?;
        alerts.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(alerts)
    }
}

/// Error raised by dispatch and the pipeline around it.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("outreach threshold {outreach} must sit strictly above the alert threshold {alert}")]
    ThresholdOrder { alert: u8, outreach: u8 },
    #[error("ranked listing {0} is missing from the evaluated set")]
    MissingListing(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
