use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ListingId, ProfileId};

/// Identifier for one evaluation run; part of every alert's dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub String);

/// Deterministic alert identifier.
///
/// Built from the pair plus the batch that first raised it, so concurrent
/// runs of the same batch collide on insert instead of double-alerting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(pub String);

impl AlertId {
    pub fn for_run(profile: &ProfileId, listing: &ListingId, batch: &BatchId) -> Self {
        Self(format!("{}:{}:{}", profile.0, listing.0, batch.0))
    }
}

/// Lifecycle of a surfaced match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    Notified,
    Viewed,
    Contacted,
    Dismissed,
}

impl AlertStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Notified => "notified",
            AlertStatus::Viewed => "viewed",
            AlertStatus::Contacted => "contacted",
            AlertStatus::Dismissed => "dismissed",
        }
    }

    /// Terminal alerts are closed; a later run raises a fresh one instead.
    pub const fn is_terminal(self) -> bool {
        matches!(self, AlertStatus::Contacted | AlertStatus::Dismissed)
    }
}

/// Persistent record of a match surfaced to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAlert {
    pub id: AlertId,
    pub profile_id: ProfileId,
    pub listing_id: ListingId,
    pub batch_id: BatchId,
    pub score: u8,
    pub summary: String,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchAlert {
    pub fn status_view(&self) -> MatchAlertView {
        MatchAlertView {
            id: self.id.clone(),
            profile_id: self.profile_id.clone(),
            listing_id: self.listing_id.clone(),
            score: self.score,
            status: self.status.label(),
            summary: self.summary.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Sanitized representation of an alert for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct MatchAlertView {
    pub id: AlertId,
    pub profile_id: ProfileId,
    pub listing_id: ListingId,
    pub score: u8,
    pub status: &'static str,
    pub summary: String,
    pub updated_at: DateTime<Utc>,
}

/// Storage abstraction so the dispatcher can be exercised in isolation.
pub trait AlertRepository: Send + Sync {
    fn insert(&self, alert: MatchAlert) -> Result<MatchAlert, RepositoryError>;
    fn update(&self, alert: MatchAlert) -> Result<(), RepositoryError>;
    /// The one non-terminal alert for a pair, if any.
    fn find_open(
        &self,
        profile_id: &ProfileId,
        listing_id: &ListingId,
    ) -> Result<Option<MatchAlert>, RepositoryError>;
    fn open_for_profile(&self, profile_id: &ProfileId) -> Result<Vec<MatchAlert>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// In-app notification addressed to the agent handling a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub recipient: String,
    pub priority: NotificationPriority,
    pub profile_id: ProfileId,
    pub listing_id: ListingId,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Medium,
    High,
}

impl NotificationPriority {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationPriority::Medium => "medium",
            NotificationPriority::High => "high",
        }
    }

    pub fn from_score(score: u8, high_cutoff: u8) -> Self {
        if score >= high_cutoff {
            Self::High
        } else {
            Self::Medium
        }
    }
}

/// Trait describing the outbound notification hook (e.g. the CRM inbox adapter).
pub trait NotificationGateway: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
