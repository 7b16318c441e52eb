mod config;
mod criteria;

pub use config::{CriterionWeights, EvaluationConfig};

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Listing, ListingId, ProfileId, RequirementProfile, ValidationError};

/// Stateless evaluator applying the rubric configuration to profile/listing pairs.
pub struct MatchEngine {
    config: EvaluationConfig,
}

impl MatchEngine {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Produce the per-criterion verdicts for one pair.
    ///
    /// Criteria the profile leaves unspecified appear in neither the verdict
    /// list nor the weight denominator, so sparse profiles are not punished
    /// for what they never asked about.
    pub fn evaluate(
        &self,
        profile: &RequirementProfile,
        listing: &Listing,
    ) -> Result<MatchReport, ValidationError> {
        profile.validate()?;
        listing.validate()?;

        let mut verdicts = Vec::new();
        if let Some(verdict) = criteria::budget_verdict(profile, listing, &self.config) {
            verdicts.push(verdict);
        }
        if let Some(verdict) = criteria::location_verdict(profile, listing, &self.config) {
            verdicts.push(verdict);
        }
        if let Some(verdict) = criteria::property_type_verdict(profile, listing, &self.config) {
            verdicts.push(verdict);
        }
        if let Some(verdict) = criteria::bedrooms_verdict(profile, listing, &self.config) {
            verdicts.push(verdict);
        }
        if let Some(verdict) = criteria::intent_verdict(profile, listing, &self.config) {
            verdicts.push(verdict);
        }
        if let Some(verdict) = criteria::area_verdict(profile, listing, &self.config) {
            verdicts.push(verdict);
        }
        if let Some(verdict) = criteria::bathrooms_verdict(profile, listing, &self.config) {
            verdicts.push(verdict);
        }

        let total_weight = verdicts.iter().map(|verdict| verdict.weight).sum();
        Ok(MatchReport {
            verdicts,
            total_weight,
        })
    }

    /// Evaluate a pair and fold the report into a timestamped result.
    pub fn score(
        &self,
        profile: &RequirementProfile,
        listing: &Listing,
        computed_at: DateTime<Utc>,
    ) -> Result<MatchResult, ValidationError> {
        let report = self.evaluate(profile, listing)?;
        let score = report.score_percent(self.config.neutral_score);
        Ok(MatchResult {
            profile_id: profile.id.clone(),
            listing_id: listing.id.clone(),
            score,
            verdicts: report.verdicts,
            computed_at,
        })
    }
}

/// The seven criteria the rubric may weigh for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKey {
    Budget,
    Location,
    PropertyType,
    Bedrooms,
    Intent,
    Area,
    Bathrooms,
}

impl CriterionKey {
    pub const fn label(self) -> &'static str {
        match self {
            CriterionKey::Budget => "budget",
            CriterionKey::Location => "location",
            CriterionKey::PropertyType => "property_type",
            CriterionKey::Bedrooms => "bedrooms",
            CriterionKey::Intent => "intent",
            CriterionKey::Area => "area",
            CriterionKey::Bathrooms => "bathrooms",
        }
    }
}

/// How a single criterion came out for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Match,
    Partial,
    Miss,
}

impl VerdictStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VerdictStatus::Match => "match",
            VerdictStatus::Partial => "partial",
            VerdictStatus::Miss => "miss",
        }
    }
}

/// Discrete contribution to a match score, kept for transparent audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionVerdict {
    pub criterion: CriterionKey,
    pub status: VerdictStatus,
    pub weight: f64,
    pub contribution: f64,
    pub detail: String,
}

impl CriterionVerdict {
    pub(crate) fn matched(criterion: CriterionKey, weight: f64, detail: String) -> Self {
        Self {
            criterion,
            status: VerdictStatus::Match,
            weight,
            contribution: weight,
            detail,
        }
    }

    pub(crate) fn partial(criterion: CriterionKey, weight: f64, credit: f64, detail: String) -> Self {
        Self {
            criterion,
            status: VerdictStatus::Partial,
            weight,
            contribution: weight * credit,
            detail,
        }
    }

    pub(crate) fn missed(criterion: CriterionKey, weight: f64, detail: String) -> Self {
        Self {
            criterion,
            status: VerdictStatus::Miss,
            weight,
            contribution: 0.0,
            detail,
        }
    }
}

/// Raw verdicts for one pair before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport {
    pub verdicts: Vec<CriterionVerdict>,
    pub total_weight: f64,
}

impl MatchReport {
    pub fn contribution_total(&self) -> f64 {
        self.verdicts.iter().map(|verdict| verdict.contribution).sum()
    }

    /// Normalize to 0..=100; rounding happens here and nowhere earlier.
    pub fn score_percent(&self, neutral_score: u8) -> u8 {
        if self.total_weight <= f64::EPSILON {
            return neutral_score;
        }
        let percent = self.contribution_total() / self.total_weight * 100.0;
        percent.round().clamp(0.0, 100.0) as u8
    }
}

/// Scored pair with its audit trail, ready for ranking and dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub profile_id: ProfileId,
    pub listing_id: ListingId,
    pub score: u8,
    pub verdicts: Vec<CriterionVerdict>,
    pub computed_at: DateTime<Utc>,
}

impl MatchResult {
    /// Strongest verdict details first, for notification justifications.
    pub fn top_details(&self, limit: usize) -> Vec<String> {
        let mut ranked: Vec<&CriterionVerdict> = self.verdicts.iter().collect();
        ranked.sort_by(|a, b| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap_or(Ordering::Equal)
        });
        ranked
            .into_iter()
            .take(limit)
            .map(|verdict| verdict.detail.clone())
            .collect()
    }
}
