use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::domain::{IntentFilter, Listing, RequirementProfile};
use super::evaluation::MatchResult;

/// One drafting call to the text-generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRequest {
    pub prompt: String,
    /// Implementations must give up after this long; drafting is best effort.
    pub timeout: Duration,
}

/// Buyer-facing copy returned by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftedMessage {
    pub subject: String,
    pub body: String,
}

/// Drafting failure; never fatal to the run that requested it.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("draft timed out after {0:?}")]
    Timeout(Duration),
    #[error("draft service unavailable: {0}")]
    Unavailable(String),
    #[error("draft rejected: {0}")]
    Rejected(String),
}

/// Trait describing the opaque text-generation collaborator.
pub trait MessageDrafter: Send + Sync {
    fn draft(&self, request: DraftRequest) -> Result<DraftedMessage, DraftError>;
}

/// Assemble the drafting prompt from the pair and its strongest verdicts.
pub fn build_outreach_prompt(
    profile: &RequirementProfile,
    listing: &Listing,
    result: &MatchResult,
    language: &str,
) -> String {
    let mut prompt = String::new();

    writeln!(
        &mut prompt,
        "Draft a short, warm real-estate outreach message in {language}."
    )
    .expect("write instruction");
    writeln!(&mut prompt, "Buyer: {}", profile.buyer_name).expect("write buyer");
    writeln!(
        &mut prompt,
        "Buyer requirements: {}",
        describe_requirements(profile)
    )
    .expect("write requirements");
    writeln!(
        &mut prompt,
        "Listing: {} | {} for {} at €{} | {} bedroom(s), {} bathroom(s), {} m2 | {}, {}",
        listing.title,
        listing.property_type.label(),
        listing.intent.label(),
        listing.price,
        listing.bedrooms,
        listing.bathrooms,
        listing.area_sqm,
        listing.city,
        listing.state
    )
    .expect("write listing facts");
    writeln!(&mut prompt, "Match score: {}%", result.score).expect("write score");

    let reasons = result.top_details(3);
    if !reasons.is_empty() {
        writeln!(&mut prompt, "Why it fits: {}", reasons.join("; ")).expect("write reasons");
    }

    writeln!(
        &mut prompt,
        "Keep it under 120 words, mention why it fits, and invite the buyer to a viewing."
    )
    .expect("write closing instruction");

    prompt
}

/// Human-readable one-liner of everything the profile asks for.
pub fn describe_requirements(profile: &RequirementProfile) -> String {
    let mut parts: Vec<String> = Vec::new();

    match (profile.budget_min, profile.budget_max) {
        (Some(floor), Some(cap)) => parts.push(format!("budget €{floor} to €{cap}")),
        (Some(floor), None) => parts.push(format!("budget at least €{floor}")),
        (None, Some(cap)) => parts.push(format!("budget up to €{cap}")),
        (None, None) => {}
    }

    let areas: Vec<&str> = profile
        .locations
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .collect();
    if !areas.is_empty() {
        parts.push(format!("locations {}", areas.join("/")));
    }

    if !profile.property_types.is_empty() {
        let kinds: Vec<&str> = profile
            .property_types
            .iter()
            .map(|kind| kind.label())
            .collect();
        parts.push(format!("types {}", kinds.join("/")));
    }

    match (profile.bedrooms_min, profile.bedrooms_max) {
        (Some(floor), Some(cap)) if floor == cap => {
            parts.push(format!("exactly {floor} bedroom(s)"))
        }
        (Some(floor), Some(cap)) => parts.push(format!("{floor} to {cap} bedroom(s)")),
        (Some(floor), None) => parts.push(format!("at least {floor} bedroom(s)")),
        (None, Some(cap)) => parts.push(format!("at most {cap} bedroom(s)")),
        (None, None) => {}
    }

    if let Some(floor) = profile.bathrooms_min {
        parts.push(format!("at least {floor} bathroom(s)"));
    }

    match (profile.area_min, profile.area_max) {
        (Some(floor), Some(cap)) => parts.push(format!("{floor} to {cap} m2")),
        (Some(floor), None) => parts.push(format!("at least {floor} m2")),
        (None, Some(cap)) => parts.push(format!("up to {cap} m2")),
        (None, None) => {}
    }

    if profile.intent != IntentFilter::Both {
        parts.push(format!("looking to {}", match profile.intent {
            IntentFilter::Sale => "buy",
            IntentFilter::Rent => "rent",
            IntentFilter::Both => "buy or rent",
        }));
    }

    if parts.is_empty() {
        "no specific requirements recorded".to_string()
    } else {
        parts.join("; ")
    }
}
