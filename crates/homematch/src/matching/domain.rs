use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for buyer requirement profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub String);

/// Identifier wrapper for property listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

/// Saved search criteria attached to a CRM contact.
///
/// Every criterion is optional; an empty field simply leaves that criterion
/// out of the rubric for this profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementProfile {
    pub id: ProfileId,
    pub buyer_name: String,
    pub budget_min: Option<u64>,
    pub budget_max: Option<u64>,
    pub locations: Vec<String>,
    pub property_types: Vec<PropertyType>,
    pub bedrooms_min: Option<u8>,
    pub bedrooms_max: Option<u8>,
    pub bathrooms_min: Option<u8>,
    pub area_min: Option<u32>,
    pub area_max: Option<u32>,
    pub intent: IntentFilter,
    pub assigned_agent: Option<String>,
    pub archived: bool,
}

impl RequirementProfile {
    /// Reject profiles missing identity fields or carrying inverted ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.0.trim().is_empty() {
            return Err(ValidationError::MissingProfileId);
        }
        if self.buyer_name.trim().is_empty() {
            return Err(ValidationError::MissingBuyerName(self.id.0.clone()));
        }
        if let (Some(floor), Some(cap)) = (self.budget_min, self.budget_max) {
            if floor > cap {
                return Err(ValidationError::InvertedRange {
                    profile_id: self.id.0.clone(),
                    field: "budget",
                });
            }
        }
        if let (Some(floor), Some(cap)) = (self.bedrooms_min, self.bedrooms_max) {
            if floor > cap {
                return Err(ValidationError::InvertedRange {
                    profile_id: self.id.0.clone(),
                    field: "bedrooms",
                });
            }
        }
        if let (Some(floor), Some(cap)) = (self.area_min, self.area_max) {
            if floor > cap {
                return Err(ValidationError::InvertedRange {
                    profile_id: self.id.0.clone(),
                    field: "area",
                });
            }
        }
        Ok(())
    }

    /// True when at least one rubric criterion is filled in.
    pub fn specifies_any_criterion(&self) -> bool {
        self.budget_min.is_some()
            || self.budget_max.is_some()
            || self.locations.iter().any(|entry| !entry.trim().is_empty())
            || !self.property_types.is_empty()
            || self.bedrooms_min.is_some()
            || self.bedrooms_max.is_some()
            || self.bathrooms_min.is_some()
            || self.area_min.is_some()
            || self.area_max.is_some()
            || self.intent != IntentFilter::Both
    }
}

/// Advertised property snapshot as ingested from the listings feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub price: u64,
    pub city: String,
    pub address: String,
    pub state: String,
    pub property_type: PropertyType,
    pub bedrooms: u8,
    pub bathrooms: u8,
    pub area_sqm: u32,
    pub intent: ListingIntent,
    pub status: ListingStatus,
    pub listed_at: DateTime<Utc>,
}

impl Listing {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.0.trim().is_empty() {
            return Err(ValidationError::MissingListingId);
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingListingTitle(self.id.0.clone()));
        }
        if self.price == 0 {
            return Err(ValidationError::UnpricedListing(self.id.0.clone()));
        }
        Ok(())
    }

    /// Only active listings participate in matching.
    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }
}

/// Property categories carried by the listings feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    House,
    Townhouse,
    Studio,
    Duplex,
    Penthouse,
    Office,
    Warehouse,
    Land,
}

impl PropertyType {
    pub const fn label(self) -> &'static str {
        match self {
            PropertyType::Apartment => "apartment",
            PropertyType::House => "house",
            PropertyType::Townhouse => "townhouse",
            PropertyType::Studio => "studio",
            PropertyType::Duplex => "duplex",
            PropertyType::Penthouse => "penthouse",
            PropertyType::Office => "office",
            PropertyType::Warehouse => "warehouse",
            PropertyType::Land => "land",
        }
    }
}

/// Transaction kind a listing is advertised under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingIntent {
    Sale,
    Rent,
}

impl ListingIntent {
    pub const fn label(self) -> &'static str {
        match self {
            ListingIntent::Sale => "sale",
            ListingIntent::Rent => "rent",
        }
    }
}

/// Transaction kind a buyer profile is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentFilter {
    Sale,
    Rent,
    Both,
}

impl IntentFilter {
    pub const fn label(self) -> &'static str {
        match self {
            IntentFilter::Sale => "sale",
            IntentFilter::Rent => "rent",
            IntentFilter::Both => "both",
        }
    }

    pub const fn accepts(self, intent: ListingIntent) -> bool {
        matches!(
            (self, intent),
            (IntentFilter::Both, _)
                | (IntentFilter::Sale, ListingIntent::Sale)
                | (IntentFilter::Rent, ListingIntent::Rent)
        )
    }
}

/// Publication state of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Inactive,
    Withdrawn,
}

impl ListingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Inactive => "inactive",
            ListingStatus::Withdrawn => "withdrawn",
        }
    }
}

/// Error enumeration for malformed profiles and listings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("requirement profile is missing its identifier")]
    MissingProfileId,
    #[error("requirement profile {0} has no buyer name")]
    MissingBuyerName(String),
    #[error("requirement profile {profile_id} has an inverted {field} range")]
    InvertedRange {
        profile_id: String,
        field: &'static str,
    },
    #[error("listing is missing its identifier")]
    MissingListingId,
    #[error("listing {0} has no title")]
    MissingListingTitle(String),
    #[error("listing {0} carries no price")]
    UnpricedListing(String),
}
