use serde::{Deserialize, Serialize};

use super::CriterionKey;

/// Relative importance of each rubric criterion.
///
/// Weights only matter relative to each other; the final score is normalized
/// over the criteria a profile actually specifies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionWeights {
    pub budget: f64,
    pub location: f64,
    pub property_type: f64,
    pub bedrooms: f64,
    pub intent: f64,
    pub area: f64,
    pub bathrooms: f64,
}

impl Default for CriterionWeights {
    fn default() -> Self {
        Self {
            budget: 30.0,
            location: 25.0,
            property_type: 20.0,
            bedrooms: 15.0,
            intent: 10.0,
            area: 10.0,
            bathrooms: 5.0,
        }
    }
}

impl CriterionWeights {
    pub fn weight_of(&self, criterion: CriterionKey) -> f64 {
        match criterion {
            CriterionKey::Budget => self.budget,
            CriterionKey::Location => self.location,
            CriterionKey::PropertyType => self.property_type,
            CriterionKey::Bedrooms => self.bedrooms,
            CriterionKey::Intent => self.intent,
            CriterionKey::Area => self.area,
            CriterionKey::Bathrooms => self.bathrooms,
        }
    }
}

/// Rubric configuration: weights plus the partial-credit knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub weights: CriterionWeights,
    /// Fraction a price may stray past a budget bound and still earn partial credit.
    pub price_tolerance: f64,
    /// Fraction an area may stray past an area bound and still earn partial credit.
    pub area_tolerance: f64,
    /// Credit multiplier for near-miss budget, bedroom, and area verdicts.
    pub boundary_partial_credit: f64,
    /// Credit multiplier for a region-level location hit.
    pub region_partial_credit: f64,
    /// Score handed to profiles with no specified criteria.
    pub neutral_score: u8,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            weights: CriterionWeights::default(),
            price_tolerance: 0.15,
            area_tolerance: 0.15,
            boundary_partial_credit: 0.5,
            region_partial_credit: 0.4,
            neutral_score: 50,
        }
    }
}
