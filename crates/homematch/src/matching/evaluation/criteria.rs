//! Verdict functions for the seven rubric criteria.
//!
//! Each function returns `None` when the profile leaves the criterion
//! unspecified, keeping it out of both the contribution sum and the weight
//! denominator.

use super::config::EvaluationConfig;
use super::{CriterionKey, CriterionVerdict};
use crate::matching::domain::{IntentFilter, Listing, RequirementProfile};

pub(super) fn budget_verdict(
    profile: &RequirementProfile,
    listing: &Listing,
    config: &EvaluationConfig,
) -> Option<CriterionVerdict> {
    let (floor, cap) = (profile.budget_min, profile.budget_max);
    if floor.is_none() && cap.is_none() {
        return None;
    }

    let weight = config.weights.budget;
    let price = listing.price;
    let below = floor.filter(|bound| price < *bound);
    let above = cap.filter(|bound| price > *bound);

    let verdict = match (below, above) {
        (None, None) => {
            let range = describe_money_range(floor, cap);
            CriterionVerdict::matched(
                CriterionKey::Budget,
                weight,
                format!("price €{price} sits inside the requested budget ({range})"),
            )
        }
        (_, Some(bound)) => {
            let over = percent_over(price, bound);
            if within_tolerance_above(price, bound, config.price_tolerance) {
                CriterionVerdict::partial(
                    CriterionKey::Budget,
                    weight,
                    config.boundary_partial_credit,
                    format!("price €{price} runs {over:.0}% over the €{bound} budget cap"),
                )
            } else {
                CriterionVerdict::missed(
                    CriterionKey::Budget,
                    weight,
                    format!("price €{price} exceeds the €{bound} budget cap by {over:.0}%"),
                )
            }
        }
        (Some(bound), None) => {
            let under = percent_under(price, bound);
            if within_tolerance_below(price, bound, config.price_tolerance) {
                CriterionVerdict::partial(
                    CriterionKey::Budget,
                    weight,
                    config.boundary_partial_credit,
                    format!("price €{price} sits {under:.0}% under the €{bound} budget floor"),
                )
            } else {
                CriterionVerdict::missed(
                    CriterionKey::Budget,
                    weight,
                    format!("price €{price} falls {under:.0}% below the €{bound} budget floor"),
                )
            }
        }
    };

    Some(verdict)
}

pub(super) fn location_verdict(
    profile: &RequirementProfile,
    listing: &Listing,
    config: &EvaluationConfig,
) -> Option<CriterionVerdict> {
    let wanted: Vec<&str> = profile
        .locations
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .collect();
    if wanted.is_empty() {
        return None;
    }

    let weight = config.weights.location;
    for area in &wanted {
        if overlaps(area, &listing.city) || overlaps(area, &listing.address) {
            return Some(CriterionVerdict::matched(
                CriterionKey::Location,
                weight,
                format!("{} matches the requested location \"{area}\"", listing.city),
            ));
        }
    }
    for area in &wanted {
        if overlaps(area, &listing.state) {
            return Some(CriterionVerdict::partial(
                CriterionKey::Location,
                weight,
                config.region_partial_credit,
                format!(
                    "{} sits in {}, the region requested as \"{area}\"",
                    listing.city, listing.state
                ),
            ));
        }
    }

    Some(CriterionVerdict::missed(
        CriterionKey::Location,
        weight,
        format!(
            "{} ({}) is outside every requested location",
            listing.city, listing.state
        ),
    ))
}

pub(super) fn property_type_verdict(
    profile: &RequirementProfile,
    listing: &Listing,
    config: &EvaluationConfig,
) -> Option<CriterionVerdict> {
    if profile.property_types.is_empty() {
        return None;
    }

    let weight = config.weights.property_type;
    let verdict = if profile.property_types.contains(&listing.property_type) {
        CriterionVerdict::matched(
            CriterionKey::PropertyType,
            weight,
            format!(
                "{} is one of the requested property types",
                listing.property_type.label()
            ),
        )
    } else {
        let requested = profile
            .property_types
            .iter()
            .map(|kind| kind.label())
            .collect::<Vec<_>>()
            .join(", ");
        CriterionVerdict::missed(
            CriterionKey::PropertyType,
            weight,
            format!(
                "{} is not among the requested types ({requested})",
                listing.property_type.label()
            ),
        )
    };

    Some(verdict)
}

pub(super) fn bedrooms_verdict(
    profile: &RequirementProfile,
    listing: &Listing,
    config: &EvaluationConfig,
) -> Option<CriterionVerdict> {
    let (floor, cap) = (profile.bedrooms_min, profile.bedrooms_max);
    if floor.is_none() && cap.is_none() {
        return None;
    }

    let weight = config.weights.bedrooms;
    let count = listing.bedrooms;
    let below = floor.filter(|bound| count < *bound);
    let above = cap.filter(|bound| count > *bound);

    let verdict = match (below, above) {
        (None, None) => {
            let range = describe_count_range(floor, cap, "bedroom(s)");
            CriterionVerdict::matched(
                CriterionKey::Bedrooms,
                weight,
                format!("{count} bedroom(s) fits the request for {range}"),
            )
        }
        (Some(bound), _) => {
            let gap = bound - count;
            if gap == 1 {
                CriterionVerdict::partial(
                    CriterionKey::Bedrooms,
                    weight,
                    config.boundary_partial_credit,
                    format!("{count} bedroom(s) is one short of the requested minimum of {bound}"),
                )
            } else {
                CriterionVerdict::missed(
                    CriterionKey::Bedrooms,
                    weight,
                    format!("{count} bedroom(s) falls {gap} short of the requested minimum of {bound}"),
                )
            }
        }
        (None, Some(bound)) => {
            let gap = count - bound;
            if gap == 1 {
                CriterionVerdict::partial(
                    CriterionKey::Bedrooms,
                    weight,
                    config.boundary_partial_credit,
                    format!("{count} bedroom(s) is one over the requested maximum of {bound}"),
                )
            } else {
                CriterionVerdict::missed(
                    CriterionKey::Bedrooms,
                    weight,
                    format!("{count} bedroom(s) is {gap} over the requested maximum of {bound}"),
                )
            }
        }
    };

    Some(verdict)
}

pub(super) fn intent_verdict(
    profile: &RequirementProfile,
    listing: &Listing,
    config: &EvaluationConfig,
) -> Option<CriterionVerdict> {
    // "both" accepts anything, so it carries no signal and stays out of the rubric.
    if profile.intent == IntentFilter::Both {
        return None;
    }

    let weight = config.weights.intent;
    let verdict = if profile.intent.accepts(listing.intent) {
        CriterionVerdict::matched(
            CriterionKey::Intent,
            weight,
            format!("offered for {} as requested", listing.intent.label()),
        )
    } else {
        CriterionVerdict::missed(
            CriterionKey::Intent,
            weight,
            format!(
                "offered for {} but the profile asks for {}",
                listing.intent.label(),
                profile.intent.label()
            ),
        )
    };

    Some(verdict)
}

pub(super) fn area_verdict(
    profile: &RequirementProfile,
    listing: &Listing,
    config: &EvaluationConfig,
) -> Option<CriterionVerdict> {
    let (floor, cap) = (profile.area_min, profile.area_max);
    if floor.is_none() && cap.is_none() {
        return None;
    }

    let weight = config.weights.area;
    let area = u64::from(listing.area_sqm);
    let below = floor.map(u64::from).filter(|bound| area < *bound);
    let above = cap.map(u64::from).filter(|bound| area > *bound);

    let verdict = match (below, above) {
        (None, None) => {
            let range = describe_area_range(floor, cap);
            CriterionVerdict::matched(
                CriterionKey::Area,
                weight,
                format!("usable area {area} m2 fits the requested {range}"),
            )
        }
        (_, Some(bound)) => {
            let over = percent_over(area, bound);
            if within_tolerance_above(area, bound, config.area_tolerance) {
                CriterionVerdict::partial(
                    CriterionKey::Area,
                    weight,
                    config.boundary_partial_credit,
                    format!("usable area {area} m2 runs {over:.0}% over the {bound} m2 cap"),
                )
            } else {
                CriterionVerdict::missed(
                    CriterionKey::Area,
                    weight,
                    format!("usable area {area} m2 exceeds the {bound} m2 cap by {over:.0}%"),
                )
            }
        }
        (Some(bound), None) => {
            let under = percent_under(area, bound);
            if within_tolerance_below(area, bound, config.area_tolerance) {
                CriterionVerdict::partial(
                    CriterionKey::Area,
                    weight,
                    config.boundary_partial_credit,
                    format!("usable area {area} m2 sits {under:.0}% under the {bound} m2 floor"),
                )
            } else {
                CriterionVerdict::missed(
                    CriterionKey::Area,
                    weight,
                    format!("usable area {area} m2 falls {under:.0}% below the {bound} m2 floor"),
                )
            }
        }
    };

    Some(verdict)
}

pub(super) fn bathrooms_verdict(
    profile: &RequirementProfile,
    listing: &Listing,
    config: &EvaluationConfig,
) -> Option<CriterionVerdict> {
    let floor = profile.bathrooms_min?;
    let weight = config.weights.bathrooms;
    let count = listing.bathrooms;

    let verdict = if count >= floor {
        CriterionVerdict::matched(
            CriterionKey::Bathrooms,
            weight,
            format!("{count} bathroom(s) meets the requested minimum of {floor}"),
        )
    } else {
        CriterionVerdict::missed(
            CriterionKey::Bathrooms,
            weight,
            format!("{count} bathroom(s) is below the requested minimum of {floor}"),
        )
    };

    Some(verdict)
}

/// Case-insensitive substring test in both directions.
///
/// Blank listing fields never match; a blank wanted string is filtered out
/// upstream so `contains("")` cannot turn into match-everything.
fn overlaps(wanted: &str, field: &str) -> bool {
    let field = field.trim();
    if field.is_empty() {
        return false;
    }
    let wanted = wanted.to_lowercase();
    let field = field.to_lowercase();
    field.contains(&wanted) || wanted.contains(&field)
}

/// Boundary-inclusive: a value landing exactly on the stretched bound passes.
/// Integer arithmetic so the comparison cannot wobble at the boundary.
fn within_tolerance_above(value: u64, bound: u64, tolerance: f64) -> bool {
    let percent = (tolerance * 100.0).round() as u128;
    u128::from(value) * 100 <= u128::from(bound) * (100 + percent)
}

fn within_tolerance_below(value: u64, bound: u64, tolerance: f64) -> bool {
    let percent = (tolerance * 100.0).round() as u128;
    u128::from(value) * 100 >= u128::from(bound) * 100u128.saturating_sub(percent)
}

fn percent_over(value: u64, bound: u64) -> f64 {
    if bound == 0 {
        return 100.0;
    }
    value.saturating_sub(bound) as f64 / bound as f64 * 100.0
}

fn percent_under(value: u64, bound: u64) -> f64 {
    if bound == 0 {
        return 0.0;
    }
    bound.saturating_sub(value) as f64 / bound as f64 * 100.0
}

fn describe_money_range(floor: Option<u64>, cap: Option<u64>) -> String {
    match (floor, cap) {
        (Some(floor), Some(cap)) => format!("€{floor} to €{cap}"),
        (Some(floor), None) => format!("at least €{floor}"),
        (None, Some(cap)) => format!("up to €{cap}"),
        (None, None) => "any price".to_string(),
    }
}

fn describe_area_range(floor: Option<u32>, cap: Option<u32>) -> String {
    match (floor, cap) {
        (Some(floor), Some(cap)) => format!("{floor} m2 to {cap} m2"),
        (Some(floor), None) => format!("at least {floor} m2"),
        (None, Some(cap)) => format!("up to {cap} m2"),
        (None, None) => "any size".to_string(),
    }
}

fn describe_count_range(floor: Option<u8>, cap: Option<u8>, noun: &str) -> String {
    match (floor, cap) {
        (Some(floor), Some(cap)) if floor == cap => format!("exactly {floor} {noun}"),
        (Some(floor), Some(cap)) => format!("{floor} to {cap} {noun}"),
        (Some(floor), None) => format!("at least {floor} {noun}"),
        (None, Some(cap)) => format!("at most {cap} {noun}"),
        (None, None) => format!("any number of {noun}"),
    }
}
