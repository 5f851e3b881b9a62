use crate::profile::FuelCategory;
use crate::rules::WeightRules;
use rust_decimal::Decimal;

/// Excess-weight penalty for vehicles first registered after the rule's start year.
pub fn resolve_weight_penalty(
    weight_kg: Decimal,
    fuel: FuelCategory,
    registration_year: Option<i32>,
    rules: &WeightRules,
) -> Decimal {
    let Some(year) = registration_year.filter(|y| *y > rules.applies_after_year) else {
        return Decimal::ZERO;
    };

    let threshold = weight_threshold(fuel, rules);
    let excess = weight_kg - threshold;
    if excess <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let penalty = excess * rules.rate_per_kg;
    log::debug!(
        "Weight {} kg ({}, registered {}): {} kg over {} kg threshold, penalty {}",
        weight_kg,
        fuel,
        year,
        excess,
        threshold,
        penalty
    );
    penalty
}

pub fn weight_threshold(fuel: FuelCategory, rules: &WeightRules) -> Decimal {
    if fuel.is_electrified() {
        rules.electrified_threshold_kg
    } else {
        rules.threshold_kg
    }
}
