//! Total landed cost of an imported vehicle.
//!
//! A single pass: the origin is classified, the stated emissions normalized,
//! the CO2 and weight penalties resolved independently, and customs duty and
//! VAT stacked on top of each other. Every constant comes from [`TaxRules`];
//! the only notion of "now" is the `as_of` date passed in.

pub mod breakdown;
pub mod co2;
pub mod emissions;
pub mod origin;
pub mod weight;

pub use breakdown::{CostBreakdown, LineItem, LineKind};

use crate::profile::ImportProfile;
use crate::rules::TaxRules;
use crate::utils::round_cents;
use breakdown::{LinesBuilder, Presence};
use chrono::NaiveDate;

/// Compute the itemized landed cost of `profile` under `rules`, ageing the
/// CO2 penalty up to `as_of`.
pub fn calculate_landed_cost(
    profile: &ImportProfile,
    rules: &TaxRules,
    as_of: NaiveDate,
) -> CostBreakdown {
    let origin = origin::classify_origin(profile.origin.as_deref(), rules);
    let adjusted_co2 = emissions::normalize_co2(profile.co2, profile.fuel, &rules.co2);
    let co2 = co2::resolve_co2_penalty(
        adjusted_co2,
        profile.registration_date,
        as_of,
        &rules.co2,
    );
    let weight_penalty = weight::resolve_weight_penalty(
        profile.weight_kg,
        profile.fuel,
        profile.registration_year,
        &rules.weight,
    );

    let purchase_price = profile.purchase_price;
    let shipping_cost = profile.shipping_cost;

    // Each tax is levied on a base that includes the taxes before it
    let customs_base = purchase_price + shipping_cost;
    let customs_duty = round_cents(customs_base * origin.customs_rate);
    let vat_base = customs_base + customs_duty;
    let vat = round_cents(vat_base * rules.vat_rate);

    let total = round_cents(
        purchase_price + shipping_cost + customs_duty + vat + co2.penalty + weight_penalty,
    );

    let lines = LinesBuilder::new()
        .line(LineKind::PurchasePrice, purchase_price, Presence::Always)
        .line(LineKind::Transport, shipping_cost, Presence::Always)
        .line(
            LineKind::CustomsDuty {
                rate: origin.customs_rate,
            },
            customs_duty,
            Presence::NonZero,
        )
        .line(
            LineKind::Vat {
                rate: rules.vat_rate,
            },
            vat,
            Presence::Always,
        )
        .line(
            LineKind::Co2Penalty {
                co2: adjusted_co2,
                reduction_pct: co2.reduction_pct,
            },
            co2.penalty,
            Presence::NonZero,
        )
        .line(
            LineKind::WeightPenalty {
                weight_kg: profile.weight_kg,
            },
            weight_penalty,
            Presence::NonZero,
        )
        .build();

    log::debug!(
        "Landed cost {:?}: duty {}, vat {}, co2 {}, weight {}, total {}",
        profile.id,
        customs_duty,
        vat,
        co2.penalty,
        weight_penalty,
        total
    );

    CostBreakdown {
        rules: rules.name.clone(),
        is_eu: origin.is_eu,
        customs_rate: origin.customs_rate,
        vat_rate: rules.vat_rate,
        purchase_price,
        shipping_cost,
        customs_duty,
        vat,
        adjusted_co2,
        co2_penalty_raw: co2.raw,
        co2_penalty: co2.penalty,
        age_years: co2.age_years,
        age_reduction_pct: co2.reduction_pct,
        weight_penalty,
        total,
        lines,
    }
}
