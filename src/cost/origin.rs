use crate::rules::TaxRules;
use rust_decimal::Decimal;

/// Customs treatment of a vehicle's country of origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub is_eu: bool,
    pub customs_rate: Decimal,
}

/// Classify a country of origin. Missing or unknown codes are treated as
/// outside the union and pay the full customs rate.
pub fn classify_origin(country: Option<&str>, rules: &TaxRules) -> Origin {
    let is_eu = country.is_some_and(|c| rules.is_eu(&c.trim().to_uppercase()));
    let customs_rate = if is_eu {
        Decimal::ZERO
    } else {
        rules.customs_rate
    };
    log::debug!(
        "Origin {:?}: eu={}, customs rate={}",
        country,
        is_eu,
        customs_rate
    );
    Origin {
        is_eu,
        customs_rate,
    }
}
