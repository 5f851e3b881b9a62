use crate::profile::FuelCategory;
use crate::rules::Co2Rules;
use crate::utils::round_units;
use rust_decimal::Decimal;

/// Correct a stated CO2 figure for the older test cycle's under-reporting.
///
/// Only low diesel figures are scaled up (and rounded to whole g/km); everything
/// else passes through. Negative input is treated as zero.
pub fn normalize_co2(raw: Decimal, fuel: FuelCategory, rules: &Co2Rules) -> Decimal {
    let raw = raw.max(Decimal::ZERO);
    let correction = &rules.diesel_correction;

    if fuel.is_diesel() && raw > Decimal::ZERO && raw < correction.below {
        let adjusted = round_units(raw * correction.factor);
        log::debug!("Diesel CO2 {} g/km normalized to {} g/km", raw, adjusted);
        adjusted
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::TaxRules;
    use rust_decimal_macros::dec;

    fn co2_rules() -> Co2Rules {
        TaxRules::builtin().unwrap().co2
    }

    #[test]
    fn low_diesel_figure_scaled() {
        assert_eq!(normalize_co2(dec!(95), FuelCategory::Diesel, &co2_rules()), dec!(115));
        assert_eq!(
            normalize_co2(dec!(90), FuelCategory::DieselHybrid, &co2_rules()),
            dec!(109)
        );
    }

    #[test]
    fn diesel_at_threshold_unchanged() {
        assert_eq!(normalize_co2(dec!(100), FuelCategory::Diesel, &co2_rules()), dec!(100));
        assert_eq!(normalize_co2(dec!(140), FuelCategory::Diesel, &co2_rules()), dec!(140));
    }

    #[test]
    fn non_diesel_unchanged() {
        assert_eq!(normalize_co2(dec!(95), FuelCategory::Petrol, &co2_rules()), dec!(95));
        assert_eq!(normalize_co2(dec!(113), FuelCategory::Other, &co2_rules()), dec!(113));
    }

    #[test]
    fn zero_and_negative_normalize_to_zero() {
        assert_eq!(
            normalize_co2(Decimal::ZERO, FuelCategory::Diesel, &co2_rules()),
            Decimal::ZERO
        );
        assert_eq!(normalize_co2(dec!(-5), FuelCategory::Diesel, &co2_rules()), Decimal::ZERO);
    }
}
