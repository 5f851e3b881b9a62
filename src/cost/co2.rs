use crate::rules::Co2Rules;
use crate::utils::round_units;
use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Resolved CO2 penalty, before and after age decay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Co2Penalty {
    /// Grid penalty before age decay
    pub raw: Decimal,
    pub age_years: u32,
    /// Reduction applied for age, 0 to 100
    pub reduction_pct: Decimal,
    /// Penalty after age decay, whole currency units
    pub penalty: Decimal,
}

/// Resolve the CO2 penalty for normalized emissions, decayed by the vehicle's
/// age at `as_of`. Without a registration date no decay is applied.
pub fn resolve_co2_penalty(
    co2: Decimal,
    registered: Option<NaiveDate>,
    as_of: NaiveDate,
    rules: &Co2Rules,
) -> Co2Penalty {
    let raw = grid_penalty(co2, rules);
    let age_years = registered.map_or(0, |date| age_in_years(date, as_of));
    let reduction_pct = age_reduction_pct(age_years, rules);
    let remaining = Decimal::ONE - reduction_pct / Decimal::ONE_HUNDRED;
    let penalty = round_units(raw * remaining).max(Decimal::ZERO);

    log::debug!(
        "CO2 {} g/km: grid penalty {}, age {} years, reduction {}%, penalty {}",
        co2,
        raw,
        age_years,
        reduction_pct,
        penalty
    );

    Co2Penalty {
        raw,
        age_years,
        reduction_pct,
        penalty,
    }
}

/// Read the penalty grid at `co2` g/km.
///
/// At or below the exemption ceiling the penalty is zero; at or above the cap
/// it is the grid value at the cap. Values between defined breakpoints are
/// linearly interpolated.
pub fn grid_penalty(co2: Decimal, rules: &Co2Rules) -> Decimal {
    if co2 <= Decimal::from(rules.exempt_up_to) {
        return Decimal::ZERO;
    }
    if co2 >= Decimal::from(rules.cap_from) {
        let capped = boundary_value(rules.cap_from, rules);
        log::debug!("CO2 {} g/km capped at {} g/km: {}", co2, rules.cap_from, capped);
        return capped;
    }

    let exact = co2
        .fract()
        .is_zero()
        .then(|| co2.to_u32())
        .flatten()
        .and_then(|breakpoint| rules.grid.get(&breakpoint));
    if let Some(value) = exact {
        return *value;
    }

    interpolate(co2, rules)
}

/// Value at `breakpoint`, or at the nearest defined breakpoint below it.
fn boundary_value(breakpoint: u32, rules: &Co2Rules) -> Decimal {
    rules
        .grid
        .range(..=breakpoint)
        .next_back()
        .or_else(|| rules.grid.iter().next())
        .map_or(Decimal::ZERO, |(_, value)| *value)
}

fn interpolate(co2: Decimal, rules: &Co2Rules) -> Decimal {
    let (Some(floor), Some(ceil)) = (co2.floor().to_u32(), co2.ceil().to_u32()) else {
        return Decimal::ZERO;
    };

    // Below the first breakpoint the grid starts from zero at the exemption ceiling
    let (lower_key, lower_value) = rules
        .grid
        .range(..=floor)
        .next_back()
        .map(|(k, v)| (*k, *v))
        .unwrap_or((rules.exempt_up_to, Decimal::ZERO));

    let Some((upper_key, upper_value)) = rules
        .grid
        .range(ceil..=rules.cap_from)
        .next()
        .map(|(k, v)| (*k, *v))
    else {
        return lower_value;
    };

    if upper_key <= lower_key {
        return lower_value;
    }

    let fraction = (co2 - Decimal::from(lower_key)) / Decimal::from(upper_key - lower_key);
    let value = lower_value + (upper_value - lower_value) * fraction;
    log::debug!(
        "CO2 {} g/km interpolated between {} ({}) and {} ({}): {}",
        co2,
        lower_key,
        lower_value,
        upper_key,
        upper_value,
        value
    );
    value
}

/// Whole years elapsed since first registration, counted by month.
pub fn age_in_years(registered: NaiveDate, as_of: NaiveDate) -> u32 {
    let mut years = as_of.year() - registered.year();
    if as_of.month() < registered.month() {
        years -= 1;
    }
    years.max(0) as u32
}

/// Percentage reduction for a vehicle of the given age, saturating at 100.
pub fn age_reduction_pct(age_years: u32, rules: &Co2Rules) -> Decimal {
    (rules.decay_per_year_pct * Decimal::from(age_years))
        .max(Decimal::ZERO)
        .min(Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests::sparse_rules;
    use crate::rules::TaxRules;
    use rust_decimal_macros::dec;

    fn co2_rules() -> Co2Rules {
        TaxRules::builtin().unwrap().co2
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn exempt_at_112() {
        assert_eq!(grid_penalty(dec!(112), &co2_rules()), Decimal::ZERO);
        assert_eq!(grid_penalty(dec!(0), &co2_rules()), Decimal::ZERO);
    }

    #[test]
    fn first_breakpoint_at_113() {
        assert_eq!(grid_penalty(dec!(113), &co2_rules()), dec!(50));
        assert_eq!(grid_penalty(dec!(115), &co2_rules()), dec!(100));
    }

    #[test]
    fn capped_at_225() {
        let rules = co2_rules();
        let at_cap = rules.grid[&225];
        assert_eq!(grid_penalty(dec!(225), &rules), at_cap);
        assert_eq!(grid_penalty(dec!(260), &rules), at_cap);
        assert_eq!(grid_penalty(dec!(9999), &rules), at_cap);
    }

    #[test]
    fn cap_without_exact_breakpoint_uses_nearest_below() {
        let mut rules = sparse_rules().co2;
        rules.grid.remove(&225);
        assert_eq!(grid_penalty(dec!(230), &rules), dec!(1000));
    }

    #[test]
    fn monotonic_over_dense_grid() {
        let rules = co2_rules();
        let mut previous = Decimal::ZERO;
        for tenths in 1000..2400 {
            let co2 = Decimal::new(tenths, 1);
            let penalty = grid_penalty(co2, &rules);
            assert!(penalty >= previous, "penalty decreased at {} g/km", co2);
            previous = penalty;
        }
    }

    #[test]
    fn fractional_value_interpolated_in_dense_grid() {
        // 113 -> 50, 114 -> 75
        assert_eq!(grid_penalty(dec!(113.5), &co2_rules()), dec!(62.5));
    }

    #[test]
    fn sparse_grid_interpolation() {
        let rules = sparse_rules().co2;
        assert_eq!(grid_penalty(dec!(120), &rules), dec!(100));
        assert_eq!(grid_penalty(dec!(125), &rules), dec!(150));
        assert_eq!(grid_penalty(dec!(140), &rules), dec!(600));
        assert_eq!(grid_penalty(dec!(127.5), &rules), dec!(175));
    }

    #[test]
    fn sparse_grid_below_first_breakpoint_starts_from_zero() {
        let rules = sparse_rules().co2;
        // between the exemption ceiling (112 -> 0) and 120 -> 100
        assert_eq!(grid_penalty(dec!(116), &rules), dec!(50));
    }

    #[test]
    fn sparse_grid_monotonic() {
        let rules = sparse_rules().co2;
        let mut previous = Decimal::ZERO;
        for co2 in 100..240 {
            let penalty = grid_penalty(Decimal::from(co2), &rules);
            assert!(penalty >= previous, "penalty decreased at {} g/km", co2);
            previous = penalty;
        }
    }

    #[test]
    fn age_counts_whole_years_by_month() {
        assert_eq!(age_in_years(date(2023, 3, 15), date(2025, 6, 1)), 2);
        assert_eq!(age_in_years(date(2023, 6, 15), date(2025, 3, 1)), 1);
        assert_eq!(age_in_years(date(2023, 6, 30), date(2025, 6, 1)), 2);
        assert_eq!(age_in_years(date(2025, 1, 1), date(2025, 12, 31)), 0);
    }

    #[test]
    fn future_registration_has_no_age() {
        assert_eq!(age_in_years(date(2027, 1, 1), date(2025, 1, 1)), 0);
    }

    #[test]
    fn reduction_saturates_at_100() {
        let rules = co2_rules();
        assert_eq!(age_reduction_pct(0, &rules), Decimal::ZERO);
        assert_eq!(age_reduction_pct(2, &rules), dec!(20));
        assert_eq!(age_reduction_pct(9, &rules), dec!(90));
        assert_eq!(age_reduction_pct(10, &rules), dec!(100));
        assert_eq!(age_reduction_pct(25, &rules), dec!(100));
    }

    #[test]
    fn decayed_penalty() {
        let result = resolve_co2_penalty(
            dec!(115),
            Some(date(2023, 3, 15)),
            date(2025, 6, 1),
            &co2_rules(),
        );
        assert_eq!(result.raw, dec!(100));
        assert_eq!(result.age_years, 2);
        assert_eq!(result.reduction_pct, dec!(20));
        assert_eq!(result.penalty, dec!(80));
    }

    #[test]
    fn fully_decayed_after_ten_years() {
        let result = resolve_co2_penalty(
            dec!(180),
            Some(date(2010, 1, 1)),
            date(2025, 6, 1),
            &co2_rules(),
        );
        assert!(result.raw > Decimal::ZERO);
        assert_eq!(result.reduction_pct, dec!(100));
        assert_eq!(result.penalty, Decimal::ZERO);
    }

    #[test]
    fn no_registration_date_means_no_decay() {
        let result = resolve_co2_penalty(dec!(113), None, date(2025, 6, 1), &co2_rules());
        assert_eq!(result.age_years, 0);
        assert_eq!(result.penalty, dec!(50));
    }

    #[test]
    fn decayed_penalty_rounded_to_whole_units() {
        // 75 * 0.9 = 67.5 -> 68
        let result = resolve_co2_penalty(
            dec!(114),
            Some(date(2024, 1, 1)),
            date(2025, 1, 1),
            &co2_rules(),
        );
        assert_eq!(result.penalty, dec!(68));
    }
}
