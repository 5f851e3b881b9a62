use crate::utils::MAX_MAGNITUDE;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Builtin rule set, embedded so the binary works without a rules file.
const BUILTIN_RULES: &str = include_str!("../rules/fr-2025.json");

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("failed to read rules: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse rules: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("co2 grid is empty")]
    EmptyGrid,
    #[error("co2 grid decreases at {breakpoint} g/km ({previous} -> {value})")]
    DecreasingGrid {
        breakpoint: u32,
        previous: Decimal,
        value: Decimal,
    },
    #[error("{name} must be between 0 and 1, got {value}")]
    RateOutOfRange { name: &'static str, value: Decimal },
    #[error("co2 cap ({cap_from} g/km) must be above the exemption ceiling ({exempt_up_to} g/km)")]
    CapBelowExemption { exempt_up_to: u32, cap_from: u32 },
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: Decimal },
    #[error("{name} must not exceed {max}, got {value}")]
    TooLarge {
        name: &'static str,
        value: Decimal,
        max: Decimal,
    },
}

/// Jurisdiction and year specific tax configuration.
///
/// Every constant the cost engine needs lives here, so a new fiscal year is a
/// new rules file rather than a code change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TaxRules {
    /// Rule set identifier, e.g. "FR-2025"
    pub name: String,
    /// Reference currency all monetary inputs are expressed in
    pub currency: String,
    /// ISO 3166-1 alpha-2 codes of the customs union members
    pub eu_countries: BTreeSet<String>,
    /// Customs duty rate for origins outside the union
    #[schemars(with = "f64")]
    pub customs_rate: Decimal,
    /// VAT rate applied on price + shipping + customs duty
    #[schemars(with = "f64")]
    pub vat_rate: Decimal,
    pub co2: Co2Rules,
    pub weight: WeightRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Co2Rules {
    /// Emissions at or below this value (g/km) carry no penalty
    pub exempt_up_to: u32,
    /// Emissions at or above this value (g/km) pay the grid value at this breakpoint
    pub cap_from: u32,
    /// Penalty reduction per elapsed year since first registration, in percent
    #[schemars(with = "f64")]
    pub decay_per_year_pct: Decimal,
    pub diesel_correction: DieselCorrection,
    /// Penalty amount per g/km breakpoint
    #[schemars(with = "BTreeMap<u32, f64>")]
    pub grid: BTreeMap<u32, Decimal>,
}

/// Correction for diesel figures measured on the older, more lenient test cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DieselCorrection {
    /// Only raw values strictly below this are corrected
    #[schemars(with = "f64")]
    pub below: Decimal,
    #[schemars(with = "f64")]
    pub factor: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WeightRules {
    /// Only vehicles first registered strictly after this year pay the penalty
    pub applies_after_year: i32,
    #[schemars(with = "f64")]
    pub threshold_kg: Decimal,
    /// Threshold for electric and hybrid powertrains
    #[schemars(with = "f64")]
    pub electrified_threshold_kg: Decimal,
    #[schemars(with = "f64")]
    pub rate_per_kg: Decimal,
}

impl TaxRules {
    /// The rule set shipped with the binary.
    pub fn builtin() -> Result<Self, RulesError> {
        Self::from_reader(BUILTIN_RULES.as_bytes())
    }

    pub fn from_path(path: &Path) -> Result<Self, RulesError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RulesError> {
        let rules: TaxRules = serde_json::from_reader(reader)?;
        rules.validate()?;
        log::debug!(
            "Loaded rules {}: {} grid breakpoints, {} union members",
            rules.name,
            rules.co2.grid.len(),
            rules.eu_countries.len()
        );
        Ok(rules)
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        check_rate("customs_rate", self.customs_rate)?;
        check_rate("vat_rate", self.vat_rate)?;
        check_amount("co2.decay_per_year_pct", self.co2.decay_per_year_pct)?;
        check_amount("co2.diesel_correction.below", self.co2.diesel_correction.below)?;
        check_amount("co2.diesel_correction.factor", self.co2.diesel_correction.factor)?;
        check_amount("weight.threshold_kg", self.weight.threshold_kg)?;
        check_amount(
            "weight.electrified_threshold_kg",
            self.weight.electrified_threshold_kg,
        )?;
        check_amount("weight.rate_per_kg", self.weight.rate_per_kg)?;

        if self.co2.cap_from <= self.co2.exempt_up_to {
            return Err(RulesError::CapBelowExemption {
                exempt_up_to: self.co2.exempt_up_to,
                cap_from: self.co2.cap_from,
            });
        }
        if self.co2.grid.is_empty() {
            return Err(RulesError::EmptyGrid);
        }

        let mut previous = Decimal::ZERO;
        for (&breakpoint, &value) in &self.co2.grid {
            if value < previous {
                return Err(RulesError::DecreasingGrid {
                    breakpoint,
                    previous,
                    value,
                });
            }
            check_amount("co2.grid", value)?;
            previous = value;
        }
        Ok(())
    }

    pub fn is_eu(&self, country: &str) -> bool {
        self.eu_countries.contains(country)
    }

    /// SHA-256 of the canonical JSON encoding, identifying the exact rules used for a quote.
    pub fn fingerprint(&self) -> Result<String, RulesError> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

fn check_rate(name: &'static str, value: Decimal) -> Result<(), RulesError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(RulesError::RateOutOfRange { name, value });
    }
    Ok(())
}

fn check_amount(name: &'static str, value: Decimal) -> Result<(), RulesError> {
    if value < Decimal::ZERO {
        return Err(RulesError::Negative { name, value });
    }
    if value > MAX_MAGNITUDE {
        return Err(RulesError::TooLarge {
            name,
            value,
            max: MAX_MAGNITUDE,
        });
    }
    Ok(())
}
