use crate::utils::{format_rate, round_cents, round_units};
use rust_decimal::Decimal;
use serde::Serialize;

/// Kind of a breakdown line, carrying what its label needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum LineKind {
    PurchasePrice,
    Transport,
    CustomsDuty { rate: Decimal },
    Vat { rate: Decimal },
    Co2Penalty { co2: Decimal, reduction_pct: Decimal },
    WeightPenalty { weight_kg: Decimal },
}

impl LineKind {
    pub fn label(&self) -> String {
        match self {
            LineKind::PurchasePrice => "Purchase price".to_string(),
            LineKind::Transport => "Transport".to_string(),
            LineKind::CustomsDuty { rate } => format!("Customs duty ({})", format_rate(*rate)),
            LineKind::Vat { rate } => format!("VAT ({})", format_rate(*rate)),
            LineKind::Co2Penalty { co2, reduction_pct } if reduction_pct.is_zero() => {
                format!("CO2 penalty ({} g/km)", co2.normalize())
            }
            LineKind::Co2Penalty { co2, reduction_pct } => format!(
                "CO2 penalty ({} g/km, -{}% for age)",
                co2.normalize(),
                reduction_pct.normalize()
            ),
            LineKind::WeightPenalty { weight_kg } => {
                format!("Weight penalty ({} kg)", weight_kg.normalize())
            }
        }
    }
}

/// When a candidate line is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Always,
    NonZero,
}

impl Presence {
    fn admits(&self, amount: Decimal) -> bool {
        match self {
            Presence::Always => true,
            Presence::NonZero => amount > Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub kind: LineKind,
    pub label: String,
    pub amount: Decimal,
}

/// Collects breakdown lines in display order, keeping only those whose
/// presence rule admits their amount.
#[derive(Debug, Default)]
pub struct LinesBuilder {
    lines: Vec<LineItem>,
}

impl LinesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(mut self, kind: LineKind, amount: Decimal, presence: Presence) -> Self {
        if presence.admits(amount) {
            self.lines.push(LineItem {
                kind,
                label: kind.label(),
                amount,
            });
        }
        self
    }

    pub fn build(self) -> Vec<LineItem> {
        self.lines
    }
}

/// Itemized landed cost of one vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostBreakdown {
    /// Name of the rule set the breakdown was computed with
    pub rules: String,
    pub is_eu: bool,
    pub customs_rate: Decimal,
    pub vat_rate: Decimal,
    pub purchase_price: Decimal,
    pub shipping_cost: Decimal,
    pub customs_duty: Decimal,
    pub vat: Decimal,
    /// Emissions after diesel normalization, g/km
    pub adjusted_co2: Decimal,
    pub co2_penalty_raw: Decimal,
    pub co2_penalty: Decimal,
    pub age_years: u32,
    pub age_reduction_pct: Decimal,
    pub weight_penalty: Decimal,
    pub total: Decimal,
    pub lines: Vec<LineItem>,
}

impl CostBreakdown {
    /// Projected margin if the vehicle sells at `selling_price`
    pub fn margin(&self, selling_price: Decimal) -> Decimal {
        round_cents(selling_price - self.total)
    }

    /// Total rounded to whole currency units, as applied when the quote is
    /// used as a vehicle's cost basis
    pub fn cost_basis(&self) -> Decimal {
        round_units(self.total)
    }
}
