//! Quote command - itemized landed cost of a single vehicle

use super::CostArgs;
use crate::cost::{calculate_landed_cost, CostBreakdown, LineItem};
use crate::profile::{Coercion, ImportProfile, ImportRecord};
use crate::utils::format_money;
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct QuoteCommand {
    /// Purchase price
    #[arg(short, long)]
    price: String,

    /// Transport cost
    #[arg(short, long)]
    shipping: Option<String>,

    /// Country of origin (e.g. DE, JP)
    #[arg(short, long)]
    country: Option<String>,

    /// CO2 emissions in g/km
    #[arg(long)]
    co2: Option<String>,

    /// Empty weight in kg
    #[arg(short, long)]
    weight: Option<String>,

    /// Fuel type (Diesel, Essence, Electric, Hybrid, ...)
    #[arg(short, long)]
    fuel: Option<String>,

    /// First registration date (YYYY-MM-DD, DD/MM/YYYY or YYYY-MM)
    #[arg(short, long)]
    registered: Option<String>,

    /// First registration year, defaults to the year of --registered
    #[arg(short, long)]
    year: Option<String>,

    /// Expected selling price, to project the margin
    #[arg(long)]
    selling_price: Option<String>,

    /// Treat malformed numbers as zero instead of failing
    #[arg(long)]
    lenient: bool,

    /// Output as JSON instead of a formatted table
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    cost: CostArgs,
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct QuoteOutput {
    as_of: NaiveDate,
    rules_fingerprint: String,
    #[serde(flatten)]
    breakdown: CostBreakdown,
    cost_basis: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin: Option<Decimal>,
}

#[derive(Debug, Clone, Tabled)]
struct LineRow {
    #[tabled(rename = "Item")]
    label: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

impl QuoteCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let coercion = if self.lenient {
            Coercion::Lenient
        } else {
            Coercion::Strict
        };
        let profile = ImportProfile::from_record(&self.record(), coercion)?;
        let rules = self.cost.load_rules()?;
        let as_of = self.cost.as_of();

        let breakdown = calculate_landed_cost(&profile, &rules, as_of);
        let margin = profile.selling_price.map(|price| breakdown.margin(price));

        if self.json {
            let output = QuoteOutput {
                as_of,
                rules_fingerprint: rules.fingerprint()?,
                cost_basis: breakdown.cost_basis(),
                margin,
                breakdown,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_breakdown(&breakdown, &rules.currency, margin, as_of);
        }
        Ok(())
    }

    fn record(&self) -> ImportRecord {
        ImportRecord {
            id: None,
            country: self.country.clone(),
            co2: self.co2.clone(),
            weight: self.weight.clone(),
            registration_date: self.registered.clone(),
            registration_year: self.year.clone(),
            price: Some(self.price.clone()),
            fuel: self.fuel.clone(),
            shipping: self.shipping.clone(),
            selling_price: self.selling_price.clone(),
        }
    }
}

fn print_breakdown(
    breakdown: &CostBreakdown,
    currency: &str,
    margin: Option<Decimal>,
    as_of: NaiveDate,
) {
    let mut rows: Vec<LineRow> = breakdown
        .lines
        .iter()
        .map(|line: &LineItem| LineRow {
            label: line.label.clone(),
            amount: format_money(line.amount, currency),
        })
        .collect();
    rows.push(LineRow {
        label: "TOTAL".to_string(),
        amount: format_money(breakdown.total, currency),
    });

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();

    println!("Landed cost ({} rules, as of {})", breakdown.rules, as_of);
    println!("{}", table);
    println!(
        "Cost basis: {}",
        format_money(breakdown.cost_basis(), currency)
    );
    if let Some(margin) = margin {
        println!("Projected margin: {}", format_money(margin, currency));
    }
}
