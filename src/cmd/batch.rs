//! Batch command - landed cost of every vehicle in a CSV or JSON file

use super::{read_records, CostArgs};
use crate::cost::{calculate_landed_cost, CostBreakdown};
use crate::profile::{Coercion, ImportProfile};
use crate::utils::write_csv;
use anyhow::Context;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct BatchCommand {
    /// CSV or JSON file containing vehicles ("-" for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Treat malformed numbers and dates as missing instead of failing
    #[arg(long)]
    lenient: bool,

    /// Output as CSV instead of formatted table
    #[arg(long)]
    csv: bool,

    /// Output as JSON instead of formatted table
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    #[command(flatten)]
    cost: CostArgs,
}

/// Row for the batch table and CSV output
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct BatchRow {
    #[tabled(rename = "#")]
    #[serde(rename = "row_num")]
    pub row_num: usize,

    #[tabled(rename = "Id")]
    pub id: String,

    #[tabled(rename = "Origin")]
    pub origin: String,

    #[tabled(rename = "Price")]
    pub price: String,

    #[tabled(rename = "Customs")]
    pub customs_duty: String,

    #[tabled(rename = "VAT")]
    pub vat: String,

    #[tabled(rename = "CO2 g/km")]
    pub co2: String,

    #[tabled(rename = "CO2 Penalty")]
    pub co2_penalty: String,

    #[tabled(rename = "Weight Penalty")]
    pub weight_penalty: String,

    #[tabled(rename = "Total")]
    pub total: String,

    #[tabled(rename = "Cost Basis")]
    pub cost_basis: String,

    #[tabled(rename = "Margin")]
    pub margin: String,
}

#[derive(Debug, Serialize)]
struct BatchEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(flatten)]
    breakdown: CostBreakdown,
    cost_basis: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct BatchOutput {
    as_of: chrono::NaiveDate,
    rules: String,
    rules_fingerprint: String,
    vehicle_count: usize,
    total_landed_cost: Decimal,
    vehicles: Vec<BatchEntry>,
}

impl BatchCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let coercion = if self.lenient {
            Coercion::Lenient
        } else {
            Coercion::Strict
        };
        let rules = self.cost.load_rules()?;
        let as_of = self.cost.as_of();
        let records = read_records(&self.input)?;

        let profiles = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                ImportProfile::from_record(record, coercion)
                    .with_context(|| format!("vehicle record {}", i + 1))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let entries: Vec<BatchEntry> = profiles
            .iter()
            .map(|profile| {
                let breakdown = calculate_landed_cost(profile, &rules, as_of);
                BatchEntry {
                    id: profile.id.clone(),
                    cost_basis: breakdown.cost_basis(),
                    margin: profile.selling_price.map(|p| breakdown.margin(p)),
                    breakdown,
                }
            })
            .collect();

        let total: Decimal = entries.iter().map(|e| e.breakdown.total).sum();
        log::info!("Vehicles {}", entries.len());
        log::info!("Total landed cost {}", total);

        if self.json {
            let output = BatchOutput {
                as_of,
                rules: rules.name.clone(),
                rules_fingerprint: rules.fingerprint()?,
                vehicle_count: entries.len(),
                total_landed_cost: total,
                vehicles: entries,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        let rows = build_rows(&entries, &profiles);
        if self.csv {
            write_csv(rows, io::stdout())
        } else {
            print_table(&rows);
            println!(
                "Vehicles: {}, Total landed cost: {:.2} {}",
                entries.len(),
                total,
                rules.currency
            );
            Ok(())
        }
    }
}

fn build_rows(entries: &[BatchEntry], profiles: &[ImportProfile]) -> Vec<BatchRow> {
    entries
        .iter()
        .zip(profiles)
        .enumerate()
        .map(|(i, (entry, profile))| {
            let b = &entry.breakdown;
            BatchRow {
                row_num: i + 1,
                id: entry.id.clone().unwrap_or_default(),
                origin: profile.origin.clone().unwrap_or_else(|| "?".to_string()),
                price: format!("{:.2}", b.purchase_price),
                customs_duty: format!("{:.2}", b.customs_duty),
                vat: format!("{:.2}", b.vat),
                co2: b.adjusted_co2.normalize().to_string(),
                co2_penalty: format!("{:.2}", b.co2_penalty),
                weight_penalty: format!("{:.2}", b.weight_penalty),
                total: format!("{:.2}", b.total),
                cost_basis: entry.cost_basis.to_string(),
                margin: entry
                    .margin
                    .map(|m| format!("{:.2}", m))
                    .unwrap_or_default(),
            }
        })
        .collect()
}

fn print_table(rows: &[BatchRow]) {
    if rows.is_empty() {
        println!("No vehicles found");
        return;
    }

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}
