//! Rules command - inspect and check a tax rule set

use super::load_rules;
use crate::utils::{format_money, format_rate};
use clap::Args;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct RulesCommand {
    /// JSON rules file to inspect instead of the builtin rule set
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Print every CO2 penalty breakpoint
    #[arg(long)]
    grid: bool,

    /// Print the full rule set as JSON (a starting point for a new fiscal year)
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Tabled)]
struct GridRow {
    #[tabled(rename = "g/km")]
    breakpoint: u32,
    #[tabled(rename = "Penalty")]
    penalty: String,
}

impl RulesCommand {
    /// Loading validates the rule set, so an invalid file exits non-zero here
    pub fn exec(&self) -> anyhow::Result<()> {
        let rules = load_rules(self.rules.as_deref())?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&rules)?);
            return Ok(());
        }

        let co2 = &rules.co2;
        let weight = &rules.weight;
        let currency = rules.currency.as_str();

        println!("Rules:            {}", rules.name);
        println!("Fingerprint:      {}", rules.fingerprint()?);
        println!("Currency:         {}", currency);
        println!(
            "Customs duty:     {} outside {} union members",
            format_rate(rules.customs_rate),
            rules.eu_countries.len()
        );
        println!("VAT:              {}", format_rate(rules.vat_rate));
        println!(
            "CO2 penalty:      above {} g/km, capped from {} g/km ({} breakpoints)",
            co2.exempt_up_to,
            co2.cap_from,
            co2.grid.len()
        );
        println!(
            "Age decay:        {}% per year",
            co2.decay_per_year_pct.normalize()
        );
        println!(
            "Diesel correction: x{} below {} g/km",
            co2.diesel_correction.factor.normalize(),
            co2.diesel_correction.below.normalize()
        );
        println!(
            "Weight penalty:   {} per kg over {} kg ({} kg electrified), registered after {}",
            format_money(weight.rate_per_kg, currency),
            weight.threshold_kg.normalize(),
            weight.electrified_threshold_kg.normalize(),
            weight.applies_after_year
        );

        if self.grid {
            let rows: Vec<GridRow> = co2
                .grid
                .iter()
                .map(|(breakpoint, penalty)| GridRow {
                    breakpoint: *breakpoint,
                    penalty: format_money(*penalty, currency),
                })
                .collect();
            let table = Table::new(rows)
                .with(Style::rounded())
                .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
                .to_string();
            println!("{}", table);
        }
        Ok(())
    }
}
