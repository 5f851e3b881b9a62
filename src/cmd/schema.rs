//! Schema command - print expected input formats

use crate::profile::ImportInput;
use crate::rules::TaxRules;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the batch vehicle input
    JsonSchema,
    /// JSON Schema for a rules file
    RulesSchema,
    /// CSV header row with column names
    CsvHeader,
    /// CSV column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => {
                let schema = schema_for!(ImportInput);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::RulesSchema => {
                let schema = schema_for!(TaxRules);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::CsvHeader => {
                let columns: Vec<_> = CSV_FIELDS.iter().map(|(name, _, _)| *name).collect();
                println!("{}", columns.join(","));
            }
            SchemaFormat::CsvFields => self.print_csv_fields(),
        }
        Ok(())
    }

    fn print_csv_fields(&self) {
        println!("CSV Input Format");
        println!("================");
        println!();
        for (name, required, description) in CSV_FIELDS {
            let req = if *required { "required" } else { "optional" };
            println!("{:20} ({:8})  {}", name, req, description);
        }
        println!();
        println!("Missing numbers count as zero; negative numbers are clamped to zero.");
        println!("Use --lenient to treat malformed numbers and dates as missing.");
    }
}

const CSV_FIELDS: &[(&str, bool, &str)] = &[
    ("id", false, "Identifier echoed in the output (VIN, stock number)"),
    ("country", false, "Country of origin, ISO code (missing counts as non-EU)"),
    ("co2", false, "CO2 emissions in g/km"),
    ("weight", false, "Empty weight in kg"),
    (
        "registration_date",
        false,
        "First registration (YYYY-MM-DD, DD/MM/YYYY or YYYY-MM)",
    ),
    (
        "registration_year",
        false,
        "First registration year (defaults to registration_date's year)",
    ),
    ("price", true, "Purchase price"),
    ("fuel", false, "Fuel type: Diesel, Essence/Petrol, Electric, Hybrid"),
    ("shipping", false, "Transport cost"),
    ("selling_price", false, "Expected selling price, for the margin column"),
];
