pub mod batch;
pub mod quote;
pub mod rules;
pub mod schema;

use crate::profile::{self, ImportRecord};
use crate::rules::TaxRules;
use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Options shared by every command that computes a landed cost
#[derive(Args, Debug)]
pub struct CostArgs {
    /// JSON rules file replacing the builtin rule set
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Date the CO2 penalty is aged to (YYYY-MM-DD), defaults to today
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

impl CostArgs {
    pub fn load_rules(&self) -> anyhow::Result<TaxRules> {
        load_rules(self.rules.as_deref())
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// Load a rules file, or the builtin rule set when none is given
pub fn load_rules(path: Option<&Path>) -> anyhow::Result<TaxRules> {
    let rules = match path {
        Some(path) => TaxRules::from_path(path)
            .with_context(|| format!("loading rules from {}", path.display()))?,
        None => TaxRules::builtin().context("loading builtin rules")?,
    };
    log::info!("Using rules {}", rules.name);
    Ok(rules)
}

/// Read vehicle records from a CSV or JSON file (or stdin with "-")
pub fn read_records(path: &Path) -> anyhow::Result<Vec<ImportRecord>> {
    let mut buffer = Vec::new();
    if path.as_os_str() == "-" {
        let stdin = io::stdin();
        BufReader::new(stdin.lock()).read_to_end(&mut buffer)?;
        if buffer.is_empty() {
            anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
        }
    } else {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        BufReader::new(file).read_to_end(&mut buffer)?;
    }
    parse_records(&buffer)
}

fn parse_records(buffer: &[u8]) -> anyhow::Result<Vec<ImportRecord>> {
    let is_json = buffer
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{');

    let records = if is_json {
        profile::read_json(buffer).context("parsing JSON vehicles")?
    } else {
        profile::read_csv(buffer).context("parsing CSV vehicles")?
    };
    log::info!("Read {} vehicle records", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_json_input() {
        let records = parse_records(b"  \n{\"vehicles\": [{\"country\": \"JP\"}]}").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].country.as_deref(), Some("JP"));
    }

    #[test]
    fn falls_back_to_csv_input() {
        let records = parse_records(b"country,price\nDE,1000\nJP,2000\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].price.as_deref(), Some("2000"));
    }

    #[test]
    fn missing_rules_file_is_an_error() {
        assert!(load_rules(Some(Path::new("does/not/exist.json"))).is_err());
    }
}
