use clap::{Parser, Subcommand};

mod cmd;
mod cost;
mod profile;
mod rules;
mod utils;

use cmd::{
    batch::BatchCommand, quote::QuoteCommand, rules::RulesCommand, schema::SchemaCommand,
};

#[derive(Parser, Debug)]
#[command(name = "landedc")]
#[command(version, author = "Andrew Jones <ascjones@gmail.com>")]
#[command(about = "Calculate the total landed cost of imported vehicles")]
struct Opts {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Itemized landed cost of a single vehicle
    Quote(QuoteCommand),
    /// Landed cost of every vehicle in a CSV or JSON file
    Batch(BatchCommand),
    /// Show and check the active tax rule set
    Rules(RulesCommand),
    /// Print expected input formats
    Schema(SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    match opts.cmd {
        Command::Quote(quote) => quote.exec(),
        Command::Batch(batch) => batch.exec(),
        Command::Rules(rules) => rules.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
