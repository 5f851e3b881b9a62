use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Largest amount, weight or rule value accepted. Products of two such values
/// stay well inside `Decimal`'s range.
pub const MAX_MAGNITUDE: Decimal = dec!(1000000000000);

/// Round to the nearest cent, halves up.
pub fn round_cents(amount: Decimal) -> Decimal {
    round_half_up(amount, 2)
}

/// Round to the nearest whole unit, halves up.
pub fn round_units(amount: Decimal) -> Decimal {
    round_half_up(amount, 0)
}

/// Halves go towards positive infinity, so -0.005 rounds to -0.00 and 0.005 to 0.01.
fn round_half_up(amount: Decimal, dp: u32) -> Decimal {
    let strategy = if amount.is_sign_negative() {
        RoundingStrategy::MidpointTowardZero
    } else {
        RoundingStrategy::MidpointAwayFromZero
    };
    amount.round_dp_with_strategy(dp, strategy)
}

pub fn format_money(amount: Decimal, currency: &str) -> String {
    format!("{:.2} {}", amount, currency)
}

/// Format a percentage rate such as 0.10 as "10%".
pub fn format_rate(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
}

pub fn write_csv<I, R, W>(records: I, writer: W) -> anyhow::Result<()>
where
    I: IntoIterator<Item = R>,
    R: serde::Serialize,
    W: std::io::Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records.into_iter() {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
