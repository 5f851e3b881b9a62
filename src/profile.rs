use crate::utils::MAX_MAGNITUDE;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("invalid number for {field}: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("invalid date for {field}: '{value}'")]
    InvalidDate { field: &'static str, value: String },
    #[error("invalid year for {field}: '{value}'")]
    InvalidYear { field: &'static str, value: String },
    #[error("{field} out of range: '{value}'")]
    OutOfRange { field: &'static str, value: String },
}

/// How malformed input values are treated when building an [`ImportProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coercion {
    /// Malformed values are rejected with a [`ProfileError`]
    #[default]
    Strict,
    /// Malformed values are logged and replaced with zero (or absent)
    Lenient,
}

/// Powertrain category, classified once from the free-text fuel label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum FuelCategory {
    Petrol,
    Diesel,
    Electric,
    PetrolHybrid,
    DieselHybrid,
    #[default]
    Other,
}

impl FuelCategory {
    /// Classify a free-text fuel label ("Diesel", "Essence", "Électrique", "Hybride", ...).
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        let diesel = label.contains("diesel") || label.contains("gazole");
        let hybrid = label.contains("hybrid");
        let electric = label.contains("electri") || label.contains("électri");
        let petrol = label.contains("essence")
            || label.contains("petrol")
            || label.contains("gasoline");

        match (diesel, hybrid, electric, petrol) {
            (true, true, _, _) | (true, false, true, _) => FuelCategory::DieselHybrid,
            (true, false, _, _) => FuelCategory::Diesel,
            (false, true, _, _) => FuelCategory::PetrolHybrid,
            (false, false, true, _) => FuelCategory::Electric,
            (false, false, false, true) => FuelCategory::Petrol,
            _ => FuelCategory::Other,
        }
    }

    pub fn is_diesel(&self) -> bool {
        matches!(self, FuelCategory::Diesel | FuelCategory::DieselHybrid)
    }

    /// Electric and hybrid powertrains get the higher weight threshold
    pub fn is_electrified(&self) -> bool {
        matches!(
            self,
            FuelCategory::Electric | FuelCategory::PetrolHybrid | FuelCategory::DieselHybrid
        )
    }

    pub fn display(&self) -> &'static str {
        match self {
            FuelCategory::Petrol => "Petrol",
            FuelCategory::Diesel => "Diesel",
            FuelCategory::Electric => "Electric",
            FuelCategory::PetrolHybrid => "Petrol Hybrid",
            FuelCategory::DieselHybrid => "Diesel Hybrid",
            FuelCategory::Other => "Other",
        }
    }
}

impl fmt::Display for FuelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Validated input to the landed cost engine.
///
/// All quantities are non-negative. Built from an [`ImportRecord`] via
/// [`ImportProfile::from_record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportProfile {
    pub id: Option<String>,
    /// Upper-cased ISO country code, `None` when not supplied
    pub origin: Option<String>,
    /// Stated emissions in g/km
    pub co2: Decimal,
    /// Empty weight in kg
    pub weight_kg: Decimal,
    pub registration_date: Option<NaiveDate>,
    pub registration_year: Option<i32>,
    pub purchase_price: Decimal,
    pub fuel: FuelCategory,
    pub shipping_cost: Decimal,
    pub selling_price: Option<Decimal>,
}

/// Batch input root for JSON files
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImportInput {
    pub vehicles: Vec<ImportRecord>,
}

/// Raw vehicle record as it arrives from a CSV row or JSON object.
///
/// Fields are kept as text (bare JSON numbers are accepted and stringified)
/// so that parsing problems surface at the validation boundary with the
/// offending field named, instead of as a generic deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ImportRecord {
    /// Optional identifier echoed in batch output (VIN, stock number, ...)
    #[serde(default, deserialize_with = "text_or_number")]
    pub id: Option<String>,
    /// Country of origin (ISO 3166-1 alpha-2, e.g. DE, JP)
    #[serde(default, deserialize_with = "text_or_number")]
    pub country: Option<String>,
    /// CO2 emissions in g/km
    #[serde(default, deserialize_with = "text_or_number")]
    pub co2: Option<String>,
    /// Empty weight in kg
    #[serde(default, deserialize_with = "text_or_number")]
    pub weight: Option<String>,
    /// First registration date (YYYY-MM-DD, DD/MM/YYYY or YYYY-MM)
    #[serde(default, deserialize_with = "text_or_number")]
    pub registration_date: Option<String>,
    /// First registration year, defaults to the year of registration_date
    #[serde(default, deserialize_with = "text_or_number")]
    pub registration_year: Option<String>,
    /// Purchase price in the reference currency
    #[serde(default, deserialize_with = "text_or_number")]
    pub price: Option<String>,
    /// Fuel type label (Diesel, Essence, Electric, Hybrid, ...)
    #[serde(default, deserialize_with = "text_or_number")]
    pub fuel: Option<String>,
    /// Transport cost in the reference currency
    #[serde(default, deserialize_with = "text_or_number")]
    pub shipping: Option<String>,
    /// Expected selling price, used for the margin projection
    #[serde(default, deserialize_with = "text_or_number")]
    pub selling_price: Option<String>,
}

impl ImportProfile {
    pub fn from_record(record: &ImportRecord, coercion: Coercion) -> Result<Self, ProfileError> {
        let registration_date = parse_field(
            "registration_date",
            record.registration_date.as_deref(),
            coercion,
            parse_date,
            |value| ProfileError::InvalidDate {
                field: "registration_date",
                value,
            },
        )?;
        let registration_year = parse_field(
            "registration_year",
            record.registration_year.as_deref(),
            coercion,
            |s| s.parse::<i32>().ok(),
            |value| ProfileError::InvalidYear {
                field: "registration_year",
                value,
            },
        )?
        .or_else(|| registration_date.map(|d| d.year()));

        let selling_price = parse_field(
            "selling_price",
            record.selling_price.as_deref(),
            coercion,
            parse_decimal,
            |value| ProfileError::InvalidNumber {
                field: "selling_price",
                value,
            },
        )?;
        let selling_price = match selling_price {
            Some(price) => bounded("selling_price", price, coercion)?,
            None => None,
        };

        Ok(ImportProfile {
            id: non_empty(record.id.as_deref()).map(str::to_string),
            origin: non_empty(record.country.as_deref()).map(|c| c.to_uppercase()),
            co2: quantity("co2", record.co2.as_deref(), coercion)?,
            weight_kg: quantity("weight", record.weight.as_deref(), coercion)?,
            registration_date,
            registration_year,
            purchase_price: quantity("price", record.price.as_deref(), coercion)?,
            fuel: record
                .fuel
                .as_deref()
                .map(FuelCategory::from_label)
                .unwrap_or_default(),
            shipping_cost: quantity("shipping", record.shipping.as_deref(), coercion)?,
            selling_price,
        })
    }
}

/// Read batch records from CSV
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ImportRecord>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    rdr.deserialize().collect()
}

/// Read batch records from JSON (`{"vehicles": [...]}`)
pub fn read_json<R: Read>(reader: R) -> Result<Vec<ImportRecord>, serde_json::Error> {
    let input: ImportInput = serde_json::from_reader(reader)?;
    Ok(input.vehicles)
}

/// Accept either text or a bare number for a record field.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct TextOrNumber;

    impl<'de> Visitor<'de> for TextOrNumber {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(TextOrNumber)
        }
    }

    deserializer.deserialize_any(TextOrNumber)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse an optional field; missing or blank is `None` in both modes.
fn parse_field<T>(
    field: &'static str,
    raw: Option<&str>,
    coercion: Coercion,
    parse: impl Fn(&str) -> Option<T>,
    error: impl Fn(String) -> ProfileError,
) -> Result<Option<T>, ProfileError> {
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };
    match (parse(raw), coercion) {
        (Some(value), _) => Ok(Some(value)),
        (None, Coercion::Strict) => Err(error(raw.to_string())),
        (None, Coercion::Lenient) => {
            log::warn!("Ignoring unparseable {} '{}'", field, raw);
            Ok(None)
        }
    }
}

/// A non-negative quantity: missing or (leniently) malformed or out of range
/// becomes zero, negative is clamped to zero.
fn quantity(
    field: &'static str,
    raw: Option<&str>,
    coercion: Coercion,
) -> Result<Decimal, ProfileError> {
    let value = parse_field(field, raw, coercion, parse_decimal, |value| {
        ProfileError::InvalidNumber { field, value }
    })?
    .unwrap_or(Decimal::ZERO);

    if value < Decimal::ZERO {
        log::warn!("Clamping negative {} {} to zero", field, value);
        return Ok(Decimal::ZERO);
    }
    Ok(bounded(field, value, coercion)?.unwrap_or(Decimal::ZERO))
}

/// Reject (or leniently drop) values whose magnitude exceeds [`MAX_MAGNITUDE`].
fn bounded(
    field: &'static str,
    value: Decimal,
    coercion: Coercion,
) -> Result<Option<Decimal>, ProfileError> {
    if value.abs() <= MAX_MAGNITUDE {
        return Ok(Some(value));
    }
    match coercion {
        Coercion::Strict => Err(ProfileError::OutOfRange {
            field,
            value: value.to_string(),
        }),
        Coercion::Lenient => {
            log::warn!("Ignoring out of range {} {}", field, value);
            Ok(None)
        }
    }
}

/// Parse a number allowing thousands separators and a decimal comma ("1 234,50").
fn parse_decimal(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    Decimal::from_str(&cleaned).ok()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some(date);
    }
    // Year and month only, as printed on some registration documents
    NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record() -> ImportRecord {
        ImportRecord {
            id: Some("VIN123".to_string()),
            country: Some(" de ".to_string()),
            co2: Some("95".to_string()),
            weight: Some("1700".to_string()),
            registration_date: Some("2023-03-15".to_string()),
            registration_year: None,
            price: Some("20000".to_string()),
            fuel: Some("Diesel".to_string()),
            shipping: Some("500".to_string()),
            selling_price: None,
        }
    }

    #[test]
    fn valid_record() {
        let profile = ImportProfile::from_record(&record(), Coercion::Strict).unwrap();
        assert_eq!(profile.id.as_deref(), Some("VIN123"));
        assert_eq!(profile.origin.as_deref(), Some("DE"));
        assert_eq!(profile.co2, dec!(95));
        assert_eq!(profile.weight_kg, dec!(1700));
        assert_eq!(
            profile.registration_date,
            NaiveDate::from_ymd_opt(2023, 3, 15)
        );
        assert_eq!(profile.registration_year, Some(2023));
        assert_eq!(profile.purchase_price, dec!(20000));
        assert_eq!(profile.fuel, FuelCategory::Diesel);
        assert_eq!(profile.shipping_cost, dec!(500));
    }

    #[test]
    fn explicit_year_wins_over_date() {
        let mut rec = record();
        rec.registration_year = Some("2024".to_string());
        let profile = ImportProfile::from_record(&rec, Coercion::Strict).unwrap();
        assert_eq!(profile.registration_year, Some(2024));
    }

    #[test]
    fn malformed_number_rejected_when_strict() {
        let mut rec = record();
        rec.co2 = Some("ninety".to_string());
        assert_eq!(
            ImportProfile::from_record(&rec, Coercion::Strict),
            Err(ProfileError::InvalidNumber {
                field: "co2",
                value: "ninety".to_string()
            })
        );
    }

    #[test]
    fn malformed_number_zeroed_when_lenient() {
        let mut rec = record();
        rec.co2 = Some("ninety".to_string());
        rec.weight = Some("heavy".to_string());
        let profile = ImportProfile::from_record(&rec, Coercion::Lenient).unwrap();
        assert_eq!(profile.co2, Decimal::ZERO);
        assert_eq!(profile.weight_kg, Decimal::ZERO);
    }

    #[test]
    fn malformed_date_rejected_when_strict() {
        let mut rec = record();
        rec.registration_date = Some("last spring".to_string());
        assert!(matches!(
            ImportProfile::from_record(&rec, Coercion::Strict),
            Err(ProfileError::InvalidDate { .. })
        ));

        let profile = ImportProfile::from_record(&rec, Coercion::Lenient).unwrap();
        assert_eq!(profile.registration_date, None);
        assert_eq!(profile.registration_year, None);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let profile =
            ImportProfile::from_record(&ImportRecord::default(), Coercion::Strict).unwrap();
        assert_eq!(profile.origin, None);
        assert_eq!(profile.co2, Decimal::ZERO);
        assert_eq!(profile.weight_kg, Decimal::ZERO);
        assert_eq!(profile.purchase_price, Decimal::ZERO);
        assert_eq!(profile.shipping_cost, Decimal::ZERO);
        assert_eq!(profile.fuel, FuelCategory::Other);
        assert_eq!(profile.registration_year, None);
    }

    #[test]
    fn negative_values_clamped() {
        let mut rec = record();
        rec.co2 = Some("-40".to_string());
        rec.weight = Some("-1".to_string());
        let profile = ImportProfile::from_record(&rec, Coercion::Strict).unwrap();
        assert_eq!(profile.co2, Decimal::ZERO);
        assert_eq!(profile.weight_kg, Decimal::ZERO);
    }

    #[test]
    fn out_of_range_rejected_when_strict() {
        let mut rec = record();
        rec.price = Some("79228162514264337593543950335".to_string());
        assert_eq!(
            ImportProfile::from_record(&rec, Coercion::Strict),
            Err(ProfileError::OutOfRange {
                field: "price",
                value: "79228162514264337593543950335".to_string()
            })
        );

        let mut rec = record();
        rec.selling_price = Some("-1000000000001".to_string());
        assert!(matches!(
            ImportProfile::from_record(&rec, Coercion::Strict),
            Err(ProfileError::OutOfRange {
                field: "selling_price",
                ..
            })
        ));
    }

    #[test]
    fn out_of_range_dropped_when_lenient() {
        let mut rec = record();
        rec.price = Some("79228162514264337593543950335".to_string());
        rec.weight = Some("1000000000001".to_string());
        rec.selling_price = Some("2000000000000".to_string());
        let profile = ImportProfile::from_record(&rec, Coercion::Lenient).unwrap();
        assert_eq!(profile.purchase_price, Decimal::ZERO);
        assert_eq!(profile.weight_kg, Decimal::ZERO);
        assert_eq!(profile.selling_price, None);
    }

    #[test]
    fn largest_accepted_value() {
        let mut rec = record();
        rec.price = Some("1000000000000".to_string());
        let profile = ImportProfile::from_record(&rec, Coercion::Strict).unwrap();
        assert_eq!(profile.purchase_price, MAX_MAGNITUDE);
    }

    #[test]
    fn decimal_comma_and_separators() {
        assert_eq!(parse_decimal("1 234,50"), Some(dec!(1234.50)));
        assert_eq!(parse_decimal("12_000"), Some(dec!(12000)));
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn date_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 6, 30);
        assert_eq!(parse_date("2021-06-30"), expected);
        assert_eq!(parse_date("30/06/2021"), expected);
        assert_eq!(parse_date("2021-06"), NaiveDate::from_ymd_opt(2021, 6, 1));
        assert_eq!(parse_date("06-2021"), None);
    }

    #[test]
    fn fuel_labels() {
        assert_eq!(FuelCategory::from_label("Diesel"), FuelCategory::Diesel);
        assert_eq!(FuelCategory::from_label("GAZOLE"), FuelCategory::Diesel);
        assert_eq!(FuelCategory::from_label("Essence"), FuelCategory::Petrol);
        assert_eq!(FuelCategory::from_label("Électrique"), FuelCategory::Electric);
        assert_eq!(FuelCategory::from_label("electric"), FuelCategory::Electric);
        assert_eq!(FuelCategory::from_label("Hybride"), FuelCategory::PetrolHybrid);
        assert_eq!(
            FuelCategory::from_label("Hybride rechargeable électrique/essence"),
            FuelCategory::PetrolHybrid
        );
        assert_eq!(
            FuelCategory::from_label("Diesel hybrid"),
            FuelCategory::DieselHybrid
        );
        assert_eq!(
            FuelCategory::from_label("Diesel-Electric"),
            FuelCategory::DieselHybrid
        );
        assert_eq!(
            FuelCategory::from_label("Diesel électrique"),
            FuelCategory::DieselHybrid
        );
        assert_eq!(FuelCategory::from_label("GPL"), FuelCategory::Other);
    }

    #[test]
    fn fuel_predicates() {
        assert!(FuelCategory::Diesel.is_diesel());
        assert!(FuelCategory::DieselHybrid.is_diesel());
        assert!(!FuelCategory::Petrol.is_diesel());
        assert!(FuelCategory::Electric.is_electrified());
        assert!(FuelCategory::DieselHybrid.is_electrified());
        assert!(!FuelCategory::Diesel.is_electrified());
        assert!(!FuelCategory::Other.is_electrified());
    }

    #[test]
    fn csv_records() {
        let data = "id,country,co2,weight,registration_date,registration_year,price,fuel,shipping,selling_price\n\
                    a,JP,0,1900,,2024,10000,Electric,1000,\n\
                    b,DE,95,1700,2023-03-15,,20000,Diesel,500,27000\n";
        let records = read_csv(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].country.as_deref(), Some("JP"));
        assert_eq!(records[1].selling_price.as_deref(), Some("27000"));
    }

    #[test]
    fn json_records() {
        let data = r#"{"vehicles": [
            {"id": "a", "country": "JP", "price": "10000"},
            {"id": "b", "price": 20000.5, "co2": null, "weight": 1700}
        ]}"#;
        let records = read_json(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].price.as_deref(), Some("10000"));
        assert_eq!(records[0].co2, None);
        assert_eq!(records[1].price.as_deref(), Some("20000.5"));
        assert_eq!(records[1].weight.as_deref(), Some("1700"));
        assert_eq!(records[1].co2, None);
    }
}
