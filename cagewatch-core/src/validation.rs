//! Strict checks for the data-entry path.
//!
//! Unlike the aggregator, which reads noisy values as zero, everything here rejects
//! bad input before it is appended to a unit's log. Raw entries hold the text exactly
//! as typed; each `validate_*` function turns one into a typed event or a
//! [`ValidationError`] naming the field at fault.

use crate::error::ValidationError;
use cagewatch_schemas::{
    events::{CostCategory, CostEntry, FeedingEvent, HealthStatus, MortalityObservation, Sale, Weighing},
    unit::ProductionUnit,
};
use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMATS: [&str; 4] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Debug, Clone, Default)]
pub struct RawFeeding<'a> {
    pub unit_id: &'a str,
    pub timestamp: &'a str,
    pub quantity: &'a str,
    pub feed_type: &'a str,
    pub appetite_rating: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct RawMortality<'a> {
    pub unit_id: &'a str,
    pub date: &'a str,
    pub count_dead: &'a str,
    pub status: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct RawWeighing<'a> {
    pub unit_id: &'a str,
    pub date: &'a str,
    pub sample_size: &'a str,
    pub average_sample_weight: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct RawSale<'a> {
    pub unit_id: &'a str,
    pub date: &'a str,
    pub quantity: &'a str,
    pub price_per_unit_mass: &'a str,
    pub total_price: Option<&'a str>,
    pub buyer: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct RawCost<'a> {
    pub unit_id: &'a str,
    pub date: &'a str,
    pub category: &'a str,
    pub amount: &'a str,
    pub description: Option<&'a str>,
}

fn required<'a>(field: &'static str, raw: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(trimmed)
    }
}

/// A finite, non-negative mass or amount.
pub fn parse_mass(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    let text = required(field, raw)?;
    let value = text
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::NotANumber { field, raw: raw.to_string() })?;
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(value)
}

/// A whole, non-negative count. Fractions are rejected rather than truncated.
pub fn parse_count(field: &'static str, raw: &str) -> Result<u64, ValidationError> {
    let text = required(field, raw)?;
    let value = text
        .parse::<i64>()
        .map_err(|_| ValidationError::NotANumber { field, raw: raw.to_string() })?;
    if value < 0 {
        return Err(ValidationError::Negative { field, value: value as f64 });
    }
    Ok(value as u64)
}

pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, ValidationError> {
    let text = required(field, raw)?;
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate { field, raw: raw.to_string() })
}

/// Accepts ISO-like timestamps with or without seconds; a bare date means midnight.
pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<NaiveDateTime, ValidationError> {
    let text = required(field, raw)?;
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| ValidationError::InvalidDate { field, raw: raw.to_string() })
}

fn parse_in_range(field: &'static str, raw: &str, min: f64, max: f64) -> Result<f64, ValidationError> {
    let value = parse_mass(field, raw)?;
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { field, value, min, max });
    }
    Ok(value)
}

fn check_unit(unit: &ProductionUnit, raw_unit_id: &str) -> Result<String, ValidationError> {
    let found = required("unit_id", raw_unit_id)?;
    if found != unit.id {
        return Err(ValidationError::UnitMismatch { expected: unit.id.clone(), found: found.to_string() });
    }
    Ok(unit.id.clone())
}

fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn validate_feeding(raw: &RawFeeding<'_>, unit: &ProductionUnit) -> Result<FeedingEvent, ValidationError> {
    let unit_id = check_unit(unit, raw.unit_id)?;
    let appetite_rating = match raw.appetite_rating.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => Some(parse_in_range("appetite_rating", text, 1.0, 5.0)?),
        None => None,
    };
    Ok(FeedingEvent {
        unit_id,
        timestamp: parse_timestamp("timestamp", raw.timestamp)?,
        quantity: parse_mass("quantity", raw.quantity)?,
        feed_type: required("feed_type", raw.feed_type)?.to_string(),
        appetite_rating,
    })
}

/// `remaining_population` is the live count before this observation is applied.
pub fn validate_mortality(
    raw: &RawMortality<'_>,
    unit: &ProductionUnit,
    remaining_population: u64,
) -> Result<MortalityObservation, ValidationError> {
    let unit_id = check_unit(unit, raw.unit_id)?;
    let date = parse_date("date", raw.date)?;
    let count_dead = parse_count("count_dead", raw.count_dead)?;
    if count_dead > remaining_population {
        return Err(ValidationError::ExceedsRemainingPopulation {
            field: "count_dead",
            requested: count_dead,
            remaining: remaining_population,
        });
    }
    let status = match raw.status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("normal") => HealthStatus::Normal,
        Some("alert") => HealthStatus::Alert,
        Some(other) => {
            return Err(ValidationError::UnknownVariant { field: "status", raw: other.to_string() })
        }
    };
    Ok(MortalityObservation {
        unit_id,
        date,
        count_dead: count_dead as i64,
        status,
    })
}

pub fn validate_weighing(raw: &RawWeighing<'_>, unit: &ProductionUnit) -> Result<Weighing, ValidationError> {
    let unit_id = check_unit(unit, raw.unit_id)?;
    let date = parse_date("date", raw.date)?;
    let sample_size = parse_count("sample_size", raw.sample_size)?;
    if sample_size == 0 {
        return Err(ValidationError::OutOfRange {
            field: "sample_size",
            value: 0.0,
            min: 1.0,
            max: f64::MAX,
        });
    }
    Ok(Weighing {
        unit_id,
        date,
        sample_size: sample_size as i64,
        average_sample_weight: parse_mass("average_sample_weight", raw.average_sample_weight)?,
        total_biomass: None,
        growth_rate: None,
    })
}

/// A missing total is rebuilt from quantity and unit price.
pub fn validate_sale(raw: &RawSale<'_>, unit: &ProductionUnit) -> Result<Sale, ValidationError> {
    let unit_id = check_unit(unit, raw.unit_id)?;
    let date = parse_date("date", raw.date)?;
    let quantity = parse_mass("quantity", raw.quantity)?;
    let price_per_unit_mass = parse_mass("price_per_unit_mass", raw.price_per_unit_mass)?;
    let total_price = match raw.total_price.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => parse_mass("total_price", text)?,
        None => {
            let total = quantity * price_per_unit_mass;
            if !total.is_finite() {
                return Err(ValidationError::OutOfRange {
                    field: "total_price",
                    value: total,
                    min: 0.0,
                    max: f64::MAX,
                });
            }
            total
        }
    };
    Ok(Sale {
        unit_id,
        date,
        quantity,
        price_per_unit_mass,
        total_price,
        buyer: optional_text(raw.buyer),
    })
}

pub fn validate_cost(raw: &RawCost<'_>, unit: &ProductionUnit) -> Result<CostEntry, ValidationError> {
    let unit_id = check_unit(unit, raw.unit_id)?;
    let date = parse_date("date", raw.date)?;
    let category_text = required("category", raw.category)?;
    let category = CostCategory::parse(category_text).ok_or_else(|| ValidationError::UnknownVariant {
        field: "category",
        raw: category_text.to_string(),
    })?;
    Ok(CostEntry {
        unit_id,
        date,
        category,
        amount: parse_mass("amount", raw.amount)?,
        description: optional_text(raw.description),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> ProductionUnit {
        ProductionUnit::new("CAGE-04", "tilapia", NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()).with_stock(500, 0.02)
    }

    fn feeding<'a>(quantity: &'a str) -> RawFeeding<'a> {
        RawFeeding {
            unit_id: "CAGE-04",
            timestamp: "2026-02-01 07:30",
            quantity,
            feed_type: "grower",
            appetite_rating: Some("4"),
        }
    }

    #[test]
    fn valid_feeding_is_accepted() {
        let event = validate_feeding(&feeding("12.5"), &unit()).unwrap();
        assert_eq!(event.quantity, 12.5);
        assert_eq!(event.appetite_rating, Some(4.0));
        assert_eq!(event.timestamp.to_string(), "2026-02-01 07:30:00");
    }

    #[test]
    fn negative_mass_names_the_field() {
        let err = validate_feeding(&feeding("-3"), &unit()).unwrap_err();
        assert_eq!(err, ValidationError::Negative { field: "quantity", value: -3.0 });
        assert_eq!(err.field(), "quantity");
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        for raw in ["abc", "NaN", "inf", "1,5"] {
            let err = validate_feeding(&feeding(raw), &unit()).unwrap_err();
            assert!(matches!(err, ValidationError::NotANumber { field: "quantity", .. }), "{raw}: {err}");
        }
        assert_eq!(
            validate_feeding(&feeding("  "), &unit()).unwrap_err(),
            ValidationError::Empty { field: "quantity" }
        );
    }

    #[test]
    fn appetite_rating_must_be_on_scale() {
        let mut raw = feeding("10");
        raw.appetite_rating = Some("7");
        let err = validate_feeding(&raw, &unit()).unwrap_err();
        assert_eq!(err.field(), "appetite_rating");
        raw.appetite_rating = Some("");
        assert_eq!(validate_feeding(&raw, &unit()).unwrap().appetite_rating, None);
    }

    #[test]
    fn mortality_cannot_exceed_remaining_population() {
        let raw = RawMortality { unit_id: "CAGE-04", date: "2026-02-02", count_dead: "120", status: Some("alert") };
        let err = validate_mortality(&raw, &unit(), 100).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ExceedsRemainingPopulation { field: "count_dead", requested: 120, remaining: 100 }
        );
        let ok = validate_mortality(&raw, &unit(), 120).unwrap();
        assert_eq!(ok.status, HealthStatus::Alert);
    }

    #[test]
    fn mortality_rejects_fractional_and_negative_counts() {
        let mut raw = RawMortality { unit_id: "CAGE-04", date: "2026-02-02", count_dead: "2.5", status: None };
        assert!(matches!(
            validate_mortality(&raw, &unit(), 100),
            Err(ValidationError::NotANumber { field: "count_dead", .. })
        ));
        raw.count_dead = "-1";
        assert!(matches!(
            validate_mortality(&raw, &unit(), 100),
            Err(ValidationError::Negative { field: "count_dead", .. })
        ));
        raw.count_dead = "1";
        raw.status = Some("sick");
        assert_eq!(validate_mortality(&raw, &unit(), 100).unwrap_err().field(), "status");
    }

    #[test]
    fn entries_for_another_unit_are_rejected() {
        let raw = RawWeighing {
            unit_id: "CAGE-99",
            date: "2026-02-02",
            sample_size: "30",
            average_sample_weight: "0.1",
        };
        assert!(matches!(
            validate_weighing(&raw, &unit()),
            Err(ValidationError::UnitMismatch { .. })
        ));
    }

    #[test]
    fn weighing_needs_a_sample() {
        let raw = RawWeighing { unit_id: "CAGE-04", date: "2026-02-02", sample_size: "0", average_sample_weight: "0.1" };
        assert_eq!(validate_weighing(&raw, &unit()).unwrap_err().field(), "sample_size");
    }

    #[test]
    fn bad_dates_are_rejected() {
        let raw = RawWeighing { unit_id: "CAGE-04", date: "02/02/2026", sample_size: "10", average_sample_weight: "0.1" };
        assert_eq!(
            validate_weighing(&raw, &unit()).unwrap_err(),
            ValidationError::InvalidDate { field: "date", raw: "02/02/2026".to_string() }
        );
        assert!(parse_timestamp("timestamp", "2026-02-01").is_ok());
    }

    #[test]
    fn sale_total_defaults_to_quantity_times_price() {
        let raw = RawSale {
            unit_id: "CAGE-04",
            date: "2026-05-01",
            quantity: "100",
            price_per_unit_mass: "3.5",
            total_price: None,
            buyer: Some("  "),
        };
        let sale = validate_sale(&raw, &unit()).unwrap();
        assert_eq!(sale.total_price, 350.0);
        assert_eq!(sale.buyer, None);
    }

    #[test]
    fn overflowing_sale_total_is_rejected() {
        let raw = RawSale {
            unit_id: "CAGE-04",
            date: "2026-05-01",
            quantity: "1e200",
            price_per_unit_mass: "1e200",
            ..RawSale::default()
        };
        let err = validate_sale(&raw, &unit()).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "total_price", .. }));
    }

    #[test]
    fn cost_category_must_be_known() {
        let raw = RawCost { unit_id: "CAGE-04", date: "2026-05-01", category: "rent", amount: "10", description: None };
        assert_eq!(
            validate_cost(&raw, &unit()).unwrap_err(),
            ValidationError::UnknownVariant { field: "category", raw: "rent".to_string() }
        );
    }
}
