//! Defines the production unit ("cage") whose population and performance are tracked
//! across a growth cycle.

use crate::numeric::{lenient_count, lenient_f64};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Operational state of a production unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// No stock; between cycles.
    #[default]
    Empty,
    /// Stocked and in production.
    Active,
    /// Out of service for repair or cleaning.
    Maintenance,
}

/// The physical or logical container whose population is tracked over a growth cycle.
///
/// Counts are stored signed so that noisy records survive loading; the aggregator
/// clamps anything negative to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionUnit {
    /// A unique, machine-readable identifier for the unit (e.g., "CAGE-07").
    pub id: String,
    /// The species stocked in the unit (e.g., "Oreochromis niloticus").
    pub species: String,
    /// Number of individuals stocked at introduction.
    #[serde(default, deserialize_with = "lenient_count")]
    pub initial_population: i64,
    /// Average individual weight at introduction, in kilograms.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub initial_average_weight: f64,
    /// Last known average individual weight, in kilograms. Superseded by the latest weighing.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_average_weight: f64,
    /// The date the stock was introduced; feed recorded before this date is not counted.
    pub introduction_date: NaiveDate,
    #[serde(default)]
    pub status: UnitStatus,
}

impl ProductionUnit {
    pub fn new(id: impl Into<String>, species: impl Into<String>, introduction_date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            species: species.into(),
            initial_population: 0,
            initial_average_weight: 0.0,
            current_average_weight: 0.0,
            introduction_date,
            status: UnitStatus::Active,
        }
    }

    pub fn with_stock(mut self, population: i64, average_weight_kg: f64) -> Self {
        self.initial_population = population;
        self.initial_average_weight = average_weight_kg;
        self.current_average_weight = average_weight_kg;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_loads_from_yaml_with_defaults() {
        let yaml = r#"
id: CAGE-01
species: tilapia
initial_population: "1000"
initial_average_weight: 0.05
introduction_date: 2026-03-01
"#;
        let unit: ProductionUnit = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(unit.initial_population, 1000);
        assert_eq!(unit.current_average_weight, 0.0);
        assert_eq!(unit.status, UnitStatus::Empty);
    }

    #[test]
    fn status_uses_snake_case_names() {
        let status: UnitStatus = serde_yaml::from_str("maintenance").unwrap();
        assert_eq!(status, UnitStatus::Maintenance);
    }
}
