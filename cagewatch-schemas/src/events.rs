//! Append-only operational records for a production unit.
//!
//! Every record carries the id of the unit it belongs to and a date or timestamp.
//! Records are never edited after they are written; corrections are new records.

use crate::numeric::{lenient_count, lenient_f64, lenient_opt_f64};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A single feeding session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedingEvent {
    pub unit_id: String,
    pub timestamp: NaiveDateTime,
    /// Feed delivered, in kilograms.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity: f64,
    #[serde(default)]
    pub feed_type: String,
    /// Observed appetite on a 1 (refused) to 5 (voracious) scale.
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub appetite_rating: Option<f64>,
}

/// Severity recorded alongside a mortality count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Normal,
    Alert,
}

/// Dead individuals counted on a given day. Counts are cumulative across the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortalityObservation {
    pub unit_id: String,
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "lenient_count")]
    pub count_dead: i64,
    #[serde(default)]
    pub status: HealthStatus,
}

/// A sample weighing. The most recent weighing defines the unit's current average weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weighing {
    pub unit_id: String,
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "lenient_count")]
    pub sample_size: i64,
    /// Average weight of the sampled individuals, in kilograms.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub average_sample_weight: f64,
    /// Derived: average weight times the population at the time of weighing.
    #[serde(default, deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub total_biomass: Option<f64>,
    /// Derived: percentage change against the previous weighing.
    #[serde(default, deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub growth_rate: Option<f64>,
}

impl Weighing {
    /// Fills `total_biomass` from `population` and `growth_rate` from the previous
    /// weighing's average, when there is one above zero.
    pub fn derive_fields(&mut self, previous_average: Option<f64>, population: i64) {
        let average = self.average_sample_weight.max(0.0);
        self.total_biomass = Some(average * population.max(0) as f64);
        self.growth_rate = match previous_average {
            Some(prev) if prev > 0.0 => Some((average - prev) / prev * 100.0),
            _ => None,
        };
    }
}

/// A harvest sale. Reduces the economically live biomass; never deletes any record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub unit_id: String,
    pub date: NaiveDate,
    /// Mass sold, in kilograms.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_per_unit_mass: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer: Option<String>,
}

/// Ledger category for operating costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Feed,
    Fingerlings,
    Labor,
    Medication,
    Energy,
    Maintenance,
    #[default]
    #[serde(other)]
    Other,
}

impl CostCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "feed" => Some(Self::Feed),
            "fingerlings" => Some(Self::Fingerlings),
            "labor" | "labour" => Some(Self::Labor),
            "medication" => Some(Self::Medication),
            "energy" => Some(Self::Energy),
            "maintenance" => Some(Self::Maintenance),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEntry {
    pub unit_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub category: CostCategory,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The full event history of one production unit, grouped by kind.
///
/// Each collection is expected in ascending time order; consumers that need the
/// latest entries sort defensively anyway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitEvents {
    #[serde(default)]
    pub feeding: Vec<FeedingEvent>,
    #[serde(default)]
    pub mortality: Vec<MortalityObservation>,
    #[serde(default)]
    pub weighings: Vec<Weighing>,
    #[serde(default)]
    pub sales: Vec<Sale>,
    #[serde(default)]
    pub costs: Vec<CostEntry>,
}

impl UnitEvents {
    pub fn is_empty(&self) -> bool {
        self.feeding.is_empty()
            && self.mortality.is_empty()
            && self.weighings.is_empty()
            && self.sales.is_empty()
            && self.costs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.feeding.len() + self.mortality.len() + self.weighings.len() + self.sales.len() + self.costs.len()
    }
}

/// Fills the derived fields of each weighing in place.
///
/// `population` is the live count to multiply against; growth is measured against the
/// previous weighing in the slice's order and left empty for the first one.
pub fn derive_weighing_fields(weighings: &mut [Weighing], population: i64) {
    let mut previous: Option<f64> = None;
    for weighing in weighings.iter_mut() {
        weighing.derive_fields(previous, population);
        previous = Some(weighing.average_sample_weight.max(0.0));
    }
}
