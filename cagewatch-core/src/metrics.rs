//! Point-in-time performance metrics for a production unit.
//!
//! Every function here is a pure fold over the records it is handed. Noisy input is
//! never an error at this tier: negative, non-finite or missing quantities count as
//! zero, and a metric that cannot be computed is returned as `0` carrying a
//! [`MetricStatus`] that says why.

use cagewatch_schemas::{
    events::{CostEntry, FeedingEvent, MortalityObservation, Weighing},
    unit::ProductionUnit,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether a metric value can be trusted for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    Computed,
    /// Not enough data points yet (e.g., a single weighing for growth rate).
    InsufficientData,
    /// The formula has no meaningful value (e.g., FCR with no weight gain).
    Undefined,
}

impl MetricStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Computed => "computed",
            Self::InsufficientData => "insufficient_data",
            Self::Undefined => "undefined",
        }
    }
}

/// A metric value together with its confidence flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub value: f64,
    pub status: MetricStatus,
}

impl Metric {
    /// A computed value. Non-finite results degrade to `undefined`.
    pub fn computed(value: f64) -> Self {
        if value.is_finite() {
            Self { value, status: MetricStatus::Computed }
        } else {
            Self::undefined()
        }
    }

    pub fn insufficient_data() -> Self {
        Self { value: 0.0, status: MetricStatus::InsufficientData }
    }

    pub fn undefined() -> Self {
        Self { value: 0.0, status: MetricStatus::Undefined }
    }

    pub fn is_computed(&self) -> bool {
        self.status == MetricStatus::Computed
    }

    /// The value if it was computed.
    pub fn value(&self) -> Option<f64> {
        self.is_computed().then_some(self.value)
    }

    /// Renders the value for a dashboard cell, or `"N/A"` when it was not computed.
    pub fn display(&self, precision: usize) -> String {
        match self.status {
            MetricStatus::Computed => format!("{:.*}", precision, self.value),
            MetricStatus::InsufficientData | MetricStatus::Undefined => "N/A".to_string(),
        }
    }
}

/// Treats negative, NaN and infinite quantities as zero.
pub(crate) fn clamp_quantity(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        if value != 0.0 {
            log::debug!("Treating out-of-range quantity {} as zero", value);
        }
        0.0
    }
}

/// Treats negative counts as zero.
pub(crate) fn clamp_count(value: i64) -> u64 {
    if value < 0 {
        log::debug!("Treating negative count {} as zero", value);
    }
    value.max(0) as u64
}

pub fn total_deaths(mortality: &[MortalityObservation]) -> u64 {
    mortality
        .iter()
        .map(|m| clamp_count(m.count_dead))
        .fold(0u64, u64::saturating_add)
}

/// `initial_population − Σ count_dead`, never below zero.
pub fn compute_remaining_population(initial_population: i64, mortality: &[MortalityObservation]) -> u64 {
    clamp_count(initial_population).saturating_sub(total_deaths(mortality))
}

/// Percentage of the initial population still alive, clamped to `[0, 100]`.
///
/// An empty initial population yields `0` flagged as undefined.
pub fn compute_survival_rate(initial_population: i64, mortality: &[MortalityObservation]) -> Metric {
    let initial = clamp_count(initial_population);
    if initial == 0 {
        return Metric::undefined();
    }
    let deaths = total_deaths(mortality) as f64;
    let rate = 100.0 * (1.0 - deaths / initial as f64);
    Metric::computed(rate.clamp(0.0, 100.0))
}

/// Total live mass of the population.
pub fn compute_biomass(remaining_population: u64, current_average_weight: f64) -> f64 {
    remaining_population as f64 * clamp_quantity(current_average_weight)
}

/// Weighings in date order. The sort is stable, so entries sharing a date keep their
/// recording order and the last one recorded is treated as the latest.
pub fn sorted_weighings(weighings: &[Weighing]) -> Vec<&Weighing> {
    let mut sorted: Vec<&Weighing> = weighings.iter().collect();
    sorted.sort_by_key(|w| w.date);
    sorted
}

pub fn latest_average_weight(weighings: &[Weighing]) -> Option<f64> {
    sorted_weighings(weighings)
        .last()
        .map(|w| clamp_quantity(w.average_sample_weight))
}

/// The latest weighing if there is one, otherwise the unit's own record.
pub fn current_average_weight(unit: &ProductionUnit, weighings: &[Weighing]) -> f64 {
    latest_average_weight(weighings).unwrap_or_else(|| clamp_quantity(unit.current_average_weight))
}

/// Percentage change in average weight between the two most recent weighings.
pub fn compute_growth_rate(weighings: &[Weighing]) -> Metric {
    let sorted = sorted_weighings(weighings);
    let [.., previous, latest] = sorted.as_slice() else {
        return Metric::insufficient_data();
    };
    let previous_weight = clamp_quantity(previous.average_sample_weight);
    if previous_weight == 0.0 {
        return Metric::undefined();
    }
    let latest_weight = clamp_quantity(latest.average_sample_weight);
    Metric::computed((latest_weight - previous_weight) / previous_weight * 100.0)
}

/// Feed delivered on or after `since`.
pub fn total_feed_since(since: NaiveDate, feeding: &[FeedingEvent]) -> f64 {
    feeding
        .iter()
        .filter(|f| f.timestamp.date() >= since)
        .map(|f| clamp_quantity(f.quantity))
        .sum()
}

/// Feed conversion ratio from lifetime totals.
///
/// No weight gain means the ratio is undefined; no recorded feed means there is not
/// enough data to judge. Both come back as `0` with the matching flag, never NaN or
/// infinity.
pub fn fcr_from_totals(total_feed: f64, weight_gain: f64) -> Metric {
    if !weight_gain.is_finite() || weight_gain <= 0.0 {
        return Metric::undefined();
    }
    let total_feed = clamp_quantity(total_feed);
    if total_feed == 0.0 {
        return Metric::insufficient_data();
    }
    Metric::computed(total_feed / weight_gain)
}

/// Biomass stocked at introduction.
pub fn initial_biomass(unit: &ProductionUnit) -> f64 {
    compute_biomass(clamp_count(unit.initial_population), unit.initial_average_weight)
}

/// Lifetime feed conversion ratio of the unit.
///
/// Feed is counted from the introduction date; weight gain is current biomass minus
/// the biomass stocked at introduction. Gain with no feed recorded comes back as `0`
/// flagged `insufficient_data` rather than a computed ratio of zero; see
/// [`fcr_from_totals`].
pub fn compute_fcr(
    unit: &ProductionUnit,
    feeding: &[FeedingEvent],
    weighings: &[Weighing],
    mortality: &[MortalityObservation],
) -> Metric {
    let remaining = compute_remaining_population(unit.initial_population, mortality);
    let current = compute_biomass(remaining, current_average_weight(unit, weighings));
    let gain = current - initial_biomass(unit);
    fcr_from_totals(total_feed_since(unit.introduction_date, feeding), gain)
}

pub fn total_costs(costs: &[CostEntry]) -> f64 {
    costs.iter().map(|c| clamp_quantity(c.amount)).sum()
}

/// Accumulated cost per kilogram of standing biomass.
pub fn compute_cost_per_kg(costs: &[CostEntry], current_biomass: f64) -> Metric {
    let biomass = clamp_quantity(current_biomass);
    if biomass == 0.0 {
        return Metric::undefined();
    }
    Metric::computed(total_costs(costs) / biomass)
}
