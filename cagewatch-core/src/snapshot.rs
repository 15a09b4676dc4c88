use crate::{
    metrics::{
        compute_biomass, compute_cost_per_kg, compute_fcr, compute_growth_rate,
        compute_remaining_population, compute_survival_rate, current_average_weight, total_costs,
        Metric,
    },
    performance::{classify_performance_with, PerformanceThresholds, PerformanceTier},
    summary::{
        costs_by_category, summarize_feeding, summarize_mortality, summarize_sales, FeedingSummary,
        MortalitySummary, SalesSummary,
    },
};
use cagewatch_schemas::{
    events::{CostCategory, UnitEvents},
    unit::ProductionUnit,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Derived metrics for one production unit at the time its events were read.
///
/// This is a cache of a pure function over the unit and its event log; it is never a
/// source of truth and carries no clock reading, so the same inputs always produce an
/// identical snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub unit_id: String,
    pub feed_conversion_ratio: Metric,
    pub survival_rate: Metric,
    pub growth_rate: Metric,
    pub cost_per_kg: Metric,
    pub remaining_population: u64,
    pub current_average_weight: f64,
    pub biomass: f64,
    /// `None` when FCR or survival could not be computed.
    pub performance: Option<PerformanceTier>,
    pub feeding: FeedingSummary,
    pub mortality: MortalitySummary,
    pub sales: SalesSummary,
    pub total_costs: f64,
    pub costs_by_category: BTreeMap<CostCategory, f64>,
}

impl MetricsSnapshot {
    /// True when any headline metric is missing or flagged.
    pub fn is_low_confidence(&self) -> bool {
        ![
            self.feed_conversion_ratio,
            self.survival_rate,
            self.growth_rate,
            self.cost_per_kg,
        ]
        .iter()
        .all(Metric::is_computed)
    }
}

/// Computes a snapshot with the standard performance thresholds.
pub fn compute_snapshot(unit: &ProductionUnit, events: &UnitEvents) -> MetricsSnapshot {
    compute_snapshot_with(unit, events, &PerformanceThresholds::default())
}

pub fn compute_snapshot_with(
    unit: &ProductionUnit,
    events: &UnitEvents,
    thresholds: &PerformanceThresholds,
) -> MetricsSnapshot {
    let remaining_population = compute_remaining_population(unit.initial_population, &events.mortality);
    let average_weight = current_average_weight(unit, &events.weighings);
    let biomass = compute_biomass(remaining_population, average_weight);

    let feed_conversion_ratio = compute_fcr(unit, &events.feeding, &events.weighings, &events.mortality);
    let survival_rate = compute_survival_rate(unit.initial_population, &events.mortality);

    let performance = match (feed_conversion_ratio.value(), survival_rate.value()) {
        (Some(fcr), Some(survival)) => Some(classify_performance_with(fcr, survival, thresholds)),
        _ => None,
    };

    log::trace!(
        "Snapshot for '{}': {} alive, {:.2} kg biomass",
        unit.id,
        remaining_population,
        biomass
    );

    MetricsSnapshot {
        unit_id: unit.id.clone(),
        feed_conversion_ratio,
        survival_rate,
        growth_rate: compute_growth_rate(&events.weighings),
        cost_per_kg: compute_cost_per_kg(&events.costs, biomass),
        remaining_population,
        current_average_weight: average_weight,
        biomass,
        performance,
        feeding: summarize_feeding(unit, &events.feeding),
        mortality: summarize_mortality(&events.mortality),
        sales: summarize_sales(&events.sales, biomass),
        total_costs: total_costs(&events.costs),
        costs_by_category: costs_by_category(&events.costs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricStatus;
    use approx::assert_relative_eq;
    use cagewatch_schemas::events::{
        CostCategory, CostEntry, FeedingEvent, HealthStatus, MortalityObservation, Sale, Weighing,
    };
    use chrono::NaiveDate;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    fn unit() -> ProductionUnit {
        ProductionUnit::new("CAGE-03", "tilapia", date(3, 1)).with_stock(1000, 0.05)
    }

    fn events() -> UnitEvents {
        let id = "CAGE-03".to_string();
        UnitEvents {
            feeding: (1..=10)
                .map(|day| FeedingEvent {
                    unit_id: id.clone(),
                    timestamp: date(3, day).and_hms_opt(8, 0, 0).unwrap(),
                    quantity: 25.0,
                    feed_type: "grower".to_string(),
                    appetite_rating: Some(4.0),
                })
                .collect(),
            mortality: vec![MortalityObservation {
                unit_id: id.clone(),
                date: date(3, 5),
                count_dead: 40,
                status: HealthStatus::Normal,
            }],
            weighings: vec![
                Weighing {
                    unit_id: id.clone(),
                    date: date(3, 2),
                    sample_size: 30,
                    average_sample_weight: 0.20,
                    total_biomass: None,
                    growth_rate: None,
                },
                Weighing {
                    unit_id: id.clone(),
                    date: date(3, 9),
                    sample_size: 30,
                    average_sample_weight: 0.25,
                    total_biomass: None,
                    growth_rate: None,
                },
            ],
            sales: vec![Sale {
                unit_id: id.clone(),
                date: date(3, 10),
                quantity: 40.0,
                price_per_unit_mass: 5.0,
                total_price: 200.0,
                buyer: Some("market".to_string()),
            }],
            costs: vec![CostEntry {
                unit_id: id,
                date: date(3, 1),
                category: CostCategory::Feed,
                amount: 480.0,
                description: None,
            }],
        }
    }

    #[test]
    fn snapshot_combines_all_metrics() {
        let snapshot = compute_snapshot(&unit(), &events());

        assert_eq!(snapshot.remaining_population, 960);
        assert_relative_eq!(snapshot.current_average_weight, 0.25, epsilon = 1e-9);
        assert_relative_eq!(snapshot.biomass, 240.0, epsilon = 1e-9);
        // 250 kg of feed over 240 - 50 = 190 kg of gain.
        assert_relative_eq!(snapshot.feed_conversion_ratio.value, 250.0 / 190.0, epsilon = 1e-9);
        assert_relative_eq!(snapshot.survival_rate.value, 96.0, epsilon = 1e-9);
        assert_relative_eq!(snapshot.growth_rate.value, 25.0, epsilon = 1e-9);
        assert_relative_eq!(snapshot.cost_per_kg.value, 2.0, epsilon = 1e-9);
        assert_eq!(snapshot.performance, Some(PerformanceTier::Excellent));
        assert_relative_eq!(snapshot.sales.unsold_biomass_kg, 200.0, epsilon = 1e-9);
        assert_eq!(snapshot.costs_by_category.len(), 1);
        assert_relative_eq!(snapshot.costs_by_category[&CostCategory::Feed], 480.0, epsilon = 1e-9);
        assert!(!snapshot.is_low_confidence());
    }

    #[test]
    fn snapshot_is_idempotent() {
        let (unit, events) = (unit(), events());
        let first = compute_snapshot(&unit, &events);
        let second = compute_snapshot(&unit, &events);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.biomass.to_bits(), second.biomass.to_bits());
        assert_eq!(
            first.feed_conversion_ratio.value.to_bits(),
            second.feed_conversion_ratio.value.to_bits()
        );
    }

    #[test]
    fn empty_history_still_renders() {
        let snapshot = compute_snapshot(&unit(), &UnitEvents::default());

        assert_eq!(snapshot.growth_rate.status, MetricStatus::InsufficientData);
        assert_eq!(snapshot.feed_conversion_ratio.status, MetricStatus::Undefined);
        assert_eq!(snapshot.performance, None);
        assert_eq!(snapshot.growth_rate.display(1), "N/A");
        assert!(snapshot.is_low_confidence());
        assert_relative_eq!(snapshot.survival_rate.value, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn noisy_records_are_treated_as_zero() {
        let mut events = events();
        events.feeding[0].quantity = -100.0;
        events.mortality[0].count_dead = -5;
        events.costs[0].amount = f64::NAN;

        let snapshot = compute_snapshot(&unit(), &events);
        assert_eq!(snapshot.remaining_population, 1000);
        assert_relative_eq!(snapshot.feeding.total_feed_kg, 225.0, epsilon = 1e-9);
        assert_eq!(snapshot.total_costs, 0.0);
        assert_eq!(snapshot.cost_per_kg.value, 0.0);
    }
}
