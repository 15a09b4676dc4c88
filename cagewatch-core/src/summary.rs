//! Secondary totals shown next to the headline metrics.

use crate::metrics::{clamp_quantity, total_deaths};
use cagewatch_schemas::{
    events::{CostCategory, CostEntry, FeedingEvent, HealthStatus, MortalityObservation, Sale},
    unit::ProductionUnit,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedingSummary {
    pub total_feed_kg: f64,
    pub sessions: usize,
    /// Mean of the rated sessions only; `None` when nothing was rated.
    pub average_appetite: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MortalitySummary {
    pub total_dead: u64,
    pub observations: usize,
    pub alerts: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SalesSummary {
    pub sold_kg: f64,
    pub revenue: f64,
    pub average_price_per_kg: Option<f64>,
    /// Standing biomass not yet sold, never below zero.
    pub unsold_biomass_kg: f64,
}

/// Feeding sessions from the unit's introduction date onward.
pub fn summarize_feeding(unit: &ProductionUnit, feeding: &[FeedingEvent]) -> FeedingSummary {
    let in_cycle: Vec<&FeedingEvent> = feeding
        .iter()
        .filter(|f| f.timestamp.date() >= unit.introduction_date)
        .collect();
    let ratings: Vec<f64> = in_cycle
        .iter()
        .filter_map(|f| f.appetite_rating)
        .filter(|r| r.is_finite() && *r > 0.0)
        .collect();
    let average_appetite = (!ratings.is_empty()).then(|| ratings.iter().sum::<f64>() / ratings.len() as f64);

    FeedingSummary {
        total_feed_kg: in_cycle.iter().map(|f| clamp_quantity(f.quantity)).sum(),
        sessions: in_cycle.len(),
        average_appetite,
    }
}

pub fn summarize_mortality(mortality: &[MortalityObservation]) -> MortalitySummary {
    MortalitySummary {
        total_dead: total_deaths(mortality),
        observations: mortality.len(),
        alerts: mortality.iter().filter(|m| m.status == HealthStatus::Alert).count(),
    }
}

/// Revenue of a single sale. The recorded total wins; otherwise it is rebuilt from
/// quantity and unit price.
pub fn sale_revenue(sale: &Sale) -> f64 {
    let recorded = clamp_quantity(sale.total_price);
    if recorded > 0.0 {
        recorded
    } else {
        clamp_quantity(sale.quantity) * clamp_quantity(sale.price_per_unit_mass)
    }
}

pub fn summarize_sales(sales: &[Sale], biomass: f64) -> SalesSummary {
    let sold_kg: f64 = sales.iter().map(|s| clamp_quantity(s.quantity)).sum();
    let revenue: f64 = sales.iter().map(sale_revenue).sum();
    SalesSummary {
        sold_kg,
        revenue,
        average_price_per_kg: (sold_kg > 0.0).then(|| revenue / sold_kg),
        unsold_biomass_kg: (clamp_quantity(biomass) - sold_kg).max(0.0),
    }
}

pub fn costs_by_category(costs: &[CostEntry]) -> BTreeMap<CostCategory, f64> {
    let mut totals = BTreeMap::new();
    for entry in costs {
        *totals.entry(entry.category).or_insert(0.0) += clamp_quantity(entry.amount);
    }
    totals
}
