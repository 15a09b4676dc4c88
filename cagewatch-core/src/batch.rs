//! Periodic recompute sweep across many production units.

use crate::{
    error::MetricsError,
    performance::PerformanceThresholds,
    snapshot::{compute_snapshot_with, MetricsSnapshot},
    store::EventSource,
};
use rayon::prelude::*;

/// Outcome of a sweep. One unit failing never removes another unit's snapshot.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Sorted by unit id.
    pub snapshots: Vec<MetricsSnapshot>,
    /// Sorted by unit id.
    pub failures: Vec<(String, MetricsError)>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn snapshot(&self, unit_id: &str) -> Option<&MetricsSnapshot> {
        self.snapshots.iter().find(|s| s.unit_id == unit_id)
    }
}

/// Fetches and computes one unit.
pub fn compute_unit<S>(
    source: &S,
    unit_id: &str,
    thresholds: &PerformanceThresholds,
) -> Result<MetricsSnapshot, MetricsError>
where
    S: EventSource + ?Sized,
{
    let unit = source.fetch_unit(unit_id)?;
    let events = source.fetch_events_for_unit(unit_id)?;
    Ok(compute_snapshot_with(&unit, &events, thresholds))
}

/// Computes every listed unit in parallel and collects successes and failures
/// separately.
pub fn compute_batch<S>(source: &S, unit_ids: &[String], thresholds: &PerformanceThresholds) -> BatchReport
where
    S: EventSource + ?Sized,
{
    let results: Vec<(String, Result<MetricsSnapshot, MetricsError>)> = unit_ids
        .par_iter()
        .map(|id| (id.clone(), compute_unit(source, id, thresholds)))
        .collect();

    let mut report = BatchReport::default();
    for (unit_id, result) in results {
        match result {
            Ok(snapshot) => report.snapshots.push(snapshot),
            Err(err) => {
                log::warn!("Skipping unit '{}': {}", unit_id, err);
                report.failures.push((unit_id, err));
            }
        }
    }
    report.snapshots.sort_by(|a, b| a.unit_id.cmp(&b.unit_id));
    report.failures.sort_by(|a, b| a.0.cmp(&b.0));

    log::info!(
        "Recomputed {} unit(s), {} failure(s)",
        report.snapshots.len(),
        report.failures.len()
    );
    report
}

/// Sweeps every unit the source knows about.
pub fn compute_all<S>(source: &S, thresholds: &PerformanceThresholds) -> BatchReport
where
    S: EventSource + ?Sized,
{
    compute_batch(source, &source.unit_ids(), thresholds)
}
