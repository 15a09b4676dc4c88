use crate::{
    error::MetricsError,
    performance::PerformanceThresholds,
    snapshot::{compute_snapshot_with, MetricsSnapshot},
    store::EventSource,
};
use dashmap::DashMap;
use std::sync::Arc;

/// Last computed snapshot per production unit.
///
/// Entries are only dropped when the caller invalidates them, normally right after an
/// event is appended to the unit's log. Each owner holds its own cache; clones share
/// the same entries.
///
/// Every invalidation bumps the unit's generation. A snapshot computed from a read
/// taken before the bump is handed back to its caller but never stored.
#[derive(Clone, Default)]
pub struct SnapshotCache {
    entries: Arc<DashMap<String, MetricsSnapshot>>,
    generations: Arc<DashMap<String, u64>>,
    thresholds: PerformanceThresholds,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: PerformanceThresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    pub fn thresholds(&self) -> &PerformanceThresholds {
        &self.thresholds
    }

    pub fn get(&self, unit_id: &str) -> Option<MetricsSnapshot> {
        self.entries.get(unit_id).map(|s| s.value().clone())
    }

    /// Current generation of the unit; take it before reading the source.
    pub fn generation(&self, unit_id: &str) -> u64 {
        self.generations.get(unit_id).map_or(0, |g| *g.value())
    }

    pub fn insert(&self, snapshot: MetricsSnapshot) {
        self.entries.insert(snapshot.unit_id.clone(), snapshot);
    }

    /// Stores the snapshot only if the unit has not been invalidated since
    /// `generation` was read. Returns whether it was stored.
    pub fn insert_if_current(&self, snapshot: MetricsSnapshot, generation: u64) -> bool {
        // Holding the generation entry keeps `invalidate` out until the insert is done.
        let current = self.generations.entry(snapshot.unit_id.clone()).or_insert(0);
        if *current != generation {
            log::debug!("Discarding stale snapshot for '{}'", snapshot.unit_id);
            return false;
        }
        self.entries.insert(snapshot.unit_id.clone(), snapshot);
        true
    }

    /// Drops the unit's snapshot; returns whether one was cached.
    pub fn invalidate(&self, unit_id: &str) -> bool {
        let mut generation = self.generations.entry(unit_id.to_string()).or_insert(0);
        *generation += 1;
        let removed = self.entries.remove(unit_id).is_some();
        drop(generation);
        if removed {
            log::debug!("Invalidated cached snapshot for '{}'", unit_id);
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached snapshot, computing and storing it on a miss.
    pub fn get_or_compute<S>(&self, unit_id: &str, source: &S) -> Result<MetricsSnapshot, MetricsError>
    where
        S: EventSource + ?Sized,
    {
        if let Some(snapshot) = self.get(unit_id) {
            log::trace!("Snapshot cache hit for '{}'", unit_id);
            return Ok(snapshot);
        }
        log::debug!("Snapshot cache miss for '{}'", unit_id);
        let generation = self.generation(unit_id);
        let unit = source.fetch_unit(unit_id)?;
        let events = source.fetch_events_for_unit(unit_id)?;
        let snapshot = compute_snapshot_with(&unit, &events, &self.thresholds);
        self.insert_if_current(snapshot.clone(), generation);
        Ok(snapshot)
    }
}
