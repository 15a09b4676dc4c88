use crate::{
    batch::{compute_batch, BatchReport},
    cache::SnapshotCache,
    error::MetricsError,
    metrics::{compute_remaining_population, sorted_weighings},
    performance::PerformanceThresholds,
    snapshot::MetricsSnapshot,
    store::{EventSink, EventSource, NewEvent},
    validation::{
        validate_cost, validate_feeding, validate_mortality, validate_sale, validate_weighing, RawCost,
        RawFeeding, RawMortality, RawSale, RawWeighing,
    },
};
use cagewatch_schemas::{
    events::{derive_weighing_fields, UnitEvents, Weighing},
    unit::ProductionUnit,
};

/// Front door for the surrounding application: validated recording plus cached reads.
///
/// Every accepted record invalidates the unit's cached snapshot, so the next read
/// reflects it. Validation runs against the log as it stands under the store's
/// per-unit lock.
pub struct MetricsService<S> {
    source: S,
    cache: SnapshotCache,
}

impl<S> MetricsService<S>
where
    S: EventSource + EventSink,
{
    pub fn new(source: S) -> Self {
        Self::with_thresholds(source, PerformanceThresholds::default())
    }

    pub fn with_thresholds(source: S, thresholds: PerformanceThresholds) -> Self {
        Self {
            source,
            cache: SnapshotCache::with_thresholds(thresholds),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn snapshot(&self, unit_id: &str) -> Result<MetricsSnapshot, MetricsError> {
        self.cache.get_or_compute(unit_id, &self.source)
    }

    /// Recomputes every unit and caches the snapshots that succeeded, unless the unit
    /// was invalidated while the sweep ran.
    pub fn refresh_all(&self) -> BatchReport {
        let unit_ids = self.source.unit_ids();
        let generations: Vec<u64> = unit_ids.iter().map(|id| self.cache.generation(id)).collect();
        let report = compute_batch(&self.source, &unit_ids, self.cache.thresholds());

        for (unit_id, generation) in unit_ids.iter().zip(generations) {
            match report.snapshot(unit_id) {
                Some(snapshot) => {
                    self.cache.insert_if_current(snapshot.clone(), generation);
                }
                None => {
                    self.cache.invalidate(unit_id);
                }
            }
        }
        report
    }

    /// Appends an already validated event and returns the unit's fresh snapshot.
    pub fn commit(&self, event: NewEvent) -> Result<MetricsSnapshot, MetricsError> {
        let unit_id = event.unit_id().to_string();
        self.commit_with(&unit_id, |_, _| Ok(event))
    }

    /// Builds the event against the unit's current log, appends it, and returns the
    /// unit's fresh snapshot.
    pub fn commit_with<F>(&self, unit_id: &str, build: F) -> Result<MetricsSnapshot, MetricsError>
    where
        F: FnOnce(&ProductionUnit, &UnitEvents) -> Result<NewEvent, MetricsError>,
    {
        let event = self.source.append_with(unit_id, build)?;
        self.cache.invalidate(unit_id);
        log::info!("Recorded {} event for '{}'", event.kind(), unit_id);
        self.snapshot(unit_id)
    }

    pub fn record_feeding(&self, raw: &RawFeeding<'_>) -> Result<MetricsSnapshot, MetricsError> {
        self.commit_with(raw.unit_id.trim(), |unit, _| {
            Ok(NewEvent::Feeding(validate_feeding(raw, unit)?))
        })
    }

    /// The count is checked against the population left after every death already
    /// recorded, including ones recorded concurrently.
    pub fn record_mortality(&self, raw: &RawMortality<'_>) -> Result<MetricsSnapshot, MetricsError> {
        self.commit_with(raw.unit_id.trim(), |unit, events| {
            let remaining = compute_remaining_population(unit.initial_population, &events.mortality);
            Ok(NewEvent::Mortality(validate_mortality(raw, unit, remaining)?))
        })
    }

    /// Stores the weighing with its total biomass and growth against the previous one.
    pub fn record_weighing(&self, raw: &RawWeighing<'_>) -> Result<MetricsSnapshot, MetricsError> {
        self.commit_with(raw.unit_id.trim(), |unit, events| {
            let weighing = validate_weighing(raw, unit)?;
            let remaining = compute_remaining_population(unit.initial_population, &events.mortality);
            Ok(NewEvent::Weighing(with_derived_fields(weighing, events, remaining)))
        })
    }

    pub fn record_sale(&self, raw: &RawSale<'_>) -> Result<MetricsSnapshot, MetricsError> {
        self.commit_with(raw.unit_id.trim(), |unit, _| Ok(NewEvent::Sale(validate_sale(raw, unit)?)))
    }

    pub fn record_cost(&self, raw: &RawCost<'_>) -> Result<MetricsSnapshot, MetricsError> {
        self.commit_with(raw.unit_id.trim(), |unit, _| Ok(NewEvent::Cost(validate_cost(raw, unit)?)))
    }
}

/// Previous weighing is the latest one dated on or before the new one.
fn with_derived_fields(weighing: Weighing, events: &UnitEvents, population: u64) -> Weighing {
    let mut pair: Vec<Weighing> = sorted_weighings(&events.weighings)
        .into_iter()
        .filter(|w| w.date <= weighing.date)
        .last()
        .cloned()
        .into_iter()
        .collect();
    pair.push(weighing);
    derive_weighing_fields(&mut pair, i64::try_from(population).unwrap_or(i64::MAX));
    let last = pair.len() - 1;
    pair.swap_remove(last)
}
