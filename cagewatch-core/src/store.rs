//! The storage collaborator the aggregator reads from, and an in-memory implementation.

use crate::error::{MetricsError, ValidationError};
use cagewatch_schemas::{
    events::{CostEntry, FeedingEvent, MortalityObservation, Sale, UnitEvents, Weighing},
    unit::ProductionUnit,
};
use dashmap::DashMap;
use std::sync::Arc;

/// Supplies production units and their event logs.
///
/// Implementations must be shareable across threads; the batch sweep reads from one
/// source on many workers at once.
pub trait EventSource: Send + Sync {
    fn unit_ids(&self) -> Vec<String>;

    fn fetch_unit(&self, unit_id: &str) -> Result<ProductionUnit, MetricsError>;

    /// Each category ascending by time.
    fn fetch_events_for_unit(&self, unit_id: &str) -> Result<UnitEvents, MetricsError>;
}

/// A single validated record on its way into a unit's log.
#[derive(Debug, Clone, PartialEq)]
pub enum NewEvent {
    Feeding(FeedingEvent),
    Mortality(MortalityObservation),
    Weighing(Weighing),
    Sale(Sale),
    Cost(CostEntry),
}

impl NewEvent {
    pub fn unit_id(&self) -> &str {
        match self {
            Self::Feeding(e) => &e.unit_id,
            Self::Mortality(e) => &e.unit_id,
            Self::Weighing(e) => &e.unit_id,
            Self::Sale(e) => &e.unit_id,
            Self::Cost(e) => &e.unit_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Feeding(_) => "feeding",
            Self::Mortality(_) => "mortality",
            Self::Weighing(_) => "weighing",
            Self::Sale(_) => "sale",
            Self::Cost(_) => "cost",
        }
    }

    /// Pushes the record onto the matching collection.
    pub fn apply_to(self, events: &mut UnitEvents) {
        match self {
            Self::Feeding(e) => events.feeding.push(e),
            Self::Mortality(e) => events.mortality.push(e),
            Self::Weighing(e) => events.weighings.push(e),
            Self::Sale(e) => events.sales.push(e),
            Self::Cost(e) => events.costs.push(e),
        }
    }
}

/// Storage that accepts appended records.
pub trait EventSink: Send + Sync {
    /// Builds a record against the unit's current log and appends it.
    ///
    /// No other append to the same unit can interleave between `build` reading the log
    /// and the record landing, so checks made inside `build` still hold once stored.
    /// `build` must not call back into the same store. Returns the stored record.
    fn append_with<F>(&self, unit_id: &str, build: F) -> Result<NewEvent, MetricsError>
    where
        F: FnOnce(&ProductionUnit, &UnitEvents) -> Result<NewEvent, MetricsError>;

    fn append(&self, event: NewEvent) -> Result<(), MetricsError> {
        let unit_id = event.unit_id().to_string();
        self.append_with(&unit_id, |_, _| Ok(event)).map(|_| ())
    }
}

/// Rejects a built record that names a different unit than the one locked.
pub(crate) fn ensure_same_unit(unit_id: &str, event: &NewEvent) -> Result<(), MetricsError> {
    if event.unit_id() == unit_id {
        Ok(())
    } else {
        Err(ValidationError::UnitMismatch {
            expected: unit_id.to_string(),
            found: event.unit_id().to_string(),
        }
        .into())
    }
}

#[derive(Debug, Clone)]
struct UnitRecord {
    unit: ProductionUnit,
    events: UnitEvents,
}

/// Thread-safe unit and event storage backed by `DashMap`.
///
/// Appends are per unit; readers always get an owned copy of the log.
pub struct InMemoryStore {
    records: Arc<DashMap<String, UnitRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
        }
    }

    /// Registers a unit, replacing any unit and log stored under the same id.
    pub fn insert_unit(&self, unit: ProductionUnit, events: UnitEvents) {
        self.records.insert(unit.id.clone(), UnitRecord { unit, events });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryStore {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl EventSource for InMemoryStore {
    fn unit_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    fn fetch_unit(&self, unit_id: &str) -> Result<ProductionUnit, MetricsError> {
        self.records
            .get(unit_id)
            .map(|r| r.unit.clone())
            .ok_or_else(|| MetricsError::UnitNotFound(unit_id.to_string()))
    }

    fn fetch_events_for_unit(&self, unit_id: &str) -> Result<UnitEvents, MetricsError> {
        self.records
            .get(unit_id)
            .map(|r| r.events.clone())
            .ok_or_else(|| MetricsError::UnitNotFound(unit_id.to_string()))
    }
}

impl EventSink for InMemoryStore {
    fn append_with<F>(&self, unit_id: &str, build: F) -> Result<NewEvent, MetricsError>
    where
        F: FnOnce(&ProductionUnit, &UnitEvents) -> Result<NewEvent, MetricsError>,
    {
        // The entry guard is the per-unit lock.
        let mut record = self
            .records
            .get_mut(unit_id)
            .ok_or_else(|| MetricsError::UnitNotFound(unit_id.to_string()))?;
        let event = build(&record.unit, &record.events)?;
        ensure_same_unit(unit_id, &event)?;
        event.clone().apply_to(&mut record.events);
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cagewatch_schemas::events::HealthStatus;
    use chrono::NaiveDate;

    fn unit(id: &str) -> ProductionUnit {
        ProductionUnit::new(id, "tilapia", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()).with_stock(100, 0.1)
    }

    #[test]
    fn test_insert_and_fetch() {
        let store = InMemoryStore::new();
        store.insert_unit(unit("CAGE-B"), UnitEvents::default());
        store.insert_unit(unit("CAGE-A"), UnitEvents::default());

        assert_eq!(store.unit_ids(), vec!["CAGE-A", "CAGE-B"]);
        assert_eq!(store.fetch_unit("CAGE-A").unwrap().id, "CAGE-A");
        assert!(store.fetch_events_for_unit("CAGE-A").unwrap().is_empty());
    }

    #[test]
    fn test_append_to_unknown_unit_fails() {
        let store = InMemoryStore::new();
        let result = store.append(NewEvent::Mortality(MortalityObservation {
            unit_id: "GHOST".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            count_dead: 1,
            status: HealthStatus::Normal,
        }));
        assert!(matches!(result, Err(MetricsError::UnitNotFound(id)) if id == "GHOST"));
    }

    #[test]
    fn test_clones_share_storage() {
        let store = InMemoryStore::new();
        let handle = store.clone();
        store.insert_unit(unit("CAGE-A"), UnitEvents::default());
        handle
            .append(NewEvent::Cost(CostEntry {
                unit_id: "CAGE-A".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
                category: Default::default(),
                amount: 10.0,
                description: None,
            }))
            .unwrap();
        assert_eq!(store.fetch_events_for_unit("CAGE-A").unwrap().costs.len(), 1);
        assert_eq!(handle.len(), 1);
    }

    #[test]
    fn test_failed_build_leaves_log_untouched() {
        let store = InMemoryStore::new();
        store.insert_unit(unit("CAGE-A"), UnitEvents::default());
        let result = store.append_with("CAGE-A", |_, _| Err(MetricsError::Source("rejected".to_string())));
        assert!(result.is_err());
        assert!(store.fetch_events_for_unit("CAGE-A").unwrap().is_empty());
    }

    #[test]
    fn test_built_record_must_match_locked_unit() {
        let store = InMemoryStore::new();
        store.insert_unit(unit("CAGE-A"), UnitEvents::default());
        store.insert_unit(unit("CAGE-B"), UnitEvents::default());
        let result = store.append_with("CAGE-A", |_, _| {
            Ok(NewEvent::Mortality(MortalityObservation {
                unit_id: "CAGE-B".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
                count_dead: 1,
                status: HealthStatus::Normal,
            }))
        });
        assert!(matches!(
            result,
            Err(MetricsError::Validation(ValidationError::UnitMismatch { .. }))
        ));
        assert!(store.fetch_events_for_unit("CAGE-B").unwrap().is_empty());
    }
}
