use crate::{
    events::{CostEntry, FeedingEvent, MortalityObservation, Sale, UnitEvents, Weighing},
    unit::ProductionUnit,
};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Deserialize, Serialize)]
pub struct UnitFile {
    pub schema_version: String,
    pub units: Vec<ProductionUnit>,
}

/// On-disk event log for a single production unit.
#[derive(Debug, Deserialize, Serialize)]
pub struct EventLogFile {
    pub schema_version: String,
    pub unit_id: String,
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

impl EventLogFile {
    pub fn empty(unit_id: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            unit_id: unit_id.into(),
            feeding: Vec::new(),
            mortality: Vec::new(),
            weighings: Vec::new(),
            sales: Vec::new(),
            costs: Vec::new(),
        }
    }

    pub fn into_events(self) -> UnitEvents {
        UnitEvents {
            feeding: self.feeding,
            mortality: self.mortality,
            weighings: self.weighings,
            sales: self.sales,
            costs: self.costs,
        }
    }

    pub fn from_events(unit_id: impl Into<String>, events: UnitEvents) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            unit_id: unit_id.into(),
            feeding: events.feeding,
            mortality: events.mortality,
            weighings: events.weighings,
            sales: events.sales,
            costs: events.costs,
        }
    }
}
