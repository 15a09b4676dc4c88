use crate::{error::MetricsError, snapshot::MetricsSnapshot};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// One flattened CSV row per snapshot. Metrics that were not computed are written as
/// empty cells next to their status.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub unit_id: String,
    pub feed_conversion_ratio: Option<f64>,
    pub fcr_status: String,
    pub survival_rate: Option<f64>,
    pub survival_status: String,
    pub growth_rate: Option<f64>,
    pub growth_status: String,
    pub cost_per_kg: Option<f64>,
    pub cost_status: String,
    pub remaining_population: u64,
    pub current_average_weight: f64,
    pub biomass: f64,
    pub performance: String,
    pub total_feed_kg: f64,
    pub total_dead: u64,
    pub mortality_alerts: usize,
    pub sold_kg: f64,
    pub revenue: f64,
    pub total_costs: f64,
}

impl SnapshotRecord {
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        Self {
            unit_id: snapshot.unit_id.clone(),
            feed_conversion_ratio: snapshot.feed_conversion_ratio.value(),
            fcr_status: snapshot.feed_conversion_ratio.status.label().to_string(),
            survival_rate: snapshot.survival_rate.value(),
            survival_status: snapshot.survival_rate.status.label().to_string(),
            growth_rate: snapshot.growth_rate.value(),
            growth_status: snapshot.growth_rate.status.label().to_string(),
            cost_per_kg: snapshot.cost_per_kg.value(),
            cost_status: snapshot.cost_per_kg.status.label().to_string(),
            remaining_population: snapshot.remaining_population,
            current_average_weight: snapshot.current_average_weight,
            biomass: snapshot.biomass,
            performance: snapshot
                .performance
                .map_or_else(|| "n/a".to_string(), |tier| tier.to_string()),
            total_feed_kg: snapshot.feeding.total_feed_kg,
            total_dead: snapshot.mortality.total_dead,
            mortality_alerts: snapshot.mortality.alerts,
            sold_kg: snapshot.sales.sold_kg,
            revenue: snapshot.sales.revenue,
            total_costs: snapshot.total_costs,
        }
    }
}

/// Writes snapshots to a CSV file, flushing after every row.
pub struct SnapshotLogger {
    path: String,
    writer: Writer<fs::File>,
}

impl SnapshotLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, io::Error> {
        let path_ref = path.as_ref();
        let writer = Writer::from_path(path_ref)?;
        Ok(Self {
            path: path_ref.display().to_string(),
            writer,
        })
    }

    pub fn log_snapshot(&mut self, snapshot: &MetricsSnapshot) -> Result<(), MetricsError> {
        let record = SnapshotRecord::from_snapshot(snapshot);
        self.writer
            .serialize(record)
            .map_err(|e| MetricsError::CsvError(self.path.clone(), e))?;
        self.writer
            .flush()
            .map_err(|e| MetricsError::FileIO(self.path.clone(), e))?;
        Ok(())
    }

    pub fn log_all<'a, I>(&mut self, snapshots: I) -> Result<usize, MetricsError>
    where
        I: IntoIterator<Item = &'a MetricsSnapshot>,
    {
        let mut written = 0;
        for snapshot in snapshots {
            self.log_snapshot(snapshot)?;
            written += 1;
        }
        Ok(written)
    }
}
