use anyhow::{Context, Result};
use cagewatch_core::{
    batch::{compute_all, compute_batch, BatchReport},
    logger::SnapshotLogger,
    performance::PerformanceThresholds,
    snapshot::MetricsSnapshot,
    store::EventSource,
};
use clap::ValueEnum;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Computes snapshots for the requested units (all units when empty).
pub fn build_report<S: EventSource>(source: &S, unit_ids: &[String], thresholds: &PerformanceThresholds) -> BatchReport {
    if unit_ids.is_empty() {
        compute_all(source, thresholds)
    } else {
        compute_batch(source, unit_ids, thresholds)
    }
}

/// One row per unit. Metrics that could not be computed show as `N/A` and the row
/// is marked with `*`.
pub fn render_table(snapshots: &[MetricsSnapshot]) -> String {
    let mut table = format!(
        "{:<12} {:>10} {:>8} {:>11} {:>6} {:>10} {:>9} {:>8} {:<10}\n",
        "Unit", "Population", "Avg kg", "Biomass kg", "FCR", "Survival %", "Growth %", "Cost/kg", "Tier"
    );
    table.push_str(&format!("{}\n", "-".repeat(92)));

    for snapshot in snapshots {
        let tier = snapshot
            .performance
            .map_or_else(|| "N/A".to_string(), |tier| tier.to_string());
        let flag = if snapshot.is_low_confidence() { " *" } else { "" };
        table.push_str(&format!(
            "{:<12} {:>10} {:>8.3} {:>11.1} {:>6} {:>10} {:>9} {:>8} {:<10}{}\n",
            snapshot.unit_id,
            snapshot.remaining_population,
            snapshot.current_average_weight,
            snapshot.biomass,
            snapshot.feed_conversion_ratio.display(2),
            snapshot.survival_rate.display(1),
            snapshot.growth_rate.display(1),
            snapshot.cost_per_kg.display(2),
            tier,
            flag,
        ));
    }
    table
}

pub fn render_json(snapshots: &[MetricsSnapshot]) -> Result<String> {
    serde_json::to_string_pretty(snapshots).context("Failed to serialise snapshots")
}

/// Writes the snapshot log for this run and returns its path.
pub fn write_csv(output_dir: &Path, snapshots: &[MetricsSnapshot]) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;
    let path = output_dir.join(format!("snapshots_{}.csv", chrono::Local::now().format("%Y%m%d_%H%M%S")));

    let mut logger =
        SnapshotLogger::new(&path).with_context(|| format!("Failed to create snapshot log: {:?}", path))?;
    let written = logger.log_all(snapshots)?;
    log::info!("Wrote {} snapshot(s) to {:?}", written, path);
    Ok(path)
}

/// Prints the report and, when an output directory is given, writes the CSV log.
///
/// Fails after printing if any unit could not be computed.
pub fn run_report<S: EventSource>(
    source: &S,
    unit_ids: &[String],
    thresholds: &PerformanceThresholds,
    format: OutputFormat,
    output_dir: Option<&Path>,
) -> Result<BatchReport> {
    let report = build_report(source, unit_ids, thresholds);

    match format {
        OutputFormat::Table => {
            print!("{}", render_table(&report.snapshots));
            if report.snapshots.iter().any(MetricsSnapshot::is_low_confidence) {
                println!("\n* one or more metrics could not be computed from the recorded data");
            }
        }
        OutputFormat::Json => println!("{}", render_json(&report.snapshots)?),
    }

    if let Some(dir) = output_dir {
        if !report.snapshots.is_empty() {
            write_csv(dir, &report.snapshots)?;
        }
    }

    for (unit_id, err) in &report.failures {
        eprintln!("{}: {}", unit_id, err);
    }
    if !report.is_complete() {
        anyhow::bail!("{} unit(s) could not be computed", report.failures.len());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cagewatch_core::{snapshot::compute_snapshot, store::InMemoryStore};
    use cagewatch_schemas::{
        events::{UnitEvents, Weighing},
        unit::ProductionUnit,
    };
    use chrono::NaiveDate;

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        store.insert_unit(ProductionUnit::new("CAGE-01", "tilapia", date).with_stock(1000, 0.05), UnitEvents::default());
        let mut events = UnitEvents::default();
        for (day, weight) in [(1, 0.1), (8, 0.12)] {
            events.weighings.push(Weighing {
                unit_id: "CAGE-02".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 5, day).unwrap(),
                sample_size: 30,
                average_sample_weight: weight,
                total_biomass: None,
                growth_rate: None,
            });
        }
        store.insert_unit(ProductionUnit::new("CAGE-02", "tilapia", date).with_stock(500, 0.05), events);
        store
    }

    #[test]
    fn table_marks_missing_metrics() {
        let report = build_report(&store(), &[], &PerformanceThresholds::default());
        let table = render_table(&report.snapshots);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("CAGE-01"));
        assert!(lines[2].contains("N/A"));
        assert!(lines[2].ends_with('*'));
        assert!(lines[3].contains("20.0"));
    }

    #[test]
    fn unknown_units_are_reported_as_failures() {
        let ids = vec!["CAGE-02".to_string(), "CAGE-99".to_string()];
        let report = build_report(&store(), &ids, &PerformanceThresholds::default());
        assert_eq!(report.snapshots.len(), 1);
        assert_eq!(report.failures[0].0, "CAGE-99");
        assert!(run_report(&store(), &ids, &PerformanceThresholds::default(), OutputFormat::Json, None).is_err());
    }

    #[test]
    fn json_output_is_an_array_of_snapshots() {
        let unit = ProductionUnit::new("CAGE-03", "carp", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let snapshot = compute_snapshot(&unit, &UnitEvents::default());
        let value: serde_json::Value = serde_json::from_str(&render_json(&[snapshot]).unwrap()).unwrap();
        assert_eq!(value[0]["unit_id"], "CAGE-03");
        assert_eq!(value[0]["survival_rate"]["status"], "undefined");
        assert!(value[0]["costs_by_category"].as_object().unwrap().is_empty());
    }

    #[test]
    fn csv_log_has_one_row_per_unit() {
        let dir = tempfile::tempdir().unwrap();
        let report = build_report(&store(), &[], &PerformanceThresholds::default());
        let path = write_csv(&dir.path().join("reports"), &report.snapshots).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.records().count(), 2);
    }
}
