use cagewatch_core::{
    error::MetricsError,
    service::MetricsService,
    snapshot::MetricsSnapshot,
    store::{EventSink, EventSource},
    validation::{RawCost, RawFeeding, RawMortality, RawSale, RawWeighing},
};
use clap::Subcommand;

/// Values are taken as typed and checked by the strict validation tier.
#[derive(Debug, Clone, Subcommand)]
pub enum RecordCommand {
    /// A feeding session, in kilograms of feed
    Feeding {
        #[arg(long)]
        unit: String,
        /// e.g. 2026-05-01T07:30
        #[arg(long)]
        timestamp: String,
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        feed_type: String,
        #[arg(long)]
        appetite: Option<String>,
    },
    /// Dead fish counted on a given day
    Mortality {
        #[arg(long)]
        unit: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        count: String,
        /// normal or alert
        #[arg(long)]
        status: Option<String>,
    },
    /// A sample weighing; the average weight is in kilograms
    Weighing {
        #[arg(long)]
        unit: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        sample_size: String,
        #[arg(long)]
        average_weight: String,
    },
    Sale {
        #[arg(long)]
        unit: String,
        #[arg(long)]
        date: String,
        /// Kilograms sold
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        price_per_kg: String,
        #[arg(long)]
        total_price: Option<String>,
        #[arg(long)]
        buyer: Option<String>,
    },
    Cost {
        #[arg(long)]
        unit: String,
        #[arg(long)]
        date: String,
        /// feed, fingerlings, labor, medication, energy, maintenance or other
        #[arg(long)]
        category: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        description: Option<String>,
    },
}

impl RecordCommand {
    pub fn unit_id(&self) -> &str {
        match self {
            Self::Feeding { unit, .. }
            | Self::Mortality { unit, .. }
            | Self::Weighing { unit, .. }
            | Self::Sale { unit, .. }
            | Self::Cost { unit, .. } => unit,
        }
    }

    /// Validates and appends the entry, returning the unit's fresh snapshot.
    pub fn apply<S>(&self, service: &MetricsService<S>) -> Result<MetricsSnapshot, MetricsError>
    where
        S: EventSource + EventSink,
    {
        match self {
            Self::Feeding { unit, timestamp, quantity, feed_type, appetite } => service.record_feeding(&RawFeeding {
                unit_id: unit,
                timestamp,
                quantity,
                feed_type,
                appetite_rating: appetite.as_deref(),
            }),
            Self::Mortality { unit, date, count, status } => service.record_mortality(&RawMortality {
                unit_id: unit,
                date,
                count_dead: count,
                status: status.as_deref(),
            }),
            Self::Weighing { unit, date, sample_size, average_weight } => service.record_weighing(&RawWeighing {
                unit_id: unit,
                date,
                sample_size,
                average_sample_weight: average_weight,
            }),
            Self::Sale { unit, date, quantity, price_per_kg, total_price, buyer } => service.record_sale(&RawSale {
                unit_id: unit,
                date,
                quantity,
                price_per_unit_mass: price_per_kg,
                total_price: total_price.as_deref(),
                buyer: buyer.as_deref(),
            }),
            Self::Cost { unit, date, category, amount, description } => service.record_cost(&RawCost {
                unit_id: unit,
                date,
                category,
                amount,
                description: description.as_deref(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cagewatch_core::{error::ValidationError, store::InMemoryStore};
    use cagewatch_schemas::{events::UnitEvents, unit::ProductionUnit};
    use chrono::NaiveDate;

    fn service() -> MetricsService<InMemoryStore> {
        let store = InMemoryStore::new();
        let unit = ProductionUnit::new("CAGE-01", "tilapia", NaiveDate::from_ymd_opt(2026, 4, 1).unwrap())
            .with_stock(1000, 0.05);
        store.insert_unit(unit, UnitEvents::default());
        MetricsService::new(store)
    }

    #[test]
    fn mortality_updates_the_population() {
        let service = service();
        let command = RecordCommand::Mortality {
            unit: "CAGE-01".to_string(),
            date: "2026-04-03".to_string(),
            count: "25".to_string(),
            status: Some("alert".to_string()),
        };
        let snapshot = command.apply(&service).unwrap();
        assert_eq!(command.unit_id(), "CAGE-01");
        assert_eq!(snapshot.remaining_population, 975);
        assert_eq!(snapshot.mortality.alerts, 1);
    }

    #[test]
    fn negative_feed_is_rejected_with_the_field_name() {
        let command = RecordCommand::Feeding {
            unit: "CAGE-01".to_string(),
            timestamp: "2026-04-02T08:00".to_string(),
            quantity: "-3".to_string(),
            feed_type: "starter".to_string(),
            appetite: None,
        };
        match command.apply(&service()) {
            Err(MetricsError::Validation(err @ ValidationError::Negative { .. })) => {
                assert_eq!(err.field(), "quantity")
            }
            other => panic!("expected a negative-value rejection, got {:?}", other),
        }
    }

    #[test]
    fn cost_category_is_parsed() {
        let command = RecordCommand::Cost {
            unit: "CAGE-01".to_string(),
            date: "2026-04-02".to_string(),
            category: "Labour".to_string(),
            amount: "120".to_string(),
            description: None,
        };
        assert_eq!(command.apply(&service()).unwrap().total_costs, 120.0);
    }
}
