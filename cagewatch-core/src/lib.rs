//! Derived production metrics for aquaculture units.
//!
//! Raw operational records go in (feeding, mortality, weighings, sales and costs);
//! a [`snapshot::MetricsSnapshot`] per unit comes out. Computation is pure and
//! deterministic. Storage sits behind the [`store::EventSource`] and
//! [`store::EventSink`] traits.

pub mod batch;
pub mod cache;
pub mod error;
pub mod file_store;
pub mod logger;
pub mod metrics;
pub mod performance;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod summary;
pub mod validation;
