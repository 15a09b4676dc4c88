//! Serde data model for CageWatch: production units, their append-only event logs,
//! and the YAML file wrappers they are stored in.

pub mod events;
pub mod file_formats;
pub mod numeric;
pub mod unit;
