use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Production unit '{0}' not found")]
    UnitNotFound(String),

    #[error("Rejected entry: {0}")]
    Validation(#[from] ValidationError),

    #[error("Event log for unit '{0}' is unavailable: {1}")]
    LogUnavailable(String, String),

    #[error("Event source failed: {0}")]
    Source(String),

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),

    #[error("Failed to parse YAML from '{0}': {1}")]
    YamlParsing(String, #[source] serde_yaml::Error),

    #[error("Failed to write YAML to '{0}': {1}")]
    YamlWriting(String, #[source] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Failed to write CSV file '{0}': {1}")]
    CsvError(String, #[source] csv::Error),
}

/// Data-entry rejections. Every variant names the field that failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("field '{field}' is required")]
    Empty { field: &'static str },

    #[error("field '{field}' is not a number: '{raw}'")]
    NotANumber { field: &'static str, raw: String },

    #[error("field '{field}' must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },

    #[error("field '{field}' is out of range (got {value}, allowed {min}..={max})")]
    OutOfRange { field: &'static str, value: f64, min: f64, max: f64 },

    #[error("field '{field}' ({requested}) exceeds the remaining population ({remaining})")]
    ExceedsRemainingPopulation { field: &'static str, requested: u64, remaining: u64 },

    #[error("field '{field}' is not a valid date: '{raw}'")]
    InvalidDate { field: &'static str, raw: String },

    #[error("field '{field}' has an unknown value: '{raw}'")]
    UnknownVariant { field: &'static str, raw: String },

    #[error("entry belongs to unit '{found}', expected '{expected}'")]
    UnitMismatch { expected: String, found: String },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            Self::Empty { field }
            | Self::NotANumber { field, .. }
            | Self::Negative { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::ExceedsRemainingPopulation { field, .. }
            | Self::InvalidDate { field, .. }
            | Self::UnknownVariant { field, .. } => field,
            Self::UnitMismatch { .. } => "unit_id",
        }
    }
}
