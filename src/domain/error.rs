use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures surfaced by the forecasting core
///
/// Every variant aborts the enclosing call; the core never returns a partial
/// series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("Invalid location: latitude {latitude}, longitude {longitude} out of range")]
    InvalidLocation { latitude: f64, longitude: f64 },

    #[error("Incomplete observation at {timestamp}: missing or malformed {field}")]
    IncompleteObservation {
        timestamp: DateTime<Utc>,
        field: &'static str,
    },

    #[error("Feature shape mismatch at {timestamp}: expected {expected} features, got {actual}")]
    FeatureShapeMismatch {
        timestamp: DateTime<Utc>,
        expected: usize,
        actual: usize,
    },

    #[error("Series length mismatch: {observations} observations, {positions} solar positions")]
    SeriesLengthMismatch { observations: usize, positions: usize },

    #[error("Model parameters not loaded")]
    ModelNotLoaded,

    #[error("Empty weather series")]
    EmptySeries,

    #[error("Invalid plant capacity: {0} MW")]
    InvalidCapacity(f64),

    #[error("Model persistence error: {0}")]
    Persistence(String),

    #[error("Training error: {0}")]
    Training(String),
}
