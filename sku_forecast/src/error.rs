//! Error types for the sku_forecast crate

use chrono::NaiveDate;
use forecast_math::MathError;
use polars::prelude::PolarsError;
use std::fmt;
use thiserror::Error;

/// Custom error types for the sku_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Input table does not match the wide schema
    #[error("Schema error: {0}")]
    Schema(String),

    /// Two rows share a (warehouse, sku, month) key
    #[error("Duplicate observation for warehouse '{warehouse}', sku '{sku}', month {month}")]
    DuplicateObservation {
        warehouse: String,
        sku: String,
        month: NaiveDate,
    },

    /// Cutoff leaves nothing to evaluate against
    #[error("No test rows on or after cutoff {cutoff}")]
    EmptyTestSet { cutoff: NaiveDate },

    /// Cross-sectional model has nothing to learn from
    #[error("Training set is empty")]
    EmptyTrainingSet,

    /// Feature matrix contains NaN or infinite values
    #[error("Non-numeric feature value: {0}")]
    NonNumericFeature(String),

    /// Metric cannot be computed over the given rows
    #[error("Undefined metric: {0}")]
    UndefinedMetric(UndefinedMetricReason),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error while loading or validating configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from numeric routines
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),

    /// Error from JSON (de)serialisation
    #[error("JSON error: {0}")]
    Json(String),
}

/// Why a metric could not be computed
#[derive(Debug, Clone, PartialEq)]
pub enum UndefinedMetricReason {
    /// No rows were supplied
    Empty,
    /// Actual value is zero, so the percentage error divides by zero
    ZeroActual { row: usize },
    /// Prediction for the row is missing
    MissingPrediction { row: usize },
    /// Actual and predicted slices differ in length
    LengthMismatch { actual: usize, predicted: usize },
}

impl fmt::Display for UndefinedMetricReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no rows to evaluate"),
            Self::ZeroActual { row } => write!(f, "actual value is zero at row {}", row),
            Self::MissingPrediction { row } => write!(f, "prediction missing at row {}", row),
            Self::LengthMismatch { actual, predicted } => write!(
                f,
                "{} actual values but {} predictions",
                actual, predicted
            ),
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::Polars(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Json(err.to_string())
    }
}
