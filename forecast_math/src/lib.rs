//! # Forecast Math
//!
//! Numeric building blocks shared by the forecasting models.
//! This crate provides regular and seasonal differencing for integrated
//! models and a bounded Nelder-Mead simplex optimiser used for
//! conditional-sum-of-squares estimation.

use std::time::Duration;
use thiserror::Error;

pub mod differencing;
pub mod optimization;

/// Errors that can occur in forecasting math
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Optimisation did not converge after {iterations} iterations")]
    DidNotConverge { iterations: usize },

    #[error("Optimisation exceeded its time budget of {0:?}")]
    DeadlineExceeded(Duration),
}

/// Result type for forecasting math operations
pub type Result<T> = std::result::Result<T, MathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_failure() {
        let err = MathError::DidNotConverge { iterations: 10 };
        assert_eq!(
            err.to_string(),
            "Optimisation did not converge after 10 iterations"
        );

        let err = MathError::InsufficientData("need 14 points".to_string());
        assert!(err.to_string().contains("need 14 points"));
    }
}
