//! Forecasting models used by the ensemble
//!
//! Two families live here:
//!
//! - [`RegressionModel`]: tabular regressors trained on a feature matrix
//!   pooled across all series (the random forest).
//! - [`SeriesModel`]: univariate models trained on one monthly series at a
//!   time (seasonal ARIMA).

use crate::error::Result;
use std::fmt::Debug;

/// Row-major feature matrix with a fixed column count
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Vec<f64>,
    n_features: usize,
}

impl FeatureMatrix {
    /// Build a matrix from rows; every row must have `n_features` entries
    pub fn from_rows(rows: Vec<Vec<f64>>, n_features: usize) -> Result<Self> {
        let mut values = Vec::with_capacity(rows.len() * n_features);
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != n_features {
                return Err(crate::error::ForecastError::InvalidParameter(format!(
                    "Row {} has {} features, expected {}",
                    idx,
                    row.len(),
                    n_features
                )));
            }
            values.extend(row);
        }
        Ok(Self { values, n_features })
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        if self.n_features == 0 {
            0
        } else {
            self.values.len() / self.n_features
        }
    }

    /// Number of feature columns
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Borrow row `idx`
    pub fn row(&self, idx: usize) -> &[f64] {
        let start = idx * self.n_features;
        &self.values[start..start + self.n_features]
    }

    /// Value at (`row`, `feature`)
    pub fn get(&self, row: usize, feature: usize) -> f64 {
        self.values[row * self.n_features + feature]
    }

    /// Iterate over rows
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.n_features.max(1))
    }

    /// First non-finite value as (row, feature), if any
    pub fn first_non_finite(&self) -> Option<(usize, usize)> {
        self.values
            .iter()
            .position(|v| !v.is_finite())
            .map(|pos| (pos / self.n_features, pos % self.n_features))
    }
}

/// Trained tabular regressor
pub trait TrainedRegressionModel: Debug + Send + Sync {
    /// Predict a single feature row
    fn predict_row(&self, row: &[f64]) -> f64;

    /// Predict every row of a matrix
    fn predict(&self, features: &FeatureMatrix) -> Vec<f64> {
        features.rows().map(|row| self.predict_row(row)).collect()
    }

    /// Name of the model
    fn name(&self) -> &str;
}

/// Tabular regressor that can be trained on a feature matrix
pub trait RegressionModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedRegressionModel;

    /// Train the model on features and targets
    fn train(&self, features: &FeatureMatrix, targets: &[f64]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Trained univariate model
pub trait TrainedSeriesModel: Debug {
    /// One-step-ahead forecast past the end of the training series
    fn forecast_next(&self) -> Result<f64>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Univariate model trained on a regular monthly grid; `None` marks a gap
pub trait SeriesModel: Debug + Clone + Send + Sync {
    /// The type of trained model produced
    type Trained: TrainedSeriesModel;

    /// Train the model on a gridded series
    fn train(&self, series: &[Option<f64>]) -> Result<Self::Trained>;

    /// Shortest grid `train` accepts
    fn min_length(&self) -> usize {
        1
    }

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod random_forest;
pub mod sarima;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_matrix_indexing() {
        let m = FeatureMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 2).unwrap();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.get(0, 1), 2.0);
        assert_eq!(m.rows().count(), 2);
        assert_eq!(m.first_non_finite(), None);
    }

    #[test]
    fn feature_matrix_rejects_ragged_rows() {
        assert!(FeatureMatrix::from_rows(vec![vec![1.0], vec![1.0, 2.0]], 1).is_err());
    }

    #[test]
    fn feature_matrix_finds_nan() {
        let m = FeatureMatrix::from_rows(vec![vec![1.0, 2.0], vec![f64::NAN, 4.0]], 2).unwrap();
        assert_eq!(m.first_non_finite(), Some((1, 0)));
    }
}
