//! Cross-sectional forecaster pooled across every (warehouse, sku) series

use crate::error::{ForecastError, Result};
use crate::features::FeatureTable;
use crate::models::random_forest::RandomForest;
use crate::models::{RegressionModel, TrainedRegressionModel};
use tracing::info;

/// Fits one regressor on `[month_num, year, lag1..lagk]` over all training rows
#[derive(Debug, Clone, Default)]
pub struct CrossSectionalForecaster<M: RegressionModel = RandomForest> {
    model: M,
}

/// Regressor fitted by [`CrossSectionalForecaster::fit`]
#[derive(Debug)]
pub struct FittedCrossSectional<T: TrainedRegressionModel> {
    trained: T,
    lags: usize,
}

impl<M: RegressionModel> CrossSectionalForecaster<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Fit on the training table
    pub fn fit(&self, train: &FeatureTable) -> Result<FittedCrossSectional<M::Trained>> {
        if train.is_empty() {
            return Err(ForecastError::EmptyTrainingSet);
        }
        let features = train.feature_matrix()?;
        let targets = train.targets();
        let trained = self.model.train(&features, &targets)?;

        info!(
            model = self.model.name(),
            rows = train.len(),
            features = features.n_features(),
            "fitted cross-sectional model"
        );

        Ok(FittedCrossSectional {
            trained,
            lags: train.lags(),
        })
    }
}

impl<T: TrainedRegressionModel> FittedCrossSectional<T> {
    /// Predict one value per row of `table`, in row order
    pub fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>> {
        if table.lags() != self.lags {
            return Err(ForecastError::InvalidParameter(format!(
                "model was fitted with {} lags, table has {}",
                self.lags,
                table.lags()
            )));
        }
        let features = table.feature_matrix()?;
        Ok(self.trained.predict(&features))
    }

    pub fn trained(&self) -> &T {
        &self.trained
    }
}
