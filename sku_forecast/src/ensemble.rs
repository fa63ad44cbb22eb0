//! Combination of the cross-sectional and per-SKU forecasts

use crate::error::{ForecastError, Result};
use crate::features::{EnrichedObservation, FeatureTable};
use polars::prelude::*;
use std::fmt;
use tracing::warn;

/// Test row with both component predictions and the blended result
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub observation: EnrichedObservation,
    /// Cross-sectional prediction
    pub rf_prediction: f64,
    /// Per-SKU prediction, `None` when the SKU had no forecast
    pub sarima_prediction: Option<f64>,
    /// Mean of both components, `None` when either is missing
    pub final_prediction: Option<f64>,
}

/// Row-level condition raised while blending
#[derive(Debug, Clone, PartialEq)]
pub enum RowWarning {
    MissingSeriesForecast { row: usize, sku: String },
    NonFiniteComponent { row: usize, sku: String },
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeriesForecast { row, sku } => {
                write!(f, "row {} (sku '{}'): no per-sku forecast", row, sku)
            }
            Self::NonFiniteComponent { row, sku } => {
                write!(f, "row {} (sku '{}'): component prediction is not finite", row, sku)
            }
        }
    }
}

/// Blended forecasts for the test rows, in test-row order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastTable {
    rows: Vec<ForecastRow>,
    warnings: Vec<RowWarning>,
}

impl ForecastTable {
    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn warnings(&self) -> &[RowWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn actuals(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.observation.sales).collect()
    }

    pub fn final_predictions(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.final_prediction).collect()
    }

    pub fn rf_predictions(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| Some(r.rf_prediction)).collect()
    }

    pub fn sarima_predictions(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.sarima_prediction).collect()
    }

    /// Output columns: identifiers, month, features, actual sales and the three predictions
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let lags = self
            .rows
            .first()
            .map(|r| r.observation.lags.len())
            .unwrap_or(0);

        let mut columns = vec![
            Series::new("warehouse", text_column(&self.rows, |r| r.observation.warehouse.clone())),
            Series::new("region", text_column(&self.rows, |r| r.observation.region.clone())),
            Series::new("sku", text_column(&self.rows, |r| r.observation.sku.clone())),
            Series::new("month", text_column(&self.rows, |r| {
                r.observation.month.format("%Y-%m-%d").to_string()
            })),
            Series::new(
                "month_num",
                self.rows.iter().map(|r| r.observation.month_num).collect::<Vec<u32>>(),
            ),
            Series::new(
                "year",
                self.rows.iter().map(|r| r.observation.year).collect::<Vec<i32>>(),
            ),
        ];
        for lag in 0..lags {
            let values: Vec<Option<f64>> = self
                .rows
                .iter()
                .map(|r| r.observation.lags.get(lag).copied().flatten())
                .collect();
            columns.push(Series::new(&format!("lag{}", lag + 1), values));
        }
        columns.push(Series::new(
            "sales",
            self.rows.iter().map(|r| r.observation.sales).collect::<Vec<f64>>(),
        ));
        columns.push(Series::new(
            "rf_prediction",
            self.rows.iter().map(|r| r.rf_prediction).collect::<Vec<f64>>(),
        ));
        columns.push(Series::new("sarima_prediction", self.sarima_predictions()));
        columns.push(Series::new("final_prediction", self.final_predictions()));

        Ok(DataFrame::new(columns)?)
    }
}

fn text_column<F>(rows: &[ForecastRow], f: F) -> Vec<String>
where
    F: Fn(&ForecastRow) -> String,
{
    rows.iter().map(f).collect()
}

/// Mean of two component predictions; `None` if either is missing
pub fn blend(rf: Option<f64>, sarima: Option<f64>) -> Option<f64> {
    match (rf, sarima) {
        (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((a + b) / 2.0),
        _ => None,
    }
}

/// Averages the two models row by row
#[derive(Debug, Clone, Copy, Default)]
pub struct Ensembler;

impl Ensembler {
    /// Attach both predictions and their mean to every test row.
    ///
    /// `rf` and `sarima` must be aligned with `test`. A missing or non-finite
    /// component yields a `None` final prediction and a [`RowWarning`].
    pub fn combine(
        &self,
        test: &FeatureTable,
        rf: &[f64],
        sarima: &[Option<f64>],
    ) -> Result<ForecastTable> {
        if rf.len() != test.len() || sarima.len() != test.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "{} test rows but {} cross-sectional and {} per-sku predictions",
                test.len(),
                rf.len(),
                sarima.len()
            )));
        }

        let mut table = ForecastTable::default();
        for (row, ((obs, &rf_value), &sarima_value)) in test
            .rows()
            .iter()
            .zip(rf.iter())
            .zip(sarima.iter())
            .enumerate()
        {
            let final_prediction = blend(Some(rf_value), sarima_value);
            if final_prediction.is_none() {
                let warning = match sarima_value {
                    None => RowWarning::MissingSeriesForecast {
                        row,
                        sku: obs.sku.clone(),
                    },
                    Some(_) => RowWarning::NonFiniteComponent {
                        row,
                        sku: obs.sku.clone(),
                    },
                };
                warn!("{}", warning);
                table.warnings.push(warning);
            }
            table.rows.push(ForecastRow {
                observation: obs.clone(),
                rf_prediction: rf_value,
                sarima_prediction: sarima_value,
                final_prediction,
            });
        }
        Ok(table)
    }
}
