//! Metrics for evaluating forecast performance

use crate::ensemble::ForecastTable;
use crate::error::{ForecastError, Result, UndefinedMetricReason};
use statrs::statistics::Statistics;
use std::fmt;
use tracing::info;

/// Error metrics for the blended forecast and each component
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// Rows evaluated
    pub rows: usize,
    /// Mean absolute percentage error of the final prediction, as a fraction
    pub mape: f64,
    /// Mean absolute error of the final prediction
    pub mae: f64,
    /// Root mean squared error of the final prediction
    pub rmse: f64,
    /// MAPE of the cross-sectional component
    pub rf_mape: f64,
    /// MAPE of the per-SKU component
    pub sarima_mape: f64,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Evaluation over {} rows:", self.rows)?;
        writeln!(f, "  MAPE:        {:.2}%", self.mape * 100.0)?;
        writeln!(f, "  MAE:         {:.4}", self.mae)?;
        writeln!(f, "  RMSE:        {:.4}", self.rmse)?;
        writeln!(f, "  RF MAPE:     {:.2}%", self.rf_mape * 100.0)?;
        write!(f, "  SARIMA MAPE: {:.2}%", self.sarima_mape * 100.0)
    }
}

/// Scores a [`ForecastTable`] against its actual sales
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn evaluate(&self, table: &ForecastTable) -> Result<EvaluationReport> {
        let actual = table.actuals();
        let predicted = table.final_predictions();

        let report = EvaluationReport {
            rows: table.len(),
            mape: mean_absolute_percentage_error(&actual, &predicted)?,
            mae: mean_absolute_error(&actual, &predicted)?,
            rmse: root_mean_squared_error(&actual, &predicted)?,
            rf_mape: mean_absolute_percentage_error(&actual, &table.rf_predictions())?,
            sarima_mape: mean_absolute_percentage_error(&actual, &table.sarima_predictions())?,
        };

        info!(
            rows = report.rows,
            mape = report.mape,
            rf_mape = report.rf_mape,
            sarima_mape = report.sarima_mape,
            "evaluated forecasts"
        );
        Ok(report)
    }
}

/// Mean of `|actual - predicted| / |actual|`, as a fraction.
///
/// A zero actual value or a missing prediction makes the metric undefined;
/// neither is skipped nor smoothed.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[Option<f64>]) -> Result<f64> {
    let pairs = paired(actual, predicted)?;
    if let Some(row) = actual.iter().position(|a| *a == 0.0) {
        return Err(ForecastError::UndefinedMetric(
            UndefinedMetricReason::ZeroActual { row },
        ));
    }
    Ok(pairs.iter().map(|(a, p)| ((a - p) / a).abs()).mean())
}

/// Mean of `|actual - predicted|`
pub fn mean_absolute_error(actual: &[f64], predicted: &[Option<f64>]) -> Result<f64> {
    let pairs = paired(actual, predicted)?;
    Ok(pairs.iter().map(|(a, p)| (a - p).abs()).mean())
}

/// Square root of the mean squared error
pub fn root_mean_squared_error(actual: &[f64], predicted: &[Option<f64>]) -> Result<f64> {
    let pairs = paired(actual, predicted)?;
    Ok(pairs.iter().map(|(a, p)| (a - p).powi(2)).mean().sqrt())
}

fn paired(actual: &[f64], predicted: &[Option<f64>]) -> Result<Vec<(f64, f64)>> {
    if actual.len() != predicted.len() {
        return Err(ForecastError::UndefinedMetric(
            UndefinedMetricReason::LengthMismatch {
                actual: actual.len(),
                predicted: predicted.len(),
            },
        ));
    }
    if actual.is_empty() {
        return Err(ForecastError::UndefinedMetric(UndefinedMetricReason::Empty));
    }
    actual
        .iter()
        .zip(predicted.iter())
        .enumerate()
        .map(|(row, (&a, p))| match p {
            Some(p) => Ok((a, *p)),
            None => Err(ForecastError::UndefinedMetric(
                UndefinedMetricReason::MissingPrediction { row },
            )),
        })
        .collect()
}
