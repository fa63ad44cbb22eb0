//! Per-SKU seasonal forecaster
//!
//! Each SKU's training history is pooled across warehouses, laid on a regular
//! monthly grid and fitted independently. The one-step-ahead forecast for a
//! SKU is repeated on every test row of that SKU, whatever its warehouse or
//! month. Failures stay local to the SKU: the forecast falls back to zero and
//! a [`SeriesWarning`] is recorded. A SKU is only fitted when it has enough
//! observed months and its grid is at least [`SeriesModel::min_length`] long.

use crate::error::{ForecastError, Result};
use crate::features::FeatureTable;
use crate::models::sarima::SeasonalArima;
use crate::models::{SeriesModel, TrainedSeriesModel};
use crate::utils::months_between;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// Observed months below which a SKU is not fitted
pub const DEFAULT_MIN_HISTORY_MONTHS: usize = 12;

/// Settings for the per-SKU loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerSeriesConfig {
    /// SKUs with fewer distinct observed training months forecast zero
    pub min_history_months: usize,
    /// Worker threads; `None` uses one per CPU
    pub workers: Option<usize>,
}

impl Default for PerSeriesConfig {
    fn default() -> Self {
        Self {
            min_history_months: DEFAULT_MIN_HISTORY_MONTHS,
            workers: None,
        }
    }
}

/// How a SKU's forecast was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastSource {
    Model,
    InsufficientHistory,
    FitFailure,
}

/// Forecast for one SKU
#[derive(Debug, Clone, PartialEq)]
pub struct SkuForecast {
    pub sku: String,
    pub value: f64,
    /// Distinct months with a training observation
    pub observed_months: usize,
    pub source: ForecastSource,
}

/// Per-SKU condition that forced a zero forecast
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesWarning {
    InsufficientHistory {
        sku: String,
        observed_months: usize,
        required: usize,
    },
    FitFailed {
        sku: String,
        reason: String,
    },
}

impl fmt::Display for SeriesWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientHistory {
                sku,
                observed_months,
                required,
            } => write!(
                f,
                "sku '{}': {} observed months, {} required; forecasting 0",
                sku, observed_months, required
            ),
            Self::FitFailed { sku, reason } => {
                write!(f, "sku '{}': model fit failed ({}); forecasting 0", sku, reason)
            }
        }
    }
}

/// All per-SKU forecasts from one run, keyed by SKU
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerSeriesForecasts {
    forecasts: BTreeMap<String, SkuForecast>,
    warnings: Vec<SeriesWarning>,
}

impl PerSeriesForecasts {
    /// Forecast value for `sku`
    pub fn get(&self, sku: &str) -> Option<f64> {
        self.forecasts.get(sku).map(|f| f.value)
    }

    pub fn forecast(&self, sku: &str) -> Option<&SkuForecast> {
        self.forecasts.get(sku)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkuForecast> {
        self.forecasts.values()
    }

    pub fn len(&self) -> usize {
        self.forecasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forecasts.is_empty()
    }

    /// Warnings in SKU order
    pub fn warnings(&self) -> &[SeriesWarning] {
        &self.warnings
    }

    /// One value per row of `table`: the forecast of that row's SKU
    pub fn broadcast(&self, table: &FeatureTable) -> Vec<Option<f64>> {
        table.rows().iter().map(|row| self.get(&row.sku)).collect()
    }
}

/// Fits one series model per SKU on a bounded worker pool
#[derive(Debug, Clone)]
pub struct PerSeriesForecaster<M: SeriesModel = SeasonalArima> {
    model: M,
    config: PerSeriesConfig,
}

impl Default for PerSeriesForecaster<SeasonalArima> {
    fn default() -> Self {
        Self::new(SeasonalArima::default(), PerSeriesConfig::default())
    }
}

impl<M: SeriesModel> PerSeriesForecaster<M> {
    pub fn new(model: M, config: PerSeriesConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &PerSeriesConfig {
        &self.config
    }

    /// Forecast every SKU in `full` from its history in `train`.
    ///
    /// SKUs are enumerated from the full table, so a SKU whose rows all fall
    /// after the cutoff still gets a (zero) forecast.
    pub fn forecast(&self, full: &FeatureTable, train: &FeatureTable) -> Result<PerSeriesForecasts> {
        let mut histories: BTreeMap<&str, Vec<(NaiveDate, f64)>> =
            full.skus().into_iter().map(|sku| (sku, Vec::new())).collect();
        for row in train.rows() {
            if let Some(points) = histories.get_mut(row.sku.as_str()) {
                points.push((row.month, row.sales));
            }
        }

        let workers = match self.config.workers {
            Some(0) => {
                return Err(ForecastError::InvalidParameter(
                    "workers must be at least 1".to_string(),
                ))
            }
            Some(n) => n,
            None => rayon::current_num_threads(),
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ForecastError::InvalidParameter(format!("worker pool: {}", e)))?;

        info!(
            model = self.model.name(),
            skus = histories.len(),
            workers,
            "fitting per-sku models"
        );

        let outcomes: Vec<(SkuForecast, Option<SeriesWarning>)> = pool.install(|| {
            histories
                .par_iter()
                .map(|(sku, points)| self.forecast_one(sku, points))
                .collect()
        });

        let mut result = PerSeriesForecasts::default();
        for (forecast, warning) in outcomes {
            if let Some(warning) = warning {
                warn!(sku = %forecast.sku, "{}", warning);
                result.warnings.push(warning);
            }
            result.forecasts.insert(forecast.sku.clone(), forecast);
        }
        Ok(result)
    }

    fn forecast_one(&self, sku: &str, points: &[(NaiveDate, f64)]) -> (SkuForecast, Option<SeriesWarning>) {
        let grid = monthly_grid(points);
        let observed_months = grid.iter().filter(|v| v.is_some()).count();
        let collapsed = points.len() - observed_months;
        if collapsed > 0 {
            debug!(sku, collapsed, "collapsed same-month rows across warehouses");
        }
        let zero = |source| SkuForecast {
            sku: sku.to_string(),
            value: 0.0,
            observed_months,
            source,
        };

        // the model's own minimum grid applies once the month rule passes
        let required = if observed_months < self.config.min_history_months {
            Some(self.config.min_history_months)
        } else if grid.len() < self.model.min_length() {
            Some(self.model.min_length())
        } else {
            None
        };
        if let Some(required) = required {
            let warning = SeriesWarning::InsufficientHistory {
                sku: sku.to_string(),
                observed_months,
                required,
            };
            return (zero(ForecastSource::InsufficientHistory), Some(warning));
        }

        let fitted = panic::catch_unwind(AssertUnwindSafe(|| {
            self.model
                .train(&grid)
                .and_then(|trained| trained.forecast_next())
        }));

        let outcome = match fitted {
            Ok(outcome) => outcome.map_err(|e| e.to_string()),
            Err(_) => Err("model panicked".to_string()),
        };

        match outcome {
            Ok(value) => {
                debug!(sku, value, observed_months, "per-sku forecast");
                (
                    SkuForecast {
                        sku: sku.to_string(),
                        value,
                        observed_months,
                        source: ForecastSource::Model,
                    },
                    None,
                )
            }
            Err(reason) => {
                let warning = SeriesWarning::FitFailed {
                    sku: sku.to_string(),
                    reason,
                };
                (zero(ForecastSource::FitFailure), Some(warning))
            }
        }
    }
}

/// Lay observations on a contiguous monthly grid from the first to the last month.
///
/// Points are ordered by month; when several share a month the last one wins.
/// Months without an observation are `None`.
pub fn monthly_grid(points: &[(NaiveDate, f64)]) -> Vec<Option<f64>> {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|(month, _)| *month);

    let (first, last) = match (sorted.first(), sorted.last()) {
        (Some(first), Some(last)) => (first.0, last.0),
        _ => return Vec::new(),
    };

    let len = months_between(first, last) as usize + 1;
    let mut grid = vec![None; len];
    for (month, sales) in sorted {
        grid[months_between(first, month) as usize] = Some(sales);
    }
    grid
}
