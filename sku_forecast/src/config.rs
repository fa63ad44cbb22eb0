//! Pipeline configuration
//!
//! Settings come from defaults, an optional JSON file, then `SKU_FORECAST_*`
//! environment variables, with later sources overriding earlier ones.

use crate::error::{ForecastError, Result};
use crate::features::DEFAULT_LAGS;
use crate::models::random_forest::RandomForestConfig;
use crate::models::sarima::SarimaConfig;
use crate::per_series::DEFAULT_MIN_HISTORY_MONTHS;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "SKU_FORECAST_";

/// Everything needed to run the forecasting pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// First test month; the latest month in the data when unset
    pub cutoff: Option<NaiveDate>,
    /// Number of sales lags used as features
    pub lags: usize,
    /// Observed training months a SKU needs before it is fitted
    pub min_history_months: usize,
    pub random_forest: RandomForestConfig,
    pub sarima: SarimaConfig,
    /// Worker threads for per-SKU fitting; one per CPU when unset
    pub workers: Option<usize>,
    /// Wall-clock budget for one SKU fit, in seconds
    pub fit_timeout_secs: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cutoff: None,
            lags: DEFAULT_LAGS,
            min_history_months: DEFAULT_MIN_HISTORY_MONTHS,
            random_forest: RandomForestConfig::default(),
            sarima: SarimaConfig::default(),
            workers: None,
            fit_timeout_secs: 30.0,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file; missing keys take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ForecastError::Config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Parse configuration from JSON text
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| ForecastError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `SKU_FORECAST_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    /// Apply overrides from `lookup`, which maps an unprefixed key such as
    /// `WORKERS` to its value
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("CUTOFF") {
            let cutoff = crate::data::parse_month_header(&val).ok_or_else(|| {
                ForecastError::Config(format!("{}CUTOFF is not a month: {}", ENV_PREFIX, val))
            })?;
            self.cutoff = Some(cutoff);
        }
        if let Some(val) = lookup("WORKERS") {
            self.workers = Some(parse_override("WORKERS", &val)?);
        }
        if let Some(val) = lookup("SEED") {
            self.random_forest.seed = parse_override("SEED", &val)?;
        }
        if let Some(val) = lookup("TREES") {
            self.random_forest.n_estimators = parse_override("TREES", &val)?;
        }
        if let Some(val) = lookup("FIT_TIMEOUT_SECS") {
            self.fit_timeout_secs = parse_override("FIT_TIMEOUT_SECS", &val)?;
        }
        if let Some(val) = lookup("MIN_HISTORY_MONTHS") {
            self.min_history_months = parse_override("MIN_HISTORY_MONTHS", &val)?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.lags == 0 {
            return Err(ForecastError::Config("lags must be at least 1".to_string()));
        }
        if self.workers == Some(0) {
            return Err(ForecastError::Config("workers must be at least 1".to_string()));
        }
        if !self.fit_timeout_secs.is_finite() || self.fit_timeout_secs <= 0.0 {
            return Err(ForecastError::Config(format!(
                "fit_timeout_secs must be positive, got {}",
                self.fit_timeout_secs
            )));
        }
        self.random_forest
            .validate()
            .map_err(|e| ForecastError::Config(e.to_string()))?;
        self.sarima
            .validate()
            .map_err(|e| ForecastError::Config(e.to_string()))?;
        Ok(())
    }

    /// Per-SKU fit budget
    pub fn fit_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.fit_timeout_secs)
    }

    pub fn with_cutoff(mut self, cutoff: NaiveDate) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
}

fn parse_override<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        ForecastError::Config(format!("{}{}='{}': {}", ENV_PREFIX, key, value, e))
    })
}
