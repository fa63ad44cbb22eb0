//! Utility functions for the sku_forecast crate

use crate::data::{MonthColumn, SeriesKey, WideSchema, WideTable};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Whole months from `from` to `to`; negative when `to` is earlier
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to.year() as i64 - from.year() as i64) * 12 + (to.month() as i64 - from.month() as i64)
}

/// First day of the month `months` after `date`'s month
pub fn add_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let index = date.year() as i64 * 12 + date.month0() as i64 + months;
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// First day of `date`'s month
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Shape of a generated demo table
#[derive(Debug, Clone)]
pub struct SyntheticTable {
    pub warehouses: usize,
    pub skus: usize,
    pub months: usize,
    pub start: NaiveDate,
    /// Probability that a cell is left empty
    pub missing_rate: f64,
    pub seed: u64,
}

impl Default for SyntheticTable {
    fn default() -> Self {
        Self {
            warehouses: 3,
            skus: 8,
            months: 36,
            start: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or(NaiveDate::MIN),
            missing_rate: 0.02,
            seed: 7,
        }
    }
}

impl SyntheticTable {
    /// Generate a wide table of seasonal, trending, noisy monthly sales.
    ///
    /// Every SKU has its own base level, trend and seasonal amplitude; each
    /// warehouse scales the series. Values are rounded and floored at 1 so
    /// that MAPE stays defined on the generated data.
    pub fn generate(&self) -> Result<WideTable> {
        if self.warehouses == 0 || self.skus == 0 || self.months == 0 {
            return Err(ForecastError::InvalidParameter(
                "synthetic table needs at least one warehouse, sku and month".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.missing_rate) {
            return Err(ForecastError::InvalidParameter(format!(
                "missing_rate must be in [0, 1), got {}",
                self.missing_rate
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let noise = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
        let uniform = rand::distributions::Uniform::new(0.0, 1.0);
        let regions = ["North", "South", "East", "West"];

        let columns = (0..self.months)
            .map(|m| {
                let month = add_months(self.start, m as i64).ok_or_else(|| {
                    ForecastError::InvalidParameter("synthetic month out of range".to_string())
                })?;
                Ok(MonthColumn::parse(month.format("%Y-%m-%d").to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut keys = Vec::new();
        let mut values = Vec::new();
        for w in 0..self.warehouses {
            let scale = 1.0 + 0.25 * w as f64;
            for s in 0..self.skus {
                let base = 80.0 + 40.0 * s as f64;
                let trend = 0.5 + 0.1 * s as f64;
                let amplitude = 0.2 * base;
                keys.push(SeriesKey::new(
                    format!("WH-{:02}", w + 1),
                    regions[w % regions.len()],
                    format!("SKU-{:03}", s + 1),
                ));
                let row = (0..self.months)
                    .map(|m| {
                        if uniform.sample(&mut rng) < self.missing_rate {
                            return None;
                        }
                        let season =
                            (2.0 * std::f64::consts::PI * (m % 12) as f64 / 12.0).sin();
                        let level = base + trend * m as f64 + amplitude * season;
                        let value = scale * level + 0.05 * base * noise.sample(&mut rng);
                        Some(value.round().max(1.0))
                    })
                    .collect();
                values.push(row);
            }
        }

        WideTable::new(WideSchema::default(), keys, columns, values)
    }
}
