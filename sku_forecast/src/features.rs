//! Feature construction for the cross-sectional model
//!
//! Rows are cleaned, sorted by (warehouse, sku, month) and enriched with the
//! calendar month, the year and `k` sales lags. Lags are shifts by row
//! position inside one (warehouse, sku) series: a gap in the calendar does
//! not create an empty lag, the previous observed row is used instead.

use crate::data::{Observation, RawObservation};
use crate::error::{ForecastError, Result};
use crate::models::FeatureMatrix;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;
use tracing::warn;

/// Number of lags used when none is configured
pub const DEFAULT_LAGS: usize = 3;

/// Observation with calendar and lag features
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedObservation {
    pub warehouse: String,
    pub region: String,
    pub sku: String,
    pub month: NaiveDate,
    pub sales: f64,
    /// Calendar month, 1 to 12
    pub month_num: u32,
    pub year: i32,
    /// `lags[i]` is the sales value `i + 1` rows earlier in the same series
    pub lags: Vec<Option<f64>>,
}

impl EnrichedObservation {
    /// Lag `n` (1-based); `None` when out of range or not available
    pub fn lag(&self, n: usize) -> Option<f64> {
        n.checked_sub(1).and_then(|i| self.lags.get(i).copied().flatten())
    }

    /// Model inputs `[month_num, year, lag1..lagk]`, missing lags as zero
    pub fn feature_row(&self) -> Vec<f64> {
        let mut row = Vec::with_capacity(2 + self.lags.len());
        row.push(self.month_num as f64);
        row.push(self.year as f64);
        row.extend(self.lags.iter().map(|lag| lag.unwrap_or(0.0)));
        row
    }
}

/// Counts from one feature build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureReport {
    pub input_rows: usize,
    /// Rows whose month header could not be parsed
    pub dropped_unparsed_month: usize,
    /// Rows with an empty sales cell
    pub dropped_missing_sales: usize,
    pub output_rows: usize,
}

/// Enriched rows sorted by (warehouse, sku, month)
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    rows: Vec<EnrichedObservation>,
    lags: usize,
}

impl FeatureTable {
    pub(crate) fn from_sorted(rows: Vec<EnrichedObservation>, lags: usize) -> Self {
        Self { rows, lags }
    }

    pub fn rows(&self) -> &[EnrichedObservation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of lag features per row
    pub fn lags(&self) -> usize {
        self.lags
    }

    /// Column names matching [`EnrichedObservation::feature_row`]
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec!["month_num".to_string(), "year".to_string()];
        names.extend((1..=self.lags).map(|i| format!("lag{}", i)));
        names
    }

    /// Feature matrix with missing lags filled by zero
    pub fn feature_matrix(&self) -> Result<FeatureMatrix> {
        let n_features = 2 + self.lags;
        let matrix = FeatureMatrix::from_rows(
            self.rows.iter().map(EnrichedObservation::feature_row).collect(),
            n_features,
        )?;
        if let Some((row, feature)) = matrix.first_non_finite() {
            let names = self.feature_names();
            return Err(ForecastError::NonNumericFeature(format!(
                "{} at row {} (sku '{}')",
                names[feature], row, self.rows[row].sku
            )));
        }
        Ok(matrix)
    }

    /// Sales column
    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.sales).collect()
    }

    /// Distinct SKUs across all warehouses
    pub fn skus(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|r| r.sku.as_str()).collect()
    }

    /// Latest month present
    pub fn last_month(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.month).max()
    }

    /// Rows matching a predicate, keeping order
    pub fn filter<F>(&self, predicate: F) -> FeatureTable
    where
        F: Fn(&EnrichedObservation) -> bool,
    {
        FeatureTable {
            rows: self.rows.iter().filter(|r| predicate(r)).cloned().collect(),
            lags: self.lags,
        }
    }
}

/// Builds [`FeatureTable`]s from long rows
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    lags: usize,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self { lags: DEFAULT_LAGS }
    }
}

impl FeatureBuilder {
    /// Create a builder producing `lags` lag features
    pub fn new(lags: usize) -> Result<Self> {
        if lags == 0 {
            return Err(ForecastError::InvalidParameter(
                "at least one lag is required".to_string(),
            ));
        }
        Ok(Self { lags })
    }

    pub fn lags(&self) -> usize {
        self.lags
    }

    /// Clean, sort and enrich raw rows.
    ///
    /// Rows with an unparsed month or an empty sales cell are dropped and
    /// counted. Two rows sharing (warehouse, sku, month) are an error.
    pub fn build(&self, raw: &[RawObservation]) -> Result<(FeatureTable, FeatureReport)> {
        let mut report = FeatureReport {
            input_rows: raw.len(),
            ..Default::default()
        };

        let mut clean = Vec::with_capacity(raw.len());
        for row in raw {
            if row.month.is_none() {
                report.dropped_unparsed_month += 1;
            } else if row.sales.is_none() {
                report.dropped_missing_sales += 1;
            } else if let Some(obs) = Observation::from_raw(row) {
                clean.push(obs);
            }
        }

        if report.dropped_unparsed_month > 0 {
            warn!(
                rows = report.dropped_unparsed_month,
                "dropping rows whose month header is not a date"
            );
        }
        if report.dropped_missing_sales > 0 {
            warn!(rows = report.dropped_missing_sales, "dropping empty sales cells");
        }

        let table = self.build_from_observations(clean)?;
        report.output_rows = table.len();
        Ok((table, report))
    }

    /// Sort and enrich clean observations
    pub fn build_from_observations(&self, mut rows: Vec<Observation>) -> Result<FeatureTable> {
        rows.sort_by(|a, b| {
            (&a.warehouse, &a.sku, a.month).cmp(&(&b.warehouse, &b.sku, b.month))
        });

        if let Some(pair) = rows.windows(2).find(|w| {
            w[0].warehouse == w[1].warehouse && w[0].sku == w[1].sku && w[0].month == w[1].month
        }) {
            return Err(ForecastError::DuplicateObservation {
                warehouse: pair[1].warehouse.clone(),
                sku: pair[1].sku.clone(),
                month: pair[1].month,
            });
        }

        let mut enriched = Vec::with_capacity(rows.len());
        let mut series_start = 0;
        for (idx, obs) in rows.iter().enumerate() {
            if idx > 0 {
                let prev = &rows[idx - 1];
                if prev.warehouse != obs.warehouse || prev.sku != obs.sku {
                    series_start = idx;
                }
            }
            let position = idx - series_start;
            let lags = (1..=self.lags)
                .map(|k| {
                    if k <= position {
                        Some(rows[idx - k].sales)
                    } else {
                        None
                    }
                })
                .collect();

            enriched.push(EnrichedObservation {
                warehouse: obs.warehouse.clone(),
                region: obs.region.clone(),
                sku: obs.sku.clone(),
                month: obs.month,
                sales: obs.sales,
                month_num: obs.month.month(),
                year: obs.month.year(),
                lags,
            });
        }

        Ok(FeatureTable::from_sorted(enriched, self.lags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn lag_accessor_is_one_based() {
        let obs = EnrichedObservation {
            warehouse: "W".into(),
            region: "R".into(),
            sku: "A".into(),
            month: ymd(2023, 4),
            sales: 4.0,
            month_num: 4,
            year: 2023,
            lags: vec![Some(3.0), None, Some(1.0)],
        };
        assert_eq!(obs.lag(0), None);
        assert_eq!(obs.lag(1), Some(3.0));
        assert_eq!(obs.lag(2), None);
        assert_eq!(obs.lag(4), None);
        assert_eq!(obs.feature_row(), vec![4.0, 2023.0, 3.0, 0.0, 1.0]);
    }

    #[test]
    fn zero_lags_rejected() {
        assert!(FeatureBuilder::new(0).is_err());
    }

    #[test]
    fn feature_names_follow_lag_count() {
        let table = FeatureBuilder::new(2)
            .unwrap()
            .build_from_observations(Vec::new())
            .unwrap();
        assert_eq!(table.feature_names(), vec!["month_num", "year", "lag1", "lag2"]);
    }
}
