//! Temporal train/test split

use crate::error::{ForecastError, Result};
use crate::features::FeatureTable;
use chrono::NaiveDate;
use tracing::info;

/// Rows before the cutoff and rows on or after it
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub cutoff: NaiveDate,
    pub train: FeatureTable,
    pub test: FeatureTable,
}

/// Splits a feature table at a cutoff month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Splitter {
    cutoff: NaiveDate,
}

impl Splitter {
    pub fn new(cutoff: NaiveDate) -> Self {
        Self { cutoff }
    }

    /// Splitter holding out the latest month of `table`
    pub fn latest_month(table: &FeatureTable) -> Result<Self> {
        table.last_month().map(Self::new).ok_or_else(|| {
            ForecastError::Schema("no usable observations to choose a cutoff from".to_string())
        })
    }

    pub fn cutoff(&self) -> NaiveDate {
        self.cutoff
    }

    /// Partition `table`: train is `month < cutoff`, test is `month >= cutoff`.
    ///
    /// An empty test side is an error. An empty train side is not; the
    /// cross-sectional model rejects it when it is fitted.
    pub fn split(&self, table: &FeatureTable) -> Result<TrainTestSplit> {
        let cutoff = self.cutoff;
        let train = table.filter(|r| r.month < cutoff);
        let test = table.filter(|r| r.month >= cutoff);

        if test.is_empty() {
            return Err(ForecastError::EmptyTestSet { cutoff });
        }

        info!(
            %cutoff,
            train_rows = train.len(),
            test_rows = test.len(),
            "split feature table"
        );

        Ok(TrainTestSplit {
            cutoff,
            train,
            test,
        })
    }
}
