//! End-to-end forecasting run
//!
//! wide table → long rows → features → split → both models → blend → evaluate

use crate::config::PipelineConfig;
use crate::cross_sectional::CrossSectionalForecaster;
use crate::data::{RawObservation, WideTable};
use crate::ensemble::{Ensembler, ForecastTable};
use crate::error::Result;
use crate::features::{FeatureBuilder, FeatureReport};
use crate::metrics::{EvaluationReport, Evaluator};
use crate::models::random_forest::RandomForest;
use crate::models::sarima::SeasonalArima;
use crate::per_series::{PerSeriesConfig, PerSeriesForecaster, PerSeriesForecasts};
use crate::split::Splitter;
use chrono::NaiveDate;
use tracing::{info, info_span, warn};

/// Outputs of one pipeline run
#[derive(Debug)]
pub struct PipelineRun {
    pub features: FeatureReport,
    pub cutoff: NaiveDate,
    pub train_rows: usize,
    pub forecasts: ForecastTable,
    pub series: PerSeriesForecasts,
    /// Scoring can fail (for example on a zero actual) without losing the forecasts
    pub evaluation: Result<EvaluationReport>,
}

/// Runs every stage with one configuration
#[derive(Debug, Clone)]
pub struct ForecastPipeline {
    config: PipelineConfig,
    features: FeatureBuilder,
    cross_sectional: CrossSectionalForecaster<RandomForest>,
    per_series: PerSeriesForecaster<SeasonalArima>,
}

impl ForecastPipeline {
    /// Validate `config` and build every stage
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let features = FeatureBuilder::new(config.lags)?;
        let cross_sectional =
            CrossSectionalForecaster::new(RandomForest::new(config.random_forest.clone())?);
        let sarima = SeasonalArima::new(config.sarima.clone())?.with_time_budget(config.fit_timeout());
        let per_series = PerSeriesForecaster::new(
            sarima,
            PerSeriesConfig {
                min_history_months: config.min_history_months,
                workers: config.workers,
            },
        );

        Ok(Self {
            config,
            features,
            cross_sectional,
            per_series,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run on a wide table
    pub fn run(&self, wide: &WideTable) -> Result<PipelineRun> {
        let unparsed = wide.unparsed_headers();
        if !unparsed.is_empty() {
            warn!(headers = ?unparsed, "ignoring columns that are not months");
        }
        self.run_long(&wide.melt())
    }

    /// Run on long rows
    pub fn run_long(&self, raw: &[RawObservation]) -> Result<PipelineRun> {
        let _span = info_span!("pipeline").entered();

        let (table, report) = self.features.build(raw)?;
        info!(
            input_rows = report.input_rows,
            output_rows = report.output_rows,
            skus = table.skus().len(),
            "built features"
        );

        let splitter = match self.config.cutoff {
            Some(cutoff) => Splitter::new(cutoff),
            None => Splitter::latest_month(&table)?,
        };
        let split = splitter.split(&table)?;

        let fitted = self.cross_sectional.fit(&split.train)?;
        let rf = fitted.predict(&split.test)?;

        let series = self.per_series.forecast(&table, &split.train)?;
        let sarima = series.broadcast(&split.test);

        let forecasts = Ensembler.combine(&split.test, &rf, &sarima)?;
        let evaluation = Evaluator.evaluate(&forecasts);
        if let Err(e) = &evaluation {
            warn!(error = %e, "forecasts could not be scored");
        }

        Ok(PipelineRun {
            features: report,
            cutoff: split.cutoff,
            train_rows: split.train.len(),
            forecasts,
            series,
            evaluation,
        })
    }
}
