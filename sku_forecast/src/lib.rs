//! # SKU Forecast
//!
//! Next-month sales forecasting for every (warehouse, SKU) pair of a wide
//! monthly sales table.
//!
//! ## Features
//!
//! - Wide/long reshaping of monthly sales tables (CSV or polars DataFrame)
//! - Calendar and lag features computed per (warehouse, sku) series
//! - Temporal train/test split at a cutoff month
//! - A random forest pooled across all series
//! - A seasonal ARIMA per SKU, fitted in parallel on a bounded worker pool
//! - An equal-weight ensemble of both, scored by MAPE
//!
//! ## Quick Start
//!
//! ```no_run
//! use sku_forecast::{DataLoader, ForecastPipeline, PipelineConfig, WideSchema};
//!
//! let table = DataLoader::from_csv("sales.csv", &WideSchema::default())?;
//! let pipeline = ForecastPipeline::new(PipelineConfig::default())?;
//! let run = pipeline.run(&table)?;
//!
//! for row in run.forecasts.rows().iter().take(5) {
//!     println!(
//!         "{} {} {}: {:?}",
//!         row.observation.warehouse, row.observation.sku, row.observation.month, row.final_prediction
//!     );
//! }
//! if let Ok(report) = &run.evaluation {
//!     println!("{}", report);
//! }
//! # Ok::<(), sku_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod cross_sectional;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod per_series;
pub mod pipeline;
pub mod split;
pub mod utils;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::cross_sectional::CrossSectionalForecaster;
pub use crate::data::{DataLoader, RawObservation, WideSchema, WideTable};
pub use crate::ensemble::{Ensembler, ForecastRow, ForecastTable};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{EnrichedObservation, FeatureBuilder, FeatureTable};
pub use crate::metrics::{EvaluationReport, Evaluator};
pub use crate::models::{RegressionModel, SeriesModel};
pub use crate::per_series::PerSeriesForecaster;
pub use crate::pipeline::{ForecastPipeline, PipelineRun};
pub use crate::split::{Splitter, TrainTestSplit};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
