//! # SKU Forecast Workspace
//!
//! Umbrella crate re-exporting the workspace members:
//!
//! - [`math`]: differencing and bounded simplex optimisation (`forecast_math`)
//! - [`forecast`]: the sales forecasting pipeline (`sku_forecast`)
//!
//! ## Example
//!
//! ```
//! use sku_forecast_workspace::forecast::{FeatureBuilder, Splitter};
//! use sku_forecast_workspace::forecast::data::RawObservation;
//! use chrono::NaiveDate;
//!
//! let month = |m| NaiveDate::from_ymd_opt(2023, m, 1).unwrap();
//! let raw: Vec<RawObservation> = (1..=4)
//!     .map(|m| RawObservation::new("W1", "North", "A", month(m), m as f64 * 10.0))
//!     .collect();
//!
//! let (table, _) = FeatureBuilder::default().build(&raw).unwrap();
//! let split = Splitter::new(month(4)).split(&table).unwrap();
//! assert_eq!(split.test.rows()[0].lag(1), Some(30.0));
//! ```

pub use forecast_math as math;
pub use sku_forecast as forecast;
