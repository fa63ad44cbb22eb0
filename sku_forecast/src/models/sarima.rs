//! Seasonal ARIMA models for monthly series
//!
//! SARIMA(p,d,q)(P,D,Q)[s] estimated by conditional sum of squares on the
//! differenced series `w = (1-B)^d (1-B^s)^D y`:
//!
//! ```text
//! (1 - φ(B)) (1 - Φ(B^s)) w_t = (1 + θ(B)) (1 + Θ(B^s)) e_t
//! ```
//!
//! Pre-sample values of `w` and `e` are zero. There is no intercept, which
//! matches the usual convention for differenced models.
//!
//! Gaps in the monthly grid are handled explicitly. A gap inside the first
//! `d + D*s` months is interpolated from its observed neighbours. A later gap
//! takes the model's own one-step prediction, contributes a zero residual, and
//! is left out of the sum of squares.
//!
//! A grid of exactly `d + D*s` points leaves no differenced value to fit.
//! The coefficients then stay at zero and the forecast integrates `w = 0`.

use crate::error::{ForecastError, Result};
use crate::models::{SeriesModel, TrainedSeriesModel};
use forecast_math::differencing::DifferencingOperator;
use forecast_math::optimization::{nelder_mead, NelderMeadConfig};
use forecast_math::MathError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const COEFFICIENT_BOUND: f64 = 0.99;

/// Non-seasonal (p, d, q) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

/// Seasonal (P, D, Q, s) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

/// Seasonal ARIMA settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SarimaConfig {
    /// Non-seasonal order
    pub order: ArimaOrder,
    /// Seasonal order
    pub seasonal_order: SeasonalOrder,
    /// Iteration budget for the optimiser
    pub max_iterations: usize,
    /// Relative convergence tolerance for the optimiser
    pub tolerance: f64,
}

impl Default for SarimaConfig {
    fn default() -> Self {
        Self {
            order: ArimaOrder { p: 1, d: 1, q: 1 },
            seasonal_order: SeasonalOrder {
                p: 1,
                d: 1,
                q: 1,
                period: 12,
            },
            max_iterations: 5000,
            tolerance: 1e-8,
        }
    }
}

impl SarimaConfig {
    /// Check for orders no model can be fitted with
    pub fn validate(&self) -> Result<()> {
        let s = &self.seasonal_order;
        if (s.p > 0 || s.d > 0 || s.q > 0) && s.period < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "Seasonal period must be at least 2, got {}",
                s.period
            )));
        }
        if self.max_iterations == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_iterations must be positive".to_string(),
            ));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of estimated coefficients
    pub fn n_params(&self) -> usize {
        self.order.p + self.order.q + self.seasonal_order.p + self.seasonal_order.q
    }

    /// Shortest grid the model can forecast from
    pub fn min_length(&self) -> usize {
        (self.order.d + self.seasonal_order.d * self.seasonal_order.period).max(1)
    }
}

/// Seasonal ARIMA model
#[derive(Debug, Clone)]
pub struct SeasonalArima {
    name: String,
    config: SarimaConfig,
    time_budget: Option<Duration>,
}

/// Trained seasonal ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedSeasonalArima {
    name: String,
    params: Vec<f64>,
    state: FilterState,
    polynomials: ArmaPolynomials,
    operator: DifferencingOperator,
    sum_of_squares: f64,
    iterations: usize,
}

/// Expanded lag polynomials; index k holds the coefficient for lag k, index 0 is unused
#[derive(Debug, Clone)]
struct ArmaPolynomials {
    ar: Vec<f64>,
    ma: Vec<f64>,
}

/// Levels, differenced values and residuals after running the recursion
#[derive(Debug, Clone)]
struct FilterState {
    levels: Vec<f64>,
    w: Vec<f64>,
    e: Vec<f64>,
    sum_of_squares: f64,
}

impl SeasonalArima {
    /// Create a new seasonal ARIMA model
    pub fn new(config: SarimaConfig) -> Result<Self> {
        config.validate()?;
        let o = config.order;
        let s = config.seasonal_order;
        Ok(Self {
            name: format!(
                "SARIMA({},{},{})({},{},{})[{}]",
                o.p, o.d, o.q, s.p, s.d, s.q, s.period
            ),
            config,
            time_budget: None,
        })
    }

    /// Bound the wall-clock time spent estimating one series
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    fn operator(&self) -> Result<DifferencingOperator> {
        Ok(DifferencingOperator::new(
            self.config.order.d,
            self.config.seasonal_order.d,
            self.config.seasonal_order.period,
        )?)
    }

    fn polynomials(&self, params: &[f64]) -> ArmaPolynomials {
        let o = self.config.order;
        let s = self.config.seasonal_order;
        let (phi, rest) = params.split_at(o.p);
        let (theta, rest) = rest.split_at(o.q);
        let (seasonal_phi, seasonal_theta) = rest.split_at(s.p);

        // (1 - φ1 B - ...)(1 - Φ1 B^s - ...) = 1 - Σ a_k B^k
        let ar_product = multiply(
            &lag_polynomial(phi, 1, -1.0),
            &lag_polynomial(seasonal_phi, s.period, -1.0),
        );
        let ma_product = multiply(
            &lag_polynomial(theta, 1, 1.0),
            &lag_polynomial(seasonal_theta, s.period, 1.0),
        );

        ArmaPolynomials {
            ar: ar_product.iter().map(|c| -c).collect(),
            ma: ma_product,
        }
    }
}

impl Default for SeasonalArima {
    fn default() -> Self {
        Self {
            name: "SARIMA(1,1,1)(1,1,1)[12]".to_string(),
            config: SarimaConfig::default(),
            time_budget: None,
        }
    }
}

impl SeriesModel for SeasonalArima {
    type Trained = TrainedSeasonalArima;

    fn train(&self, series: &[Option<f64>]) -> Result<TrainedSeasonalArima> {
        let operator = self.operator()?;
        let min_length = self.config.min_length();
        if series.len() < min_length {
            return Err(MathError::InsufficientData(format!(
                "{} needs at least {} monthly points, got {}",
                self.name,
                min_length,
                series.len()
            ))
            .into());
        }

        let levels = fill_presample(series, operator.order())?;
        let observed: Vec<bool> = series.iter().map(Option::is_some).collect();

        let n_params = self.config.n_params();
        let estimable = observed.iter().skip(operator.order()).any(|o| *o);
        let (params, iterations) = if n_params == 0 || !estimable {
            (vec![0.0; n_params], 0)
        } else {
            let bounds = vec![(-COEFFICIENT_BOUND, COEFFICIENT_BOUND); n_params];
            let initial = vec![0.1; n_params];
            let mut nm = NelderMeadConfig {
                max_iter: self.config.max_iterations,
                tolerance: self.config.tolerance,
                ..Default::default()
            };
            if let Some(budget) = self.time_budget {
                nm = nm.with_time_budget(budget);
            }

            let result = nelder_mead(
                |params| {
                    let polys = self.polynomials(params);
                    run_filter(&levels, &observed, &operator, &polys).sum_of_squares
                },
                &initial,
                Some(&bounds),
                &nm,
            )?;
            if !result.converged {
                return Err(MathError::DidNotConverge {
                    iterations: result.iterations,
                }
                .into());
            }
            (result.optimal_point, result.iterations)
        };

        let polynomials = self.polynomials(&params);
        let state = run_filter(&levels, &observed, &operator, &polynomials);
        if !state.sum_of_squares.is_finite() {
            return Err(MathError::CalculationError(
                "sum of squares is not finite".to_string(),
            )
            .into());
        }

        Ok(TrainedSeasonalArima {
            name: self.name.clone(),
            params,
            sum_of_squares: state.sum_of_squares,
            state,
            polynomials,
            operator,
            iterations,
        })
    }

    fn min_length(&self) -> usize {
        self.config.min_length()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedSeriesModel for TrainedSeasonalArima {
    fn forecast_next(&self) -> Result<f64> {
        let w_next = predict_w(&self.state.w, &self.state.e, &self.polynomials);
        let next = self.operator.integrate_next(&self.state.levels, w_next)?;
        if !next.is_finite() {
            return Err(MathError::CalculationError("forecast is not finite".to_string()).into());
        }
        Ok(next)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedSeasonalArima {
    /// Estimated coefficients in the order φ, θ, Φ, Θ
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Conditional sum of squares at the estimate
    pub fn sum_of_squares(&self) -> f64 {
        self.sum_of_squares
    }

    /// Optimiser iterations used
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Series levels with gaps filled, as used by the forecast
    pub fn filled_levels(&self) -> &[f64] {
        &self.state.levels
    }
}

/// Fill gaps before the first differencable index by linear interpolation
fn fill_presample(series: &[Option<f64>], order: usize) -> Result<Vec<f64>> {
    let observed: Vec<(usize, f64)> = series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    if observed.is_empty() {
        return Err(MathError::InsufficientData("series has no observed values".to_string()).into());
    }

    let mut levels = Vec::with_capacity(series.len());
    for (t, value) in series.iter().enumerate() {
        let filled = match value {
            Some(v) => *v,
            // filled later by the recursion
            None if t >= order => f64::NAN,
            None => {
                let before = observed.iter().rev().find(|(i, _)| *i < t);
                let after = observed.iter().find(|(i, _)| *i > t);
                match (before, after) {
                    (Some(&(i0, v0)), Some(&(i1, v1))) => {
                        v0 + (v1 - v0) * (t - i0) as f64 / (i1 - i0) as f64
                    }
                    (Some(&(_, v)), None) | (None, Some(&(_, v))) => v,
                    (None, None) => unreachable!("observed is non-empty"),
                }
            }
        };
        levels.push(filled);
    }
    Ok(levels)
}

/// Run the ARMA recursion over the differenced series, imputing later gaps
fn run_filter(
    presample: &[f64],
    observed: &[bool],
    operator: &DifferencingOperator,
    polys: &ArmaPolynomials,
) -> FilterState {
    let order = operator.order();
    let mut levels = presample.to_vec();
    let mut w = Vec::with_capacity(levels.len().saturating_sub(order));
    let mut e = Vec::with_capacity(w.capacity());
    let mut sum_of_squares = 0.0;

    for t in order..levels.len() {
        let w_hat = predict_w(&w, &e, polys);
        if observed[t] {
            let actual = operator.apply_at(&levels, t);
            let residual = actual - w_hat;
            sum_of_squares += residual * residual;
            w.push(actual);
            e.push(residual);
        } else {
            let carried: f64 = operator
                .coefficients()
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, c)| c * levels[t - k])
                .sum();
            levels[t] = w_hat - carried;
            w.push(w_hat);
            e.push(0.0);
        }
    }

    FilterState {
        levels,
        w,
        e,
        sum_of_squares,
    }
}

/// One-step prediction of the next differenced value; pre-sample terms are zero
fn predict_w(w: &[f64], e: &[f64], polys: &ArmaPolynomials) -> f64 {
    let j = w.len();
    let ar: f64 = polys
        .ar
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(k, _)| *k <= j)
        .map(|(k, a)| a * w[j - k])
        .sum();
    let ma: f64 = polys
        .ma
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(k, _)| *k <= j)
        .map(|(k, m)| m * e[j - k])
        .sum();
    ar + ma
}

/// `1 + sign * Σ c_i B^(i*step)`
fn lag_polynomial(coefficients: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefficients.len() * step + 1];
    poly[0] = 1.0;
    for (i, c) in coefficients.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

fn multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}
