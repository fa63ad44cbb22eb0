//! Differencing operators for integrated time series models
//!
//! A combined operator `(1 - B)^d (1 - B^s)^D` is represented by the
//! coefficients of its lag polynomial, which makes applying it and
//! reversing one step of it the same dot product.

use crate::{MathError, Result};

/// Lag polynomial of a regular plus seasonal differencing operator
#[derive(Debug, Clone, PartialEq)]
pub struct DifferencingOperator {
    /// Coefficients `c_k` of `sum_k c_k B^k`; `c_0` is always 1
    coefficients: Vec<f64>,
}

impl DifferencingOperator {
    /// Build `(1 - B)^d (1 - B^period)^seasonal_d`
    pub fn new(d: usize, seasonal_d: usize, period: usize) -> Result<Self> {
        if seasonal_d > 0 && period < 2 {
            return Err(MathError::InvalidInput(format!(
                "Seasonal period must be at least 2, got {}",
                period
            )));
        }

        let mut coefficients = vec![1.0];
        for _ in 0..d {
            coefficients = multiply(&coefficients, &lag_difference(1));
        }
        for _ in 0..seasonal_d {
            coefficients = multiply(&coefficients, &lag_difference(period));
        }

        Ok(Self { coefficients })
    }

    /// Number of leading observations consumed by the operator
    pub fn order(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Lag polynomial coefficients, lowest lag first
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Differenced value at index `t` of `series`; `t` must be at least `order()`
    pub fn apply_at(&self, series: &[f64], t: usize) -> f64 {
        self.coefficients
            .iter()
            .enumerate()
            .map(|(k, c)| c * series[t - k])
            .sum()
    }

    /// Level value that follows `history` given the differenced value `w_next`
    pub fn integrate_next(&self, history: &[f64], w_next: f64) -> Result<f64> {
        let order = self.order();
        if history.len() < order {
            return Err(MathError::InsufficientData(format!(
                "Need {} past values to integrate, have {}",
                order,
                history.len()
            )));
        }

        let n = history.len();
        let carried: f64 = self
            .coefficients
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, c)| c * history[n - k])
            .sum();

        Ok(w_next - carried)
    }
}

/// Coefficients of `1 - B^lag`
fn lag_difference(lag: usize) -> Vec<f64> {
    let mut poly = vec![0.0; lag + 1];
    poly[0] = 1.0;
    poly[lag] = -1.0;
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
