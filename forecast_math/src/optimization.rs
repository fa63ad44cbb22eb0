//! Bounded Nelder-Mead simplex minimisation
//!
//! Used for conditional-sum-of-squares estimation, where the objective is
//! cheap to evaluate but has no analytic gradient.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::{Duration, Instant};

/// Outcome of a Nelder-Mead run
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// Best point found
    pub optimal_point: Vec<f64>,
    /// Objective value at the best point
    pub optimal_value: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Whether the simplex met the tolerance before the iteration budget ran out
    pub converged: bool,
}

/// Nelder-Mead settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations
    pub max_iter: usize,
    /// Relative tolerance on the spread of objective values across the simplex
    pub tolerance: f64,
    /// Reflection coefficient
    pub alpha: f64,
    /// Expansion coefficient
    pub gamma: f64,
    /// Contraction coefficient
    pub rho: f64,
    /// Shrink coefficient
    pub sigma: f64,
    /// Initial simplex step
    pub initial_step: f64,
    /// Wall-clock budget for the whole run
    #[serde(skip)]
    pub time_budget: Option<Duration>,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            tolerance: 1e-10,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.1,
            time_budget: None,
        }
    }
}

impl NelderMeadConfig {
    /// Set the wall-clock budget
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }
}

/// Minimise `objective` starting from `initial`, keeping every vertex inside `bounds`.
///
/// Running out of iterations is not an error: the best point is returned with
/// `converged == false` and the caller decides what to do with it. Running
/// out of time is an error.
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &NelderMeadConfig,
) -> Result<NelderMeadResult>
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return Err(MathError::InvalidInput(
            "Cannot optimise over zero parameters".to_string(),
        ));
    }
    if let Some(b) = bounds {
        if b.len() != n {
            return Err(MathError::InvalidInput(format!(
                "Expected {} bounds, got {}",
                n,
                b.len()
            )));
        }
    }

    let deadline = config.time_budget.map(|budget| (Instant::now() + budget, budget));

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(clamp(initial, bounds));
    for i in 0..n {
        let mut vertex = initial.to_vec();
        let step = if initial[i].abs() > 1e-10 {
            config.initial_step * initial[i].abs()
        } else {
            config.initial_step
        };
        vertex[i] += step;
        simplex.push(clamp(&vertex, bounds));
    }

    let mut values: Vec<f64> = simplex.iter().map(|v| sanitize(objective(v))).collect();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        if let Some((at, budget)) = deadline {
            if Instant::now() >= at {
                return Err(MathError::DeadlineExceeded(budget));
            }
        }
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        let spread = values[worst] - values[best];
        if spread <= config.tolerance * (values[best].abs() + config.tolerance) {
            converged = true;
            break;
        }

        let centroid = centroid_without(&simplex, worst);
        let collapsed = simplex
            .iter()
            .all(|v| distance(v, &centroid) <= config.tolerance);
        if collapsed {
            converged = true;
            break;
        }

        let reflected = clamp(&along(&centroid, &simplex[worst], -config.alpha), bounds);
        let reflected_value = sanitize(objective(&reflected));

        if reflected_value < values[best] {
            let expanded = clamp(&along(&centroid, &reflected, config.gamma), bounds);
            let expanded_value = sanitize(objective(&expanded));
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
            continue;
        }

        let (toward, toward_value) = if reflected_value < values[worst] {
            (reflected.clone(), reflected_value)
        } else {
            (simplex[worst].clone(), values[worst])
        };
        let contracted = clamp(&along(&centroid, &toward, config.rho), bounds);
        let contracted_value = sanitize(objective(&contracted));
        if contracted_value < toward_value {
            simplex[worst] = contracted;
            values[worst] = contracted_value;
            continue;
        }

        // shrink toward the best vertex
        let anchor = simplex[best].clone();
        for idx in 0..=n {
            if idx == best {
                continue;
            }
            let shrunk = clamp(&along(&anchor, &simplex[idx], config.sigma), bounds);
            values[idx] = sanitize(objective(&shrunk));
            simplex[idx] = shrunk;
        }
    }

    let best = (0..=n)
        .min_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal))
        .unwrap_or(0);

    Ok(NelderMeadResult {
        optimal_point: simplex[best].clone(),
        optimal_value: values[best],
        iterations,
        converged,
    })
}

/// `origin + t * (point - origin)`
fn along(origin: &[f64], point: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(point.iter())
        .map(|(o, p)| o + t * (p - o))
        .collect()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn centroid_without(simplex: &[Vec<f64>], excluded: usize) -> Vec<f64> {
    let n = simplex[0].len();
    let count = (simplex.len() - 1) as f64;
    let mut centroid = vec![0.0; n];
    for (idx, vertex) in simplex.iter().enumerate() {
        if idx == excluded {
            continue;
        }
        for (c, v) in centroid.iter_mut().zip(vertex.iter()) {
            *c += v;
        }
    }
    centroid.iter_mut().for_each(|c| *c /= count);
    centroid
}

fn clamp(point: &[f64], bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    match bounds {
        Some(bounds) => point
            .iter()
            .zip(bounds.iter())
            .map(|(&x, &(lo, hi))| x.max(lo).min(hi))
            .collect(),
        None => point.to_vec(),
    }
}

/// Non-finite objective values rank worst
fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::MAX
    }
}
