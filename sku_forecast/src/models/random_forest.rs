//! Random forest regression
//!
//! Bagged CART regression trees with variance-reduction splits. Every tree
//! draws its own bootstrap sample from an RNG whose seed is fixed before any
//! tree is grown, so the forest is reproducible even when trees are grown in
//! parallel.

use crate::error::{ForecastError, Result};
use crate::models::{FeatureMatrix, RegressionModel, TrainedRegressionModel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestConfig {
    /// Number of trees
    pub n_estimators: usize,
    /// Seed for bootstrap sampling and feature selection
    pub seed: u64,
    /// Maximum tree depth; `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` uses all of them
    pub max_features: Option<usize>,
    /// Draw a bootstrap sample per tree
    pub bootstrap: bool,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            seed: 42,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
        }
    }
}

impl RandomForestConfig {
    /// Check hyperparameters for values no forest can be grown with
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(ForecastError::InvalidParameter(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "max_features must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Random forest regressor
#[derive(Debug, Clone)]
pub struct RandomForest {
    name: String,
    config: RandomForestConfig,
}

/// Trained random forest
#[derive(Debug, Clone)]
pub struct TrainedRandomForest {
    name: String,
    trees: Vec<RegressionTree>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Single CART regression tree stored as a flat node arena
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    features: &'a FeatureMatrix,
    targets: &'a [f64],
    config: &'a RandomForestConfig,
    rng: StdRng,
    nodes: Vec<Node>,
}

impl RandomForest {
    /// Create a new random forest
    pub fn new(config: RandomForestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: format!("RandomForest(n_estimators={})", config.n_estimators),
            config,
        })
    }

    /// Hyperparameters of this forest
    pub fn config(&self) -> &RandomForestConfig {
        &self.config
    }
}

impl Default for RandomForest {
    fn default() -> Self {
        Self {
            name: "RandomForest(n_estimators=100)".to_string(),
            config: RandomForestConfig::default(),
        }
    }
}

impl RegressionModel for RandomForest {
    type Trained = TrainedRandomForest;

    fn train(&self, features: &FeatureMatrix, targets: &[f64]) -> Result<TrainedRandomForest> {
        let n = features.n_rows();
        if n == 0 {
            return Err(ForecastError::EmptyTrainingSet);
        }
        if targets.len() != n {
            return Err(ForecastError::InvalidParameter(format!(
                "{} feature rows but {} targets",
                n,
                targets.len()
            )));
        }
        if let Some((row, feature)) = features.first_non_finite() {
            return Err(ForecastError::NonNumericFeature(format!(
                "feature {} of training row {} is not finite",
                feature, row
            )));
        }
        if let Some(row) = targets.iter().position(|t| !t.is_finite()) {
            return Err(ForecastError::NonNumericFeature(format!(
                "target of training row {} is not finite",
                row
            )));
        }

        let mut seeder = StdRng::seed_from_u64(self.config.seed);
        let tree_seeds: Vec<u64> = (0..self.config.n_estimators)
            .map(|_| seeder.gen())
            .collect();

        let trees: Vec<RegressionTree> = tree_seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let sample: Vec<usize> = if self.config.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                TreeBuilder {
                    features,
                    targets,
                    config: &self.config,
                    rng,
                    nodes: Vec::new(),
                }
                .build(sample)
            })
            .collect();

        Ok(TrainedRandomForest {
            name: self.name.clone(),
            trees,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedRegressionModel for TrainedRandomForest {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.predict_row(row)).sum();
        total / self.trees.len() as f64
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedRandomForest {
    /// Number of trees in the forest
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl RegressionTree {
    /// Walk from the root to a leaf
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Number of nodes, leaves included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl<'a> TreeBuilder<'a> {
    fn build(mut self, sample: Vec<usize>) -> RegressionTree {
        self.grow(sample, 0);
        RegressionTree { nodes: self.nodes }
    }

    /// Grow the subtree for `indices` and return its node id
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let id = self.nodes.len();
        let value = mean_of(self.targets, &indices);
        self.nodes.push(Node::Leaf { value });

        let depth_exhausted = self.config.max_depth.map_or(false, |max| depth >= max);
        if depth_exhausted
            || indices.len() < self.config.min_samples_split
            || indices.len() < 2 * self.config.min_samples_leaf
            || is_constant(self.targets, &indices)
        {
            return id;
        }

        let Some(split) = self.best_split(&indices) else {
            return id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.features.get(i, split.feature) <= split.threshold);

        let left = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let n_features = self.features.n_features();
        match self.config.max_features {
            Some(k) if k < n_features => {
                let mut picked = rand::seq::index::sample(&mut self.rng, n_features, k).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..n_features).collect(),
        }
    }

    fn best_split(&mut self, indices: &[usize]) -> Option<SplitCandidate> {
        let min_leaf = self.config.min_samples_leaf;
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.targets[i].powi(2)).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;

        let mut best: Option<SplitCandidate> = None;
        for feature in self.candidate_features() {
            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| {
                self.features
                    .get(a, feature)
                    .partial_cmp(&self.features.get(b, feature))
                    .unwrap_or(Ordering::Equal)
            });

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..n - 1 {
                let y = self.targets[sorted[pos]];
                left_sum += y;
                left_sq += y * y;

                let here = self.features.get(sorted[pos], feature);
                let next = self.features.get(sorted[pos + 1], feature);
                let left_n = pos + 1;
                let right_n = n - left_n;
                if here == next || left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n as f64)
                    + (right_sq - right_sum * right_sum / right_n as f64);
                let gain = parent_sse - sse;

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

fn mean_of(targets: &[f64], indices: &[usize]) -> f64 {
    indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64
}

fn is_constant(targets: &[f64], indices: &[usize]) -> bool {
    let first = targets[indices[0]];
    indices.iter().all(|&i| targets[i] == first)
}
