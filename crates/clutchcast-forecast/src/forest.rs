// Bagged regression forest. Trees are grown in parallel, each from its own
// seed, and kept in tree order, so thread scheduling never changes the model.

use crate::tree::{normalize, RegressionTree, TreeParams};
use ndarray::{ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Candidate features tried at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxFeatures {
    /// `max(1, floor(sqrt(n_features)))`
    Sqrt,
    All,
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> Option<usize> {
        match self {
            MaxFeatures::Sqrt => Some(((n_features as f64).sqrt() as usize).max(1)),
            MaxFeatures::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 8,
            min_samples_split: 10,
            min_samples_leaf: 5,
            max_features: MaxFeatures::Sqrt,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Fit `n_estimators` trees, each on a bootstrap sample of the rows.
    /// Tree `t` draws from `ChaCha8Rng::seed_from_u64(seed + t)`.
    pub fn fit(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>, params: &ForestParams, seed: u64) -> Self {
        let n = x.nrows();
        let y = y.to_vec();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: params.max_features.resolve(x.ncols()),
        };

        let trees: Vec<RegressionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(t as u64));
                let samples: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, &y, &samples, &tree_params, &mut rng)
            })
            .collect();

        debug!(
            "forest: {} trees, mean {:.1} nodes",
            trees.len(),
            trees.iter().map(|t| t.n_nodes()).sum::<usize>() as f64 / trees.len().max(1) as f64
        );
        Self {
            trees,
            n_features: x.ncols(),
        }
    }

    /// Mean of the tree predictions.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        sum / self.trees.len() as f64
    }

    /// Mean of the per-tree normalized importances, renormalized.
    pub fn importances(&self) -> Vec<f64> {
        let mut acc = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (a, v) in acc.iter_mut().zip(tree.normalized_importances()) {
                *a += v;
            }
        }
        normalize(&acc)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((80, 4), |(i, j)| ((i * (j + 3)) % 17) as f64 + i as f64 * 0.01);
        let y = Array1::from_shape_fn(80, |i| x[[i, 0]] * 2.0 - x[[i, 2]]);
        (x, y)
    }

    fn small() -> ForestParams {
        ForestParams {
            n_estimators: 25,
            ..ForestParams::default()
        }
    }

    #[test]
    fn sqrt_feature_count() {
        assert_eq!(MaxFeatures::Sqrt.resolve(12), Some(3));
        assert_eq!(MaxFeatures::Sqrt.resolve(1), Some(1));
        assert_eq!(MaxFeatures::All.resolve(12), None);
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = data();
        let a = RandomForest::fit(x.view(), y.view(), &small(), 42);
        let b = RandomForest::fit(x.view(), y.view(), &small(), 42);
        assert_eq!(a, b);
        assert_eq!(a.n_trees(), 25);
    }

    #[test]
    fn fits_better_than_the_mean() {
        let (x, y) = data();
        let forest = RandomForest::fit(x.view(), y.view(), &small(), 7);
        let mean = y.mean().unwrap();
        let mut sse_model = 0.0;
        let mut sse_mean = 0.0;
        for (row, &t) in x.rows().into_iter().zip(y.iter()) {
            sse_model += (forest.predict_row(row) - t).powi(2);
            sse_mean += (mean - t).powi(2);
        }
        assert!(sse_model < sse_mean * 0.6);
    }

    #[test]
    fn importances_sum_to_one() {
        let (x, y) = data();
        let forest = RandomForest::fit(x.view(), y.view(), &small(), 1);
        let imp = forest.importances();
        assert_eq!(imp.len(), 4);
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
