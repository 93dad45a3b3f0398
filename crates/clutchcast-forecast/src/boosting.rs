// Gradient-boosted regression trees on squared loss with row subsampling.

use crate::tree::{normalize, RegressionTree, TreeParams};
use ndarray::{ArrayView1, ArrayView2};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows each stage is fitted on, drawn without replacement.
    pub subsample: f64,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 150,
            max_depth: 6,
            learning_rate: 0.05,
            subsample: 0.8,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    stages: Vec<RegressionTree>,
    n_features: usize,
}

impl GradientBoosting {
    /// Start from the target mean, then fit each stage to the current
    /// residuals and add it damped by the learning rate.
    pub fn fit(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>, params: &BoostingParams, seed: u64) -> Self {
        let n = x.nrows();
        let init = y.mean().unwrap_or(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: None,
        };
        let n_sub = ((params.subsample * n as f64) as usize).clamp(n.min(1), n);

        let mut current = vec![init; n];
        let mut residuals = vec![0.0; n];
        let mut stages = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            for ((r, &t), &c) in residuals.iter_mut().zip(y.iter()).zip(&current) {
                *r = t - c;
            }
            let mut rows = if n_sub < n {
                sample(&mut rng, n, n_sub).into_vec()
            } else {
                (0..n).collect()
            };
            rows.sort_unstable();

            let tree = RegressionTree::fit(x, &residuals, &rows, &tree_params, &mut rng);
            for (i, c) in current.iter_mut().enumerate() {
                *c += params.learning_rate * tree.predict_row(x.row(i));
            }
            stages.push(tree);
        }

        Self {
            init,
            learning_rate: params.learning_rate,
            stages,
            n_features: x.ncols(),
        }
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.init
            + self
                .stages
                .iter()
                .map(|t| self.learning_rate * t.predict_row(row))
                .sum::<f64>()
    }

    /// Summed squared-error reductions across stages, normalized.
    pub fn importances(&self) -> Vec<f64> {
        let mut acc = vec![0.0; self.n_features];
        for stage in &self.stages {
            for (a, v) in acc.iter_mut().zip(stage.raw_importances()) {
                *a += v;
            }
        }
        normalize(&acc)
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((60, 3), |(i, j)| ((i * (j + 2)) % 13) as f64);
        let y = Array1::from_shape_fn(60, |i| 3.0 * x[[i, 1]] + 1.0);
        (x, y)
    }

    fn mse(model: &GradientBoosting, x: &Array2<f64>, y: &Array1<f64>) -> f64 {
        x.rows()
            .into_iter()
            .zip(y.iter())
            .map(|(row, &t)| (model.predict_row(row) - t).powi(2))
            .sum::<f64>()
            / y.len() as f64
    }

    #[test]
    fn zero_stages_predicts_the_mean() {
        let (x, y) = data();
        let params = BoostingParams {
            n_estimators: 0,
            ..BoostingParams::default()
        };
        let model = GradientBoosting::fit(x.view(), y.view(), &params, 42);
        assert_eq!(model.predict_row(x.row(0)), y.mean().unwrap());
    }

    #[test]
    fn more_stages_reduce_training_error() {
        let (x, y) = data();
        let few = BoostingParams {
            n_estimators: 5,
            ..BoostingParams::default()
        };
        let many = BoostingParams {
            n_estimators: 80,
            ..BoostingParams::default()
        };
        let a = GradientBoosting::fit(x.view(), y.view(), &few, 42);
        let b = GradientBoosting::fit(x.view(), y.view(), &many, 42);
        assert_eq!(b.n_stages(), 80);
        assert!(mse(&b, &x, &y) < mse(&a, &x, &y));
    }

    #[test]
    fn deterministic_for_a_seed_and_credits_signal_feature() {
        let (x, y) = data();
        let params = BoostingParams {
            n_estimators: 20,
            ..BoostingParams::default()
        };
        let a = GradientBoosting::fit(x.view(), y.view(), &params, 9);
        let b = GradientBoosting::fit(x.view(), y.view(), &params, 9);
        assert_eq!(a, b);
        let imp = a.importances();
        assert!(imp[1] > imp[0] && imp[1] > imp[2]);
    }
}
