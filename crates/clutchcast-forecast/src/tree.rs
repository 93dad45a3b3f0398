// CART regression tree (squared-error splits) grown from training rows.
//
// Nodes are stored flat in pre-order. Traversal sends a value `<= threshold`
// or NaN to the left child.

use ndarray::{ArrayView1, ArrayView2};
use rand::seq::index::sample;
use rand::Rng;

/// Growth limits for one tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Candidate features drawn per split; `None` tries all of them.
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
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

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    /// Unnormalized squared-error reduction credited to each feature.
    importances: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Grower<'a, R: Rng> {
    x: ArrayView2<'a, f64>,
    y: &'a [f64],
    params: &'a TreeParams,
    rng: &'a mut R,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl<R: Rng> Grower<'_, R> {
    fn grow(&mut self, samples: &[usize], depth: usize) -> usize {
        let id = self.nodes.len();
        let n = samples.len() as f64;
        let sum: f64 = samples.iter().map(|&i| self.y[i]).sum();
        let mean = sum / n;
        self.nodes.push(Node::Leaf { value: mean });

        let p = self.params;
        if depth >= p.max_depth
            || samples.len() < p.min_samples_split
            || samples.len() < 2 * p.min_samples_leaf
        {
            return id;
        }

        let Some(best) = self.best_split(samples, sum) else {
            return id;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&i| self.x[[i, best.feature]] <= best.threshold);
        self.importances[best.feature] += best.gain;

        let left_id = self.grow(&left, depth + 1);
        let right_id = self.grow(&right, depth + 1);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: left_id,
            right: right_id,
        };
        id
    }

    /// Best split over the candidate features by squared-error reduction.
    /// Ties keep the first candidate found.
    fn best_split(&mut self, samples: &[usize], total: f64) -> Option<BestSplit> {
        let n_features = self.x.ncols();
        let candidates: Vec<usize> = match self.params.max_features {
            Some(k) if k < n_features => {
                let mut c = sample(&mut *self.rng, n_features, k.max(1)).into_vec();
                c.sort_unstable();
                c
            }
            _ => (0..n_features).collect(),
        };

        let n = samples.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_score = total * total / n as f64;
        let mut best: Option<BestSplit> = None;
        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in candidates {
            pairs.clear();
            pairs.extend(samples.iter().map(|&i| (self.x[[i, feature]], self.y[i])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for pos in 0..n - 1 {
                left_sum += pairs[pos].1;
                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let (lo, hi) = (pairs[pos].0, pairs[pos + 1].0);
                if lo >= hi || !lo.is_finite() || !hi.is_finite() {
                    continue;
                }
                let right_sum = total - left_sum;
                let score =
                    left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
                let gain = score - parent_score;
                if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: lo + (hi - lo) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

impl RegressionTree {
    /// Grow a tree on the rows listed in `samples` (repeats allowed).
    ///
    /// `y` is indexed by row, like `x`.
    pub fn fit<R: Rng>(
        x: ArrayView2<'_, f64>,
        y: &[f64],
        samples: &[usize],
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut grower = Grower {
            x: x.reborrow(),
            y,
            params,
            rng,
            nodes: Vec::new(),
            importances: vec![0.0; x.ncols()],
        };
        if samples.is_empty() {
            grower.nodes.push(Node::Leaf { value: 0.0 });
        } else {
            grower.grow(samples, 0);
        }
        Self {
            nodes: grower.nodes,
            importances: grower.importances,
        }
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = row[feature];
                    idx = if v.is_nan() || v <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn raw_importances(&self) -> &[f64] {
        &self.importances
    }

    /// Importances scaled to sum to 1 (all zero for a single-leaf tree).
    pub fn normalized_importances(&self) -> Vec<f64> {
        normalize(&self.importances)
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

pub(crate) fn normalize(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter().map(|v| v / total).collect()
    } else {
        vec![0.0; values.len()]
    }
}
