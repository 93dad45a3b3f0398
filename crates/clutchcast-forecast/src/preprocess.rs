// Feature preprocessing fitted on training rows only: robust scaling and
// univariate F-test selection.

use clutchcast_core::stats::quantile;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

// ---------------------------------------------------------------------------
// Robust scaler
// ---------------------------------------------------------------------------

/// Centers each column on its median and scales by its interquartile range.
#[derive(Debug, Clone, PartialEq)]
pub struct RobustScaler {
    center: Array1<f64>,
    scale: Array1<f64>,
}

impl RobustScaler {
    /// A column with zero IQR is only centered.
    pub fn fit(x: ArrayView2<'_, f64>) -> Self {
        let mut center = Array1::zeros(x.ncols());
        let mut scale = Array1::ones(x.ncols());
        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let values = column.to_vec();
            let (Some(q1), Some(q2), Some(q3)) = (
                quantile(&values, 0.25),
                quantile(&values, 0.5),
                quantile(&values, 0.75),
            ) else {
                continue;
            };
            center[j] = q2;
            if q3 - q1 > 0.0 {
                scale[j] = q3 - q1;
            }
        }
        Self { center, scale }
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = x.to_owned();
        for mut row in out.axis_iter_mut(Axis(0)) {
            row -= &self.center;
            row /= &self.scale;
        }
        out
    }

    pub fn n_features(&self) -> usize {
        self.center.len()
    }
}

// ---------------------------------------------------------------------------
// F-test selector
// ---------------------------------------------------------------------------

/// Univariate linear-regression F statistic of each column against `y`.
///
/// A constant column scores negative infinity.
pub fn f_regression(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Vec<f64> {
    let n = y.len() as f64;
    let y_mean = y.mean().unwrap_or(0.0);
    let yc: Array1<f64> = y.mapv(|v| v - y_mean);
    let y_ss = yc.dot(&yc);

    x.axis_iter(Axis(1))
        .map(|column| {
            let x_mean = column.mean().unwrap_or(0.0);
            let xc: Array1<f64> = column.mapv(|v| v - x_mean);
            let x_ss = xc.dot(&xc);
            if x_ss <= f64::EPSILON || y_ss <= f64::EPSILON || n < 3.0 {
                return f64::NEG_INFINITY;
            }
            let r = xc.dot(&yc) / (x_ss * y_ss).sqrt();
            let r2 = (r * r).min(1.0);
            if r2 >= 1.0 {
                f64::INFINITY
            } else {
                r2 / (1.0 - r2) * (n - 2.0)
            }
        })
        .collect()
}

/// Keeps the `k` columns with the highest F statistic, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSelector {
    selected: Vec<usize>,
    scores: Vec<f64>,
}

impl FeatureSelector {
    /// Ties go to the lower column index.
    pub fn fit(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>, k: usize) -> Self {
        let scores = f_regression(x, y);
        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
        let mut selected: Vec<usize> = ranked.into_iter().take(k.min(scores.len())).collect();
        selected.sort_unstable();
        Self { selected, scores }
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        x.select(Axis(1), &self.selected)
    }

    /// Indices of the kept columns, ascending.
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }
}
