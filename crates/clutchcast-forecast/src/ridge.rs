// L2-regularized linear regression with an unpenalized intercept.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RidgeParams {
    pub alpha: f64,
}

impl Default for RidgeParams {
    fn default() -> Self {
        Self { alpha: 10.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RidgeRegression {
    coef: Array1<f64>,
    intercept: f64,
}

impl RidgeRegression {
    /// Solve `(XcᵀXc + αI) w = Xcᵀyc` on centered data.
    pub fn fit(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>, params: &RidgeParams) -> Self {
        let p = x.ncols();
        let (Some(x_mean), Some(y_mean)) = (x.mean_axis(Axis(0)), y.mean()) else {
            return Self {
                coef: Array1::zeros(p),
                intercept: 0.0,
            };
        };
        let xc = &x - &x_mean;
        let yc = &y - y_mean;

        let mut gram = xc.t().dot(&xc);
        for i in 0..p {
            gram[[i, i]] += params.alpha;
        }
        let rhs = xc.t().dot(&yc);
        let coef = cholesky_solve(gram, rhs).unwrap_or_else(|| Array1::zeros(p));
        let intercept = y_mean - x_mean.dot(&coef);
        Self { coef, intercept }
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.intercept + row.dot(&self.coef)
    }

    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coef.view()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

/// Solve `a x = b` for symmetric positive-definite `a`.
/// `None` if `a` is not positive definite.
fn cholesky_solve(a: Array2<f64>, b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    // Forward: L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }
    // Backward: Lᵀ x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in i + 1..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    Some(x)
}
