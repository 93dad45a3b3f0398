// Descriptive statistics shared by the scoring and forecasting stages.

// ---------------------------------------------------------------------------
// Tier standardization
// ---------------------------------------------------------------------------

/// Standard deviations at or below this are treated as a constant column.
const STDEV_EPSILON: f64 = 1e-12;

/// Population mean and standard deviation of one CPI metric across a
/// scoring tier.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TierScale {
    pub mean: f64,
    pub stdev: f64,
}

impl TierScale {
    /// Fit on the finite values of `column` (N denominator). A column with
    /// no finite value fits to zero mean and zero spread.
    pub fn fit(column: &[f64]) -> Self {
        let finite: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Self::default();
        }
        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            stdev: variance.sqrt(),
        }
    }

    /// Standard score of `value`. Zero for a constant column or a
    /// non-finite value.
    pub fn z(&self, value: f64) -> f64 {
        if self.stdev <= STDEV_EPSILON || !value.is_finite() {
            return 0.0;
        }
        (value - self.mean) / self.stdev
    }

    /// Standard scores of a whole column against its own scale.
    pub fn standardize(column: &[f64]) -> Vec<f64> {
        let scale = Self::fit(column);
        column.iter().map(|&v| scale.z(v)).collect()
    }
}

// ---------------------------------------------------------------------------
// Location and spread
// ---------------------------------------------------------------------------

/// Arithmetic mean of the finite values, or `None` if there are none.
pub fn finite_mean(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    Some(finite.iter().sum::<f64>() / finite.len() as f64)
}

/// Replace every non-finite value with the mean of the finite ones.
///
/// A column with no finite value at all is filled with 0.0. Returns the
/// number of values replaced.
pub fn impute_non_finite(values: &mut [f64]) -> usize {
    let fill = finite_mean(values).unwrap_or(0.0);
    let mut replaced = 0;
    for v in values.iter_mut().filter(|v| !v.is_finite()) {
        *v = fill;
        replaced += 1;
    }
    replaced
}

/// Quantile with linear interpolation between closest ranks.
///
/// `q` is in `[0, 1]`. Non-finite values are ignored. Returns `None` for an
/// input with no finite values.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median of the finite values.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Sample standard deviation (N - 1 denominator). `None` below two values.
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    Some((ss / (n - 1.0)).sqrt())
}

/// Min-max normalize into `[0, 1]`.
///
/// When every value is identical the result is 0.5 for all of them.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == min {
        return vec![0.5; values.len()];
    }
    values.iter().map(|v| (v - min) / (max - min)).collect()
}

/// Divide, substituting 1 for a zero denominator.
pub fn guarded_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        numerator
    } else {
        numerator / denominator
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
