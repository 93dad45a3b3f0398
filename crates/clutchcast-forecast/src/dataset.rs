// Training-set construction: eligibility filter, IQR outlier filter, matrices.

use crate::features::{FeatureRow, N_FEATURES};
use clutchcast_core::stats::quantile;
use ndarray::{Array1, Array2};
use tracing::info;

/// Inclusive bounds on the target kept by the IQR filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetBounds {
    pub lower: f64,
    pub upper: f64,
}

impl TargetBounds {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower && v <= self.upper
    }
}

/// Bounds `[Q1 - m*IQR, Q3 + m*IQR]` with linearly interpolated quartiles.
pub fn iqr_bounds(targets: &[f64], multiplier: f64) -> Option<TargetBounds> {
    let q1 = quantile(targets, 0.25)?;
    let q3 = quantile(targets, 0.75)?;
    let iqr = q3 - q1;
    Some(TargetBounds {
        lower: q1 - multiplier * iqr,
        upper: q3 + multiplier * iqr,
    })
}

/// Rows eligible for training, in feature-engineering order.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub features: Array2<f64>,
    pub targets: Array1<f64>,
    pub bounds: Option<TargetBounds>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Keep rows with at least `min_clutch_games` clutch games, a target, and
/// every feature present, then drop target outliers outside the IQR fence
/// computed on those rows.
pub fn build_training_set(
    rows: &[FeatureRow<'_>],
    min_clutch_games: u32,
    iqr_multiplier: f64,
) -> TrainingSet {
    let eligible: Vec<(&FeatureRow<'_>, f64)> = rows
        .iter()
        .filter(|r| r.record.gp_clutch() >= min_clutch_games && r.is_complete())
        .filter_map(|r| r.target.filter(|t| t.is_finite()).map(|t| (r, t)))
        .collect();

    let targets: Vec<f64> = eligible.iter().map(|(_, t)| *t).collect();
    let bounds = iqr_bounds(&targets, iqr_multiplier);
    let kept: Vec<&(&FeatureRow<'_>, f64)> = eligible
        .iter()
        .filter(|(_, t)| bounds.map_or(true, |b| b.contains(*t)))
        .collect();

    let mut flat = Vec::with_capacity(kept.len() * N_FEATURES);
    for (row, _) in &kept {
        flat.extend_from_slice(&row.features);
    }
    let features = Array2::from_shape_vec((kept.len(), N_FEATURES), flat)
        .unwrap_or_else(|_| Array2::zeros((0, N_FEATURES)));
    let targets: Array1<f64> = kept.iter().map(|(_, t)| *t).collect();

    if let Some(b) = bounds {
        info!(
            "training set: {} eligible rows, {} after IQR filter [{:.4}, {:.4}]",
            eligible.len(),
            targets.len(),
            b.lower,
            b.upper
        );
    }
    TrainingSet {
        features,
        targets,
        bounds,
    }
}
