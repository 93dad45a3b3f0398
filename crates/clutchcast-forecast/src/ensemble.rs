// Blended next-season CPI model: robust scaling, F-test selection, and a
// fixed-weight blend of a bagged forest, boosted trees, and ridge.

use crate::boosting::{BoostingParams, GradientBoosting};
use crate::dataset::{build_training_set, TrainingSet};
use crate::features::{engineer_features, Feature};
use crate::forest::{ForestParams, RandomForest};
use crate::metrics::{mean_absolute_error, r2_score, root_mean_squared_error, ModelMetrics};
use crate::preprocess::{FeatureSelector, RobustScaler};
use crate::ridge::{RidgeParams, RidgeRegression};
use crate::split::stratified_split;
use clutchcast_core::record::PlayerSeasonRecord;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("invalid training parameter `{field}`: {message}")]
    InvalidParameter { field: String, message: String },
}

fn invalid(field: &str, message: impl Into<String>) -> TrainError {
    TrainError::InvalidParameter {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Members and weights
// ---------------------------------------------------------------------------

/// A fitted regressor over the selected, scaled features.
pub trait Regressor: Send + Sync {
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64;

    /// Non-negative importance per input column.
    fn importances(&self) -> Vec<f64>;
}

impl Regressor for RandomForest {
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        RandomForest::predict_row(self, row)
    }

    fn importances(&self) -> Vec<f64> {
        RandomForest::importances(self)
    }
}

impl Regressor for GradientBoosting {
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        GradientBoosting::predict_row(self, row)
    }

    fn importances(&self) -> Vec<f64> {
        GradientBoosting::importances(self)
    }
}

impl Regressor for RidgeRegression {
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        RidgeRegression::predict_row(self, row)
    }

    /// Absolute coefficients.
    fn importances(&self) -> Vec<f64> {
        self.coefficients().iter().map(|c| c.abs()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Member {
    Forest,
    Boosting,
    Ridge,
}

impl Member {
    pub const ALL: [Member; 3] = [Member::Forest, Member::Boosting, Member::Ridge];

    pub fn name(self) -> &'static str {
        match self {
            Member::Forest => "forest",
            Member::Boosting => "boosting",
            Member::Ridge => "ridge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendWeights {
    pub forest: f64,
    pub boosting: f64,
    pub ridge: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            forest: 0.5,
            boosting: 0.3,
            ridge: 0.2,
        }
    }
}

impl BlendWeights {
    const SUM_TOLERANCE: f64 = 1e-9;

    pub fn get(&self, member: Member) -> f64 {
        match member {
            Member::Forest => self.forest,
            Member::Boosting => self.boosting,
            Member::Ridge => self.ridge,
        }
    }

    pub fn total(&self) -> f64 {
        self.forest + self.boosting + self.ridge
    }

    /// Weights are non-negative and sum to 1.
    pub fn validate(&self) -> Result<(), TrainError> {
        for member in Member::ALL {
            let w = self.get(member);
            if !(w.is_finite() && w >= 0.0) {
                return Err(invalid(
                    &format!("blend.{}", member.name()),
                    format!("weight must be a non-negative number, got {w}"),
                ));
            }
        }
        if (self.total() - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(invalid(
                "blend",
                format!("weights must sum to 1.0, got {}", self.total()),
            ));
        }
        Ok(())
    }

    /// Drop `member` and rescale the others to sum to 1.
    pub fn without(&self, member: Member) -> BlendWeights {
        let mut w = *self;
        match member {
            Member::Forest => w.forest = 0.0,
            Member::Boosting => w.boosting = 0.0,
            Member::Ridge => w.ridge = 0.0,
        }
        let total = w.total();
        if total > 0.0 {
            w.forest /= total;
            w.boosting /= total;
            w.ridge /= total;
        }
        w
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainParams {
    pub seed: u64,
    pub min_training_rows: usize,
    pub min_clutch_games: u32,
    pub test_fraction: f64,
    pub stratify_bins: usize,
    pub select_k: usize,
    pub iqr_multiplier: f64,
    pub forest: ForestParams,
    pub boosting: BoostingParams,
    pub ridge: RidgeParams,
    pub blend: BlendWeights,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            seed: 42,
            min_training_rows: 100,
            min_clutch_games: 5,
            test_fraction: 0.25,
            stratify_bins: 5,
            select_k: 12,
            iqr_multiplier: 1.5,
            forest: ForestParams::default(),
            boosting: BoostingParams::default(),
            ridge: RidgeParams::default(),
            blend: BlendWeights::default(),
        }
    }
}

impl TrainParams {
    pub fn validate(&self) -> Result<(), TrainError> {
        self.blend.validate()?;
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(invalid("test_fraction", "must be in (0, 1)"));
        }
        if self.select_k == 0 {
            return Err(invalid("select_k", "must be greater than 0"));
        }
        if self.stratify_bins == 0 {
            return Err(invalid("stratify_bins", "must be greater than 0"));
        }
        if !(self.iqr_multiplier.is_finite() && self.iqr_multiplier >= 0.0) {
            return Err(invalid("iqr_multiplier", "must be a non-negative number"));
        }
        if self.forest.n_estimators == 0 {
            return Err(invalid("forest.n_estimators", "must be greater than 0"));
        }
        if self.forest.min_samples_leaf == 0 {
            return Err(invalid("forest.min_samples_leaf", "must be greater than 0"));
        }
        if self.boosting.n_estimators == 0 {
            return Err(invalid("boosting.n_estimators", "must be greater than 0"));
        }
        if self.boosting.min_samples_leaf == 0 {
            return Err(invalid("boosting.min_samples_leaf", "must be greater than 0"));
        }
        if !(self.boosting.learning_rate > 0.0 && self.boosting.learning_rate <= 1.0) {
            return Err(invalid("boosting.learning_rate", "must be in (0, 1]"));
        }
        if !(self.boosting.subsample > 0.0 && self.boosting.subsample <= 1.0) {
            return Err(invalid("boosting.subsample", "must be in (0, 1]"));
        }
        if !(self.ridge.alpha.is_finite() && self.ridge.alpha > 0.0) {
            return Err(invalid("ridge.alpha", "must be greater than 0"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Trained blend plus the scaler and selector it was fitted with. Immutable.
pub struct EnsembleModel {
    scaler: RobustScaler,
    selector: FeatureSelector,
    members: Vec<(Member, Box<dyn Regressor>)>,
    weights: BlendWeights,
}

impl std::fmt::Debug for EnsembleModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleModel")
            .field("members", &self.members.iter().map(|(m, _)| m).collect::<Vec<_>>())
            .field("weights", &self.weights)
            .field("selected", &self.selector.selected())
            .finish()
    }
}

impl EnsembleModel {
    pub fn weights(&self) -> BlendWeights {
        self.weights
    }

    /// Features kept by the selector, in column order.
    pub fn selected_features(&self) -> Vec<Feature> {
        self.selector
            .selected()
            .iter()
            .filter_map(|&i| Feature::ALL.get(i).copied())
            .collect()
    }

    /// F statistic of each selected feature on the training split, in
    /// column order.
    pub fn selection_scores(&self) -> Vec<(Feature, f64)> {
        let scores = self.selector.scores();
        self.selector
            .selected()
            .iter()
            .filter_map(|&i| Some((*Feature::ALL.get(i)?, *scores.get(i)?)))
            .collect()
    }

    /// Scale with the fitted scaler, then keep the selected columns.
    fn prepare(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        self.selector.transform(self.scaler.transform(x).view())
    }

    /// Weighted mean of member predictions, normalized by the total weight
    /// of the members used.
    fn blend(&self, prepared: ArrayView2<'_, f64>, weights: &BlendWeights) -> Vec<f64> {
        let total = weights.total();
        prepared
            .axis_iter(Axis(0))
            .map(|row| {
                let sum: f64 = self
                    .members
                    .iter()
                    .map(|(member, model)| {
                        let w = weights.get(*member);
                        if w == 0.0 {
                            0.0
                        } else {
                            w * model.predict_row(row)
                        }
                    })
                    .sum();
                if total > 0.0 {
                    sum / total
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Blended predictions for unscaled rows with every engineered feature.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        self.blend(self.prepare(x).view(), &self.weights)
    }

    /// Predictions with `member` removed and the remaining weights rescaled.
    pub fn predict_without(&self, member: Member, x: ArrayView2<'_, f64>) -> Vec<f64> {
        self.blend(self.prepare(x).view(), &self.weights.without(member))
    }

    /// Per selected feature: forest and boosting importances plus absolute
    /// ridge coefficients, each scaled by its blend weight. Highest first.
    pub fn feature_importances(&self) -> Vec<(Feature, f64)> {
        let selected = self.selected_features();
        let mut totals = vec![0.0; selected.len()];
        for (member, model) in &self.members {
            let w = self.weights.get(*member);
            for (t, v) in totals.iter_mut().zip(model.importances()) {
                *t += w * v;
            }
        }
        let mut out: Vec<(Feature, f64)> = selected.into_iter().zip(totals).collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        out
    }
}

// ---------------------------------------------------------------------------
// Training
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum TrainOutcome {
    Trained {
        model: EnsembleModel,
        metrics: ModelMetrics,
    },
    /// Too few usable rows after filtering. Not an error: callers check it.
    Unavailable { usable_rows: usize, required: usize },
}

impl TrainOutcome {
    pub fn model(&self) -> Option<&EnsembleModel> {
        match self {
            TrainOutcome::Trained { model, .. } => Some(model),
            TrainOutcome::Unavailable { .. } => None,
        }
    }

    pub fn metrics(&self) -> Option<&ModelMetrics> {
        match self {
            TrainOutcome::Trained { metrics, .. } => Some(metrics),
            TrainOutcome::Unavailable { .. } => None,
        }
    }
}

/// Fit the blend on an engineered matrix and report held-out metrics.
pub fn fit_ensemble(set: &TrainingSet, params: &TrainParams) -> (EnsembleModel, ModelMetrics) {
    let y = set.targets.to_vec();
    let split = stratified_split(&y, params.test_fraction, params.stratify_bins, params.seed);

    let x_train = set.features.select(Axis(0), &split.train);
    let x_test = set.features.select(Axis(0), &split.test);
    let y_train = set.targets.select(Axis(0), &split.train);
    let y_test = set.targets.select(Axis(0), &split.test);

    let scaler = RobustScaler::fit(x_train.view());
    let k = params.select_k.min(x_train.ncols());
    let selector = FeatureSelector::fit(scaler.transform(x_train.view()).view(), y_train.view(), k);

    let model = {
        let train_sel = selector.transform(scaler.transform(x_train.view()).view());
        let forest = RandomForest::fit(train_sel.view(), y_train.view(), &params.forest, params.seed);
        let boosting =
            GradientBoosting::fit(train_sel.view(), y_train.view(), &params.boosting, params.seed);
        let ridge = RidgeRegression::fit(train_sel.view(), y_train.view(), &params.ridge);
        EnsembleModel {
            scaler,
            selector,
            members: vec![
                (Member::Forest, Box::new(forest) as Box<dyn Regressor>),
                (Member::Boosting, Box::new(boosting)),
                (Member::Ridge, Box::new(ridge)),
            ],
            weights: params.blend,
        }
    };

    let pred_train = model.predict(x_train.view());
    let pred_test = model.predict(x_test.view());
    let y_train = y_train.to_vec();
    let y_test = y_test.to_vec();
    let metrics = ModelMetrics {
        train_r2: r2_score(&y_train, &pred_train),
        test_r2: r2_score(&y_test, &pred_test),
        mae: mean_absolute_error(&y_test, &pred_test),
        rmse: root_mean_squared_error(&y_test, &pred_test),
        train_rows: y_train.len(),
        test_rows: y_test.len(),
    };
    (model, metrics)
}

/// Train the next-season CPI model on a multi-season player table.
///
/// Returns `Unavailable` when fewer than `min_training_rows` rows survive
/// the eligibility and outlier filters.
pub fn train_ensemble(
    table: &[PlayerSeasonRecord],
    params: &TrainParams,
) -> Result<TrainOutcome, TrainError> {
    params.validate()?;

    let rows = engineer_features(table);
    let set = build_training_set(&rows, params.min_clutch_games, params.iqr_multiplier);
    if set.len() < params.min_training_rows {
        warn!(
            "model unavailable: {} usable rows, {} required",
            set.len(),
            params.min_training_rows
        );
        return Ok(TrainOutcome::Unavailable {
            usable_rows: set.len(),
            required: params.min_training_rows,
        });
    }

    let (model, metrics) = fit_ensemble(&set, params);
    info!(
        "trained ensemble on {} rows ({} held out): train R2 {:.4}, test R2 {:.4}, MAE {:.4}, RMSE {:.4}",
        metrics.train_rows, metrics.test_rows, metrics.train_r2, metrics.test_r2, metrics.mae, metrics.rmse
    );
    Ok(TrainOutcome::Trained { model, metrics })
}
