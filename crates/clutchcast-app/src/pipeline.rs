// Orchestration: raw sources -> processed tables -> cached model -> predictions.

use crate::cache::{CacheKey, KeyedCache};
use crate::config::Config;
use clutchcast_core::pipeline::{build_player_season_table, build_team_season_table};
use clutchcast_core::record::PlayerSeasonRecord;
use clutchcast_core::source::{load_raw_tables, IngestError};
use clutchcast_core::table::{
    player_table_bytes, read_player_table_file, read_team_table_file, write_tables, TableError,
    PLAYER_TABLE_FILE, TEAM_TABLE_FILE,
};
use clutchcast_core::team::TeamSeasonRecord;
use clutchcast_forecast::ensemble::{BlendWeights, TrainError};
use clutchcast_forecast::metrics::ModelMetrics;
use clutchcast_forecast::{predict, train_ensemble, Prediction, TrainOutcome};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const MODEL_REPORT_FILE: &str = "model_report.json";

const PREDICTION_COLUMNS: [&str; 5] = ["player_id", "player_name", "team_name", "season", "predicted_cpi"];

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Train(#[from] TrainError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PipelineError + '_ {
    move |e| PipelineError::Io {
        path: path.to_path_buf(),
        source: e,
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Both processed tables, as written to disk.
#[derive(Debug, Clone)]
pub struct BuiltTables {
    pub players: Vec<PlayerSeasonRecord>,
    pub teams: Vec<TeamSeasonRecord>,
}

/// A trained (or unavailable) model plus the key it is cached under.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub key: CacheKey,
    pub outcome: Arc<TrainOutcome>,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Forecast {
    Ranked(Vec<Prediction>),
    /// No model could be trained; nothing was predicted.
    Unavailable { usable_rows: usize, required: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportance {
    pub feature: &'static str,
    pub importance: f64,
}

/// F statistic a selected feature scored during selection.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionScore {
    pub feature: &'static str,
    pub f_score: f64,
}

/// What `model_report.json` holds.
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub model_key: String,
    pub metrics: ModelMetrics,
    pub blend_weights: BlendWeights,
    pub selected_features: Vec<&'static str>,
    pub selection_scores: Vec<SelectionScore>,
    pub feature_importances: Vec<FeatureImportance>,
}

impl ModelReport {
    /// `None` when the outcome has no model.
    pub fn from_model(model: &TrainedModel) -> Option<Self> {
        let TrainOutcome::Trained { model: ensemble, metrics } = model.outcome.as_ref() else {
            return None;
        };
        Some(ModelReport {
            model_key: model.key.to_string(),
            metrics: *metrics,
            blend_weights: ensemble.weights(),
            selected_features: ensemble.selected_features().iter().map(|f| f.name()).collect(),
            selection_scores: ensemble
                .selection_scores()
                .into_iter()
                .map(|(feature, f_score)| SelectionScore {
                    feature: feature.name(),
                    f_score,
                })
                .collect(),
            feature_importances: ensemble
                .feature_importances()
                .into_iter()
                .map(|(feature, importance)| FeatureImportance {
                    feature: feature.name(),
                    importance,
                })
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    config: Config,
    models: KeyedCache<TrainOutcome>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let models = KeyedCache::new(config.cache.capacity);
        Self { config, models }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn processed_dir(&self) -> &Path {
        &self.config.data.processed_dir
    }

    /// Build both tables from the raw sources in `raw_dir` and write them to
    /// the processed directory. Nothing is written unless both tables build.
    pub fn build(&self, raw_dir: &Path) -> Result<BuiltTables, PipelineError> {
        let raw = load_raw_tables(raw_dir)?;
        let params = self.config.build_params();
        let players = build_player_season_table(&raw, &params);
        let teams = build_team_season_table(&raw, &params);

        write_tables(self.processed_dir(), &players, &teams)?;
        info!(
            "wrote {} player-season and {} team-season rows to {}",
            players.len(),
            teams.len(),
            self.processed_dir().display()
        );
        Ok(BuiltTables { players, teams })
    }

    /// The player-season table from the processed directory.
    pub fn load_player_table(&self) -> Result<Vec<PlayerSeasonRecord>, PipelineError> {
        let path = self.processed_dir().join(PLAYER_TABLE_FILE);
        let table = read_player_table_file(&path)?;
        debug!("read {} player-season rows from {}", table.len(), path.display());
        Ok(table)
    }

    /// The team-season table from the processed directory.
    pub fn load_team_table(&self) -> Result<Vec<TeamSeasonRecord>, PipelineError> {
        let path = self.processed_dir().join(TEAM_TABLE_FILE);
        let table = read_team_table_file(&path)?;
        debug!("read {} team-season rows from {}", table.len(), path.display());
        Ok(table)
    }

    /// Key for a model trained on `table` with the configured parameters.
    pub fn model_key(&self, table: &[PlayerSeasonRecord]) -> Result<CacheKey, PipelineError> {
        let table_bytes = player_table_bytes(table)?;
        let params = serde_json::to_vec(&self.config.model).map_err(|e| PipelineError::Encode {
            path: PathBuf::from("model parameters"),
            message: e.to_string(),
        })?;
        Ok(CacheKey::from_parts(&[table_bytes.as_slice(), params.as_slice()]))
    }

    /// Train on `table`, reusing a cached model for identical table and
    /// parameters.
    pub fn train(&mut self, table: &[PlayerSeasonRecord]) -> Result<TrainedModel, PipelineError> {
        let key = self.model_key(table)?;
        let params = self.config.model;
        let (outcome, cache_hit) = self
            .models
            .get_or_insert_with(key, || train_ensemble(table, &params))?;
        if cache_hit {
            info!("model cache hit for {}", key);
        } else {
            info!("model cache miss for {}; trained a new model", key);
        }
        Ok(TrainedModel {
            key,
            outcome,
            cache_hit,
        })
    }

    /// Rank `season`'s players by predicted next-season CPI.
    pub fn predict(
        &mut self,
        table: &[PlayerSeasonRecord],
        season: i32,
    ) -> Result<Forecast, PipelineError> {
        let trained = self.train(table)?;
        Ok(match trained.outcome.as_ref() {
            TrainOutcome::Trained { model, .. } => Forecast::Ranked(predict(model, table, season)),
            TrainOutcome::Unavailable {
                usable_rows,
                required,
            } => Forecast::Unavailable {
                usable_rows: *usable_rows,
                required: *required,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

pub fn predictions_file_name(season: i32) -> String {
    format!("predictions_{season}.csv")
}

/// Write `predictions` as `predictions_<season>.csv` under `dir`. The header
/// is written even when there are no predictions.
pub fn write_predictions(
    dir: &Path,
    season: i32,
    predictions: &[Prediction],
) -> Result<PathBuf, PipelineError> {
    let path = dir.join(predictions_file_name(season));
    let encode = |e: csv::Error| PipelineError::Encode {
        path: path.clone(),
        message: e.to_string(),
    };

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(PREDICTION_COLUMNS).map_err(encode)?;
    for p in predictions {
        wtr.write_record(&[
            p.player_id.to_string(),
            p.player_name.clone(),
            p.team_name.clone(),
            p.season.to_string(),
            p.predicted_cpi.to_string(),
        ])
        .map_err(encode)?;
    }
    let bytes = wtr.into_inner().map_err(|e| PipelineError::Encode {
        path: path.clone(),
        message: e.to_string(),
    })?;

    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    std::fs::write(&path, bytes).map_err(io_err(&path))?;
    Ok(path)
}

pub fn write_model_report(dir: &Path, report: &ModelReport) -> Result<PathBuf, PipelineError> {
    let path = dir.join(MODEL_REPORT_FILE);
    let json = serde_json::to_string_pretty(report).map_err(|e| PipelineError::Encode {
        path: path.clone(),
        message: e.to_string(),
    })?;
    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    std::fs::write(&path, json).map_err(io_err(&path))?;
    Ok(path)
}
