// Configuration loading and validation (clutchcast.toml).

use clutchcast_core::analysis::{
    LEADERBOARD_MIN_CLUTCH_GAMES, LEADERBOARD_SIZE, RANKING_MIN_CLUTCH_GAMES, TEAM_TOP_PLAYERS,
};
use clutchcast_core::classify::CLUTCH_MARGIN;
use clutchcast_core::cpi::CpiParams;
use clutchcast_core::pipeline::BuildParams;
use clutchcast_forecast::TrainParams;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const CONFIG_FILE: &str = "clutchcast.toml";

/// Files shipped in `defaults/` and seeded into `config/`.
const SEEDED_FILES: [&str; 1] = [CONFIG_FILE];

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub classifier: ClassifierConfig,
    pub cpi: CpiParams,
    pub model: TrainParams,
    pub analysis: AnalysisConfig,
    pub cache: CacheConfig,
}

impl Config {
    pub fn build_params(&self) -> BuildParams {
        BuildParams {
            clutch_margin: self.classifier.clutch_margin,
            cpi: self.cpi,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding games.csv, games_details.csv and teams.csv.
    pub raw_dir: PathBuf,
    /// Directory the processed tables, predictions and model report go to.
    pub processed_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub clutch_margin: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            clutch_margin: CLUTCH_MARGIN,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub ranking_min_clutch_games: u32,
    /// Floor for the season leaderboard and a team's top players.
    pub leaderboard_min_clutch_games: u32,
    pub leaderboard_size: usize,
    pub team_top_players: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            ranking_min_clutch_games: RANKING_MIN_CLUTCH_GAMES,
            leaderboard_min_clutch_games: LEADERBOARD_MIN_CLUTCH_GAMES,
            leaderboard_size: LEADERBOARD_SIZE,
            team_top_players: TEAM_TOP_PLAYERS,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Trained models kept in memory.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 4 }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/clutchcast.toml` relative to
/// `base_dir`. Does not copy defaults; prefer `load_config()`.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

/// Seed `config/` with any of clutchcast's files it lacks, copied from
/// `defaults/`. Files already in `config/` are never overwritten. Returns the
/// paths that were written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");
    let mut copied = Vec::new();

    for name in SEEDED_FILES {
        let target = config_dir.join(name);
        if target.is_file() {
            continue;
        }
        let source = defaults_dir.join(name);
        if !source.is_file() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "{} is missing and there is no {} to seed it from; \
                     run clutchcast from the project root",
                    target.display(),
                    source.display()
                ),
            });
        }

        std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", config_dir.display()),
        })?;
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!(
                "failed to copy {} to {}: {e}",
                source.display(),
                target.display()
            ),
        })?;
        info!("seeded {} from {}", target.display(), source.display());
        copied.push(target);
    }

    Ok(copied)
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let margin = config.classifier.clutch_margin;
    if !(margin.is_finite() && margin >= 0.0) {
        return Err(invalid(
            "classifier.clutch_margin",
            format!("must be a non-negative number, got {margin}"),
        ));
    }

    if config.cpi.min_clutch_games == 0 {
        return Err(invalid("cpi.min_clutch_games", "must be > 0"));
    }
    if !config.cpi.low_volume_floor.is_finite() {
        return Err(invalid("cpi.low_volume_floor", "must be a finite number"));
    }

    if config.model.min_clutch_games == 0 {
        return Err(invalid("model.min_clutch_games", "must be > 0"));
    }
    if let Err(clutchcast_forecast::ensemble::TrainError::InvalidParameter { field, message }) =
        config.model.validate()
    {
        return Err(ConfigError::ValidationError {
            field: format!("model.{field}"),
            message,
        });
    }

    if config.analysis.ranking_min_clutch_games == 0 {
        return Err(invalid("analysis.ranking_min_clutch_games", "must be > 0"));
    }
    if config.analysis.leaderboard_size == 0 {
        return Err(invalid("analysis.leaderboard_size", "must be > 0"));
    }
    if config.analysis.team_top_players == 0 {
        return Err(invalid("analysis.team_top_players", "must be > 0"));
    }

    if config.cache.capacity == 0 {
        return Err(invalid("cache.capacity", "must be > 0"));
    }

    Ok(())
}
