// Raw CSV source loading: games, box scores, and teams.
//
// Column names follow the public NBA games dataset. Unknown columns are
// ignored. Rows that fail to deserialize are skipped with a warning; numeric
// stat cells that do not parse become 0.

use crate::ingest::parse_stat;
use crate::raw::{CountingStats, RawBoxScoreRow, RawGameRecord, RawTables, TeamInfo};
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const GAMES_FILE: &str = "games.csv";
pub const BOX_SCORES_FILE: &str = "games_details.csv";
pub const TEAMS_FILE: &str = "teams.csv";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("missing input source `{source_name}`: {path} not found")]
    MissingInput { source_name: String, path: PathBuf },

    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawGameCsv {
    #[serde(default)]
    GAME_DATE_EST: Option<String>,
    GAME_ID: u64,
    SEASON: i32,
    HOME_TEAM_ID: u64,
    VISITOR_TEAM_ID: u64,
    #[serde(default)]
    PTS_home: Option<f64>,
    #[serde(default)]
    PTS_away: Option<f64>,
    #[serde(default)]
    HOME_TEAM_WINS: Option<f64>,
}

/// Box-score row. Stat cells stay strings so blanks and junk can be zeroed.
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawBoxScoreCsv {
    GAME_ID: u64,
    TEAM_ID: u64,
    PLAYER_ID: u64,
    #[serde(default)]
    PLAYER_NAME: String,
    #[serde(default)]
    MIN: Option<String>,
    #[serde(default)]
    FGM: Option<String>,
    #[serde(default)]
    FGA: Option<String>,
    #[serde(default)]
    FG3M: Option<String>,
    #[serde(default)]
    FG3A: Option<String>,
    #[serde(default)]
    FTM: Option<String>,
    #[serde(default)]
    FTA: Option<String>,
    #[serde(default)]
    OREB: Option<String>,
    #[serde(default)]
    DREB: Option<String>,
    #[serde(default)]
    REB: Option<String>,
    #[serde(default)]
    AST: Option<String>,
    #[serde(default)]
    STL: Option<String>,
    #[serde(default)]
    BLK: Option<String>,
    #[serde(default)]
    TO: Option<String>,
    #[serde(default)]
    PF: Option<String>,
    #[serde(default)]
    PTS: Option<String>,
    #[serde(default)]
    PLUS_MINUS: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawTeamCsv {
    TEAM_ID: u64,
    #[serde(default)]
    CITY: String,
    #[serde(default)]
    NICKNAME: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse the leading `YYYY-MM-DD` of a date cell.
fn parse_game_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn stat(cell: &Option<String>) -> f64 {
    parse_stat(cell.as_deref())
}

// ---------------------------------------------------------------------------
// Reader-based loaders
// ---------------------------------------------------------------------------

pub fn load_games_from_reader<R: Read>(rdr: R) -> Result<Vec<RawGameRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut games = Vec::new();
    for result in reader.deserialize::<RawGameCsv>() {
        match result {
            Ok(raw) => games.push(RawGameRecord {
                game_id: raw.GAME_ID,
                season: raw.SEASON,
                home_team_id: raw.HOME_TEAM_ID,
                visitor_team_id: raw.VISITOR_TEAM_ID,
                home_pts: raw.PTS_home,
                visitor_pts: raw.PTS_away,
                home_team_wins: raw.HOME_TEAM_WINS.is_some_and(|w| w >= 1.0),
                game_date: parse_game_date(raw.GAME_DATE_EST.as_deref()),
            }),
            Err(e) => {
                warn!("skipping malformed game row: {}", e);
            }
        }
    }
    Ok(games)
}

pub fn load_box_scores_from_reader<R: Read>(rdr: R) -> Result<Vec<RawBoxScoreRow>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawBoxScoreCsv>() {
        match result {
            Ok(raw) => rows.push(RawBoxScoreRow {
                game_id: raw.GAME_ID,
                team_id: raw.TEAM_ID,
                player_id: raw.PLAYER_ID,
                player_name: raw.PLAYER_NAME.trim().to_string(),
                stats: CountingStats {
                    fgm: stat(&raw.FGM),
                    fga: stat(&raw.FGA),
                    fg3m: stat(&raw.FG3M),
                    fg3a: stat(&raw.FG3A),
                    ftm: stat(&raw.FTM),
                    fta: stat(&raw.FTA),
                    oreb: stat(&raw.OREB),
                    dreb: stat(&raw.DREB),
                    reb: stat(&raw.REB),
                    ast: stat(&raw.AST),
                    stl: stat(&raw.STL),
                    blk: stat(&raw.BLK),
                    tov: stat(&raw.TO),
                    pf: stat(&raw.PF),
                    pts: stat(&raw.PTS),
                    plus_minus: stat(&raw.PLUS_MINUS),
                },
                minutes: raw.MIN,
            }),
            Err(e) => {
                warn!("skipping malformed box-score row: {}", e);
            }
        }
    }
    Ok(rows)
}

pub fn load_teams_from_reader<R: Read>(rdr: R) -> Result<Vec<TeamInfo>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut teams = Vec::new();
    for result in reader.deserialize::<RawTeamCsv>() {
        match result {
            Ok(raw) => teams.push(TeamInfo {
                team_id: raw.TEAM_ID,
                city: raw.CITY.trim().to_string(),
                nickname: raw.NICKNAME.trim().to_string(),
            }),
            Err(e) => {
                warn!("skipping malformed team row: {}", e);
            }
        }
    }
    Ok(teams)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(source_name: &str, path: &Path) -> Result<std::fs::File, IngestError> {
    if !path.exists() {
        return Err(IngestError::MissingInput {
            source_name: source_name.to_string(),
            path: path.to_path_buf(),
        });
    }
    std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> IngestError + '_ {
    move |e| IngestError::Csv {
        path: path.display().to_string(),
        source: e,
    }
}

/// Load all three sources from `raw_dir`.
///
/// Every source's presence is checked before any is read, so a missing file
/// fails the run up front.
pub fn load_raw_tables(raw_dir: &Path) -> Result<RawTables, IngestError> {
    let games_path = raw_dir.join(GAMES_FILE);
    let details_path = raw_dir.join(BOX_SCORES_FILE);
    let teams_path = raw_dir.join(TEAMS_FILE);

    for (name, path) in [
        ("games", &games_path),
        ("game_box_scores", &details_path),
        ("teams", &teams_path),
    ] {
        if !path.exists() {
            return Err(IngestError::MissingInput {
                source_name: name.to_string(),
                path: path.clone(),
            });
        }
    }

    let games = load_games_from_reader(open("games", &games_path)?).map_err(csv_err(&games_path))?;
    let box_scores = load_box_scores_from_reader(open("game_box_scores", &details_path)?)
        .map_err(csv_err(&details_path))?;
    let teams = load_teams_from_reader(open("teams", &teams_path)?).map_err(csv_err(&teams_path))?;

    if games.is_empty() {
        return Err(IngestError::Validation("games source produced zero valid rows".into()));
    }

    let first = games.iter().filter_map(|g| g.game_date).min();
    let last = games.iter().filter_map(|g| g.game_date).max();
    info!(
        "loaded {} games ({:?} to {:?}), {} box-score rows, {} teams",
        games.len(),
        first,
        last,
        box_scores.len(),
        teams.len()
    );

    Ok(RawTables {
        games,
        box_scores,
        teams,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
