// Processed-table CSV codec.
//
// The wide layout (`<STAT>_clutch`, `<STAT>_non_clutch`, `*_diff`, `CPI`) is
// what the presentation layer reads. Floats use Rust's shortest round-trip
// formatting, so identical tables serialize to identical bytes.

use crate::raw::CountingStats;
use crate::record::{Differentials, PlayerSeasonRecord, RateLine, Regime, Split, SplitLine};
use crate::team::{TeamSeasonRecord, TeamSplit};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

pub const PLAYER_TABLE_FILE: &str = "player_performance.csv";
pub const TEAM_TABLE_FILE: &str = "team_performance.csv";

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("missing column `{0}`")]
    MissingColumn(String),

    #[error("bad value `{value}` in column `{column}`")]
    BadValue { column: String, value: String },
}

fn col(stat: &str, regime: Regime) -> String {
    format!("{stat}_{}", regime.suffix())
}

// ---------------------------------------------------------------------------
// Player table
// ---------------------------------------------------------------------------

pub fn player_table_header() -> Vec<String> {
    let mut header: Vec<String> = ["PLAYER_ID", "PLAYER_NAME", "TEAM_NAME", "SEASON"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for regime in Regime::ALL {
        header.extend(CountingStats::FIELDS.iter().map(|f| col(f, regime)));
        header.push(col("MIN", regime));
        header.push(col("GP", regime));
        header.extend(RateLine::FIELDS.iter().map(|f| col(f, regime)));
    }
    header.extend(
        ["FG_PCT_diff", "PPG_diff", "AST_TO_RATIO_diff", "CPI"]
            .iter()
            .map(|s| s.to_string()),
    );
    header
}

fn player_row(r: &PlayerSeasonRecord) -> Vec<String> {
    let mut row = vec![
        r.player_id.to_string(),
        r.player_name.clone(),
        r.team_name.clone(),
        r.season.to_string(),
    ];
    for regime in Regime::ALL {
        let line = r.splits.get(regime);
        row.extend(line.totals.values().iter().map(f64::to_string));
        row.push(line.minutes.to_string());
        row.push(line.games.to_string());
        row.extend(line.rates.values().iter().map(f64::to_string));
    }
    row.push(r.diff.fg_pct.to_string());
    row.push(r.diff.ppg.to_string());
    row.push(r.diff.ast_to_ratio.to_string());
    row.push(r.cpi.to_string());
    row
}

pub fn write_player_table<W: Write>(out: W, records: &[PlayerSeasonRecord]) -> Result<(), TableError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(player_table_header())?;
    for r in records {
        writer.write_record(player_row(r))?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Serialize to an in-memory CSV buffer.
pub fn player_table_bytes(records: &[PlayerSeasonRecord]) -> Result<Vec<u8>, TableError> {
    let mut buf = Vec::new();
    write_player_table(&mut buf, records)?;
    Ok(buf)
}

pub fn read_player_table<R: Read>(input: R) -> Result<Vec<PlayerSeasonRecord>, TableError> {
    let mut reader = csv::Reader::from_reader(input);
    let columns = ColumnIndex::new(reader.headers()?);
    let mut records = Vec::new();

    for result in reader.records() {
        let row = result?;
        let cells = Cells {
            columns: &columns,
            row: &row,
        };

        let mut splits: Split<SplitLine> = Split::default();
        for regime in Regime::ALL {
            let mut totals = [0.0; 16];
            for (slot, f) in totals.iter_mut().zip(CountingStats::FIELDS) {
                *slot = cells.parse(&col(f, regime))?;
            }
            let mut rates = [0.0; 9];
            for (slot, f) in rates.iter_mut().zip(RateLine::FIELDS) {
                *slot = cells.parse(&col(f, regime))?;
            }
            *splits.get_mut(regime) = SplitLine {
                totals: CountingStats::from_values(totals),
                minutes: cells.parse(&col("MIN", regime))?,
                games: cells.parse(&col("GP", regime))?,
                rates: RateLine::from_values(rates),
            };
        }

        records.push(PlayerSeasonRecord {
            player_id: cells.parse("PLAYER_ID")?,
            player_name: cells.text("PLAYER_NAME")?.to_string(),
            team_name: cells.text("TEAM_NAME")?.to_string(),
            season: cells.parse("SEASON")?,
            splits,
            diff: Differentials {
                ppg: cells.parse("PPG_diff")?,
                fg_pct: cells.parse("FG_PCT_diff")?,
                ast_to_ratio: cells.parse("AST_TO_RATIO_diff")?,
            },
            cpi: cells.parse("CPI")?,
        });
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Team table
// ---------------------------------------------------------------------------

pub fn team_table_header() -> Vec<String> {
    let mut header = vec!["TEAM_ID".to_string(), "SEASON".to_string()];
    for stat in ["GP", "WINS", "WIN_PCT"] {
        for regime in Regime::ALL {
            header.push(col(stat, regime));
        }
    }
    header.push("TEAM_NAME".to_string());
    header
}

pub fn write_team_table<W: Write>(out: W, records: &[TeamSeasonRecord]) -> Result<(), TableError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(team_table_header())?;
    for r in records {
        let s = &r.splits;
        writer.write_record([
            r.team_id.to_string(),
            r.season.to_string(),
            s.clutch.games.to_string(),
            s.non_clutch.games.to_string(),
            s.clutch.wins.to_string(),
            s.non_clutch.wins.to_string(),
            s.clutch.win_pct.to_string(),
            s.non_clutch.win_pct.to_string(),
            r.team_name.clone(),
        ])?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn read_team_table<R: Read>(input: R) -> Result<Vec<TeamSeasonRecord>, TableError> {
    let mut reader = csv::Reader::from_reader(input);
    let columns = ColumnIndex::new(reader.headers()?);
    let mut records = Vec::new();

    for result in reader.records() {
        let row = result?;
        let cells = Cells {
            columns: &columns,
            row: &row,
        };
        let mut splits: Split<TeamSplit> = Split::default();
        for regime in Regime::ALL {
            *splits.get_mut(regime) = TeamSplit {
                games: cells.parse(&col("GP", regime))?,
                wins: cells.parse(&col("WINS", regime))?,
                win_pct: cells.parse(&col("WIN_PCT", regime))?,
            };
        }
        records.push(TeamSeasonRecord {
            team_id: cells.parse("TEAM_ID")?,
            team_name: cells.text("TEAM_NAME")?.to_string(),
            season: cells.parse("SEASON")?,
            splits,
        });
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> TableError + '_ {
    move |e| TableError::Io {
        path: path.display().to_string(),
        source: e,
    }
}

/// Write both tables into `dir`. Each file is written in full or not at all:
/// rows are serialized in memory first.
pub fn write_tables(
    dir: &Path,
    players: &[PlayerSeasonRecord],
    teams: &[TeamSeasonRecord],
) -> Result<(), TableError> {
    let player_bytes = player_table_bytes(players)?;
    let mut team_bytes = Vec::new();
    write_team_table(&mut team_bytes, teams)?;

    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let player_path = dir.join(PLAYER_TABLE_FILE);
    std::fs::write(&player_path, player_bytes).map_err(io_err(&player_path))?;
    let team_path = dir.join(TEAM_TABLE_FILE);
    std::fs::write(&team_path, team_bytes).map_err(io_err(&team_path))?;
    Ok(())
}

pub fn read_player_table_file(path: &Path) -> Result<Vec<PlayerSeasonRecord>, TableError> {
    let file = std::fs::File::open(path).map_err(io_err(path))?;
    read_player_table(file)
}

pub fn read_team_table_file(path: &Path) -> Result<Vec<TeamSeasonRecord>, TableError> {
    let file = std::fs::File::open(path).map_err(io_err(path))?;
    read_team_table(file)
}

// ---------------------------------------------------------------------------
// Column lookup helpers
// ---------------------------------------------------------------------------

struct ColumnIndex(HashMap<String, usize>);

impl ColumnIndex {
    fn new(headers: &csv::StringRecord) -> Self {
        Self(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.to_string(), i))
                .collect(),
        )
    }
}

struct Cells<'a> {
    columns: &'a ColumnIndex,
    row: &'a csv::StringRecord,
}

impl Cells<'_> {
    fn text(&self, name: &str) -> Result<&str, TableError> {
        self.columns
            .0
            .get(name)
            .and_then(|&i| self.row.get(i))
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    fn parse<T: FromStr>(&self, name: &str) -> Result<T, TableError> {
        let raw = self.text(name)?;
        raw.trim().parse::<T>().map_err(|_| TableError::BadValue {
            column: name.to_string(),
            value: raw.to_string(),
        })
    }
}
