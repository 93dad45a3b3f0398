// Raw input records: games, per-player box-score lines, and team names.

use chrono::NaiveDate;
use std::ops::AddAssign;

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

/// One game from the `games` source.
///
/// Final points are optional because the public dataset has a handful of
/// games with blank scores; such a game has no defined margin.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGameRecord {
    pub game_id: u64,
    pub season: i32,
    pub home_team_id: u64,
    pub visitor_team_id: u64,
    pub home_pts: Option<f64>,
    pub visitor_pts: Option<f64>,
    pub home_team_wins: bool,
    pub game_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Counting stats
// ---------------------------------------------------------------------------

/// Summable counting stats for one player, over one game or many.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CountingStats {
    pub fgm: f64,
    pub fga: f64,
    pub fg3m: f64,
    pub fg3a: f64,
    pub ftm: f64,
    pub fta: f64,
    pub oreb: f64,
    pub dreb: f64,
    pub reb: f64,
    pub ast: f64,
    pub stl: f64,
    pub blk: f64,
    pub tov: f64,
    pub pf: f64,
    pub pts: f64,
    pub plus_minus: f64,
}

impl CountingStats {
    /// Column names used by the processed tables, in `values()` order.
    pub const FIELDS: [&'static str; 16] = [
        "FGM",
        "FGA",
        "FG3M",
        "FG3A",
        "FTM",
        "FTA",
        "OREB",
        "DREB",
        "REB",
        "AST",
        "STL",
        "BLK",
        "TOV",
        "PF",
        "PTS",
        "PLUS_MINUS",
    ];

    pub fn values(&self) -> [f64; 16] {
        [
            self.fgm,
            self.fga,
            self.fg3m,
            self.fg3a,
            self.ftm,
            self.fta,
            self.oreb,
            self.dreb,
            self.reb,
            self.ast,
            self.stl,
            self.blk,
            self.tov,
            self.pf,
            self.pts,
            self.plus_minus,
        ]
    }

    pub fn from_values(v: [f64; 16]) -> Self {
        Self {
            fgm: v[0],
            fga: v[1],
            fg3m: v[2],
            fg3a: v[3],
            ftm: v[4],
            fta: v[5],
            oreb: v[6],
            dreb: v[7],
            reb: v[8],
            ast: v[9],
            stl: v[10],
            blk: v[11],
            tov: v[12],
            pf: v[13],
            pts: v[14],
            plus_minus: v[15],
        }
    }
}

impl AddAssign for CountingStats {
    fn add_assign(&mut self, rhs: Self) {
        let mut sum = self.values();
        for (acc, v) in sum.iter_mut().zip(rhs.values()) {
            *acc += v;
        }
        *self = Self::from_values(sum);
    }
}

// ---------------------------------------------------------------------------
// Box scores and teams
// ---------------------------------------------------------------------------

/// One player's line in one game, as read from the `game_box_scores` source.
///
/// Counting stats are already zero-filled; minutes stay as the raw string
/// until the ingest normalizer parses them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBoxScoreRow {
    pub game_id: u64,
    pub team_id: u64,
    pub player_id: u64,
    pub player_name: String,
    pub minutes: Option<String>,
    pub stats: CountingStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamInfo {
    pub team_id: u64,
    pub city: String,
    pub nickname: String,
}

impl TeamInfo {
    /// Display name: city and nickname joined by a space.
    pub fn name(&self) -> String {
        format!("{} {}", self.city, self.nickname)
    }
}

/// The three input tables of one pipeline run. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub games: Vec<RawGameRecord>,
    pub box_scores: Vec<RawBoxScoreRow>,
    pub teams: Vec<TeamInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_stats_add_assign_sums_every_field() {
        let mut a = CountingStats::from_values([1.0; 16]);
        let b = CountingStats::from_values(std::array::from_fn(|i| i as f64));
        a += b;
        let v = a.values();
        for (i, x) in v.iter().enumerate() {
            assert_eq!(*x, 1.0 + i as f64);
        }
    }

    #[test]
    fn team_name_joins_city_and_nickname() {
        let team = TeamInfo {
            team_id: 1610612747,
            city: "Los Angeles".into(),
            nickname: "Lakers".into(),
        };
        assert_eq!(team.name(), "Los Angeles Lakers");
    }
}
