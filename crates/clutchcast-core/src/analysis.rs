// Player and team lookups, leaderboards, league ranking, and the shot-volume
// scenario.

use crate::record::PlayerSeasonRecord;
use crate::stats::guarded_div;
use crate::team::TeamSeasonRecord;
use serde::Serialize;

/// Minimum clutch games to enter a league ranking pool.
pub const RANKING_MIN_CLUTCH_GAMES: u32 = 10;

/// Minimum clutch games to appear on a leaderboard or a team's top list.
pub const LEADERBOARD_MIN_CLUTCH_GAMES: u32 = 5;

pub const LEADERBOARD_SIZE: usize = 15;
pub const TEAM_TOP_PLAYERS: usize = 5;

/// Turnover-rate elasticity to extra shot volume.
const TOV_RATE_ELASTICITY: f64 = 0.5;

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// The record for `player_name` in `season`, if any. A traded player's first
/// team (in table order) is returned.
pub fn player_profile<'a>(
    table: &'a [PlayerSeasonRecord],
    player_name: &str,
    season: i32,
) -> Option<&'a PlayerSeasonRecord> {
    table
        .iter()
        .find(|r| r.season == season && r.player_name == player_name)
}

pub fn season_records(table: &[PlayerSeasonRecord], season: i32) -> Vec<&PlayerSeasonRecord> {
    table.iter().filter(|r| r.season == season).collect()
}

/// Distinct seasons present in the table, most recent first.
pub fn seasons(table: &[PlayerSeasonRecord]) -> Vec<i32> {
    let mut out: Vec<i32> = table.iter().map(|r| r.season).collect();
    out.sort_unstable_by(|a, b| b.cmp(a));
    out.dedup();
    out
}

/// The most recent season in the table.
pub fn latest_season(table: &[PlayerSeasonRecord]) -> Option<i32> {
    table.iter().map(|r| r.season).max()
}

// ---------------------------------------------------------------------------
// League rank
// ---------------------------------------------------------------------------

/// Player metrics used for ranking, leaderboards, and comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMetric {
    Cpi,
    GpClutch,
    PpgClutch,
    FgPctClutch,
    FgPctDiff,
    AstToRatioClutch,
    PlusMinusPerGameClutch,
}

impl RankMetric {
    pub const ALL: [RankMetric; 7] = [
        RankMetric::Cpi,
        RankMetric::GpClutch,
        RankMetric::PpgClutch,
        RankMetric::FgPctClutch,
        RankMetric::FgPctDiff,
        RankMetric::AstToRatioClutch,
        RankMetric::PlusMinusPerGameClutch,
    ];

    /// Metrics a player profile reports league ranks for.
    pub const PROFILE: [RankMetric; 5] = [
        RankMetric::Cpi,
        RankMetric::PpgClutch,
        RankMetric::FgPctClutch,
        RankMetric::FgPctDiff,
        RankMetric::AstToRatioClutch,
    ];

    pub fn column(self) -> &'static str {
        match self {
            RankMetric::Cpi => "CPI",
            RankMetric::GpClutch => "GP_clutch",
            RankMetric::PpgClutch => "PPG_clutch",
            RankMetric::FgPctClutch => "FG_PCT_clutch",
            RankMetric::FgPctDiff => "FG_PCT_diff",
            RankMetric::AstToRatioClutch => "AST_TO_RATIO_clutch",
            RankMetric::PlusMinusPerGameClutch => "PLUS_MINUS_PER_GAME_clutch",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.column().eq_ignore_ascii_case(name))
    }

    pub fn value(self, r: &PlayerSeasonRecord) -> f64 {
        match self {
            RankMetric::Cpi => r.cpi,
            RankMetric::GpClutch => r.gp_clutch() as f64,
            RankMetric::PpgClutch => r.clutch().rates.ppg,
            RankMetric::FgPctClutch => r.clutch().rates.fg_pct,
            RankMetric::FgPctDiff => r.diff.fg_pct,
            RankMetric::AstToRatioClutch => r.clutch().rates.ast_to_ratio,
            RankMetric::PlusMinusPerGameClutch => r.clutch().rates.plus_minus_per_game,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeagueRank {
    /// 1-based; tied values share the best rank.
    pub rank: usize,
    pub pool_size: usize,
}

/// Rank a player within `season` among players with at least
/// `min_clutch_games` clutch games, highest value first.
///
/// Returns `None` if the player is not in the pool.
pub fn league_rank(
    table: &[PlayerSeasonRecord],
    player_name: &str,
    season: i32,
    metric: RankMetric,
    min_clutch_games: u32,
) -> Option<LeagueRank> {
    let pool: Vec<&PlayerSeasonRecord> = table
        .iter()
        .filter(|r| r.season == season && r.gp_clutch() >= min_clutch_games)
        .collect();
    let target = pool.iter().find(|r| r.player_name == player_name)?;
    let value = metric.value(target);
    let better = pool.iter().filter(|r| metric.value(r) > value).count();
    Some(LeagueRank {
        rank: better + 1,
        pool_size: pool.len(),
    })
}

// ---------------------------------------------------------------------------
// Leaderboards and team profiles
// ---------------------------------------------------------------------------

/// The top `n` players of `season` by `metric`, among those with at least
/// `min_clutch_games` clutch games. Ties keep table order.
pub fn season_leaders(
    table: &[PlayerSeasonRecord],
    season: i32,
    metric: RankMetric,
    min_clutch_games: u32,
    n: usize,
) -> Vec<&PlayerSeasonRecord> {
    let pool = season_records(table, season)
        .into_iter()
        .filter(|r| r.gp_clutch() >= min_clutch_games);
    top_by(pool, metric, n)
}

fn top_by<'a>(
    pool: impl Iterator<Item = &'a PlayerSeasonRecord>,
    metric: RankMetric,
    n: usize,
) -> Vec<&'a PlayerSeasonRecord> {
    let mut ranked: Vec<&PlayerSeasonRecord> = pool.filter(|r| !metric.value(r).is_nan()).collect();
    ranked.sort_by(|a, b| metric.value(b).total_cmp(&metric.value(a)));
    ranked.truncate(n);
    ranked
}

/// A team's season record and its leading clutch performers.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamProfile<'a> {
    pub record: &'a TeamSeasonRecord,
    /// By CPI, highest first.
    pub top_players: Vec<&'a PlayerSeasonRecord>,
}

impl TeamProfile<'_> {
    /// Clutch win percentage minus non-clutch win percentage.
    pub fn win_pct_diff(&self) -> f64 {
        self.record.splits.clutch.win_pct - self.record.splits.non_clutch.win_pct
    }
}

/// Look up `team_name` in `season` and attach its top `n` players by CPI
/// among those with at least `min_clutch_games` clutch games.
pub fn team_profile<'a>(
    teams: &'a [TeamSeasonRecord],
    players: &'a [PlayerSeasonRecord],
    team_name: &str,
    season: i32,
    min_clutch_games: u32,
    n: usize,
) -> Option<TeamProfile<'a>> {
    let record = teams
        .iter()
        .find(|t| t.season == season && t.team_name == team_name)?;
    let roster = players.iter().filter(|r| {
        r.season == season && r.team_name == team_name && r.gp_clutch() >= min_clutch_games
    });
    Some(TeamProfile {
        record,
        top_players: top_by(roster, RankMetric::Cpi, n),
    })
}

/// Distinct team names present in `season`, sorted.
pub fn team_names(teams: &[TeamSeasonRecord], season: i32) -> Vec<&str> {
    let mut names: Vec<&str> = teams
        .iter()
        .filter(|t| t.season == season)
        .map(|t| t.team_name.as_str())
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

// ---------------------------------------------------------------------------
// Player comparison
// ---------------------------------------------------------------------------

/// One metric for two players side by side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonRow {
    pub metric: RankMetric,
    pub first: f64,
    pub second: f64,
}

impl ComparisonRow {
    /// `Some(true)` when the first player is higher, `None` on a tie.
    pub fn first_leads(&self) -> Option<bool> {
        match self.first.partial_cmp(&self.second)? {
            std::cmp::Ordering::Greater => Some(true),
            std::cmp::Ordering::Less => Some(false),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Compare two player-seasons on every [`RankMetric`].
pub fn compare_players(first: &PlayerSeasonRecord, second: &PlayerSeasonRecord) -> Vec<ComparisonRow> {
    RankMetric::ALL
        .into_iter()
        .map(|metric| ComparisonRow {
            metric,
            first: metric.value(first),
            second: metric.value(second),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Shot-volume scenario
// ---------------------------------------------------------------------------

/// Clutch line shown on both sides of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioLine {
    pub ppg: f64,
    pub fga_per_game: f64,
    pub topg: f64,
    pub ast_to: f64,
}

/// Project a player's clutch line under `shot_increase_pct` percent more
/// field-goal attempts per game. Returns (current, projected).
///
/// Scoring efficiency per attempt is held constant. Turnovers per attempt
/// rise at half the rate of the volume increase. Assists per game are held
/// constant.
pub fn simulate_shot_volume(
    record: &PlayerSeasonRecord,
    shot_increase_pct: f64,
) -> (ScenarioLine, ScenarioLine) {
    let line = record.clutch();
    let fga = line.totals.fga;
    let current = ScenarioLine {
        ppg: line.rates.ppg,
        fga_per_game: guarded_div(fga, line.games as f64),
        topg: line.rates.topg,
        ast_to: line.rates.ast_to_ratio,
    };

    let increase = shot_increase_pct / 100.0;
    let new_fga_per_game = current.fga_per_game * (1.0 + increase);
    let delta_fga = new_fga_per_game - current.fga_per_game;

    let pts_per_fga = guarded_div(line.totals.pts, fga);
    let tov_per_fga = guarded_div(line.totals.tov, fga);
    let new_tov_rate = tov_per_fga * (1.0 + increase * TOV_RATE_ELASTICITY);
    let new_topg = current.topg + delta_fga * new_tov_rate;
    let new_ast_to = line.rates.apg / if new_topg > 0.0 { new_topg } else { 1.0 };

    let projected = ScenarioLine {
        ppg: current.ppg + delta_fga * pts_per_fga,
        fga_per_game: new_fga_per_game,
        topg: new_topg,
        ast_to: new_ast_to,
    };
    (current, projected)
}
