// Table builders: raw tables -> player-season and team-season tables.

use crate::classify::{classify_games, index_by_id, CLUTCH_MARGIN};
use crate::cpi::{score_players, CpiParams};
use crate::ingest::normalize_box_scores;
use crate::rates::{derive_splits, differentials};
use crate::raw::RawTables;
use crate::record::PlayerSeasonRecord;
use crate::season::aggregate_player_seasons;
use crate::team::{build_team_records, TeamSeasonRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Parameters that shape the processed tables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildParams {
    pub clutch_margin: f64,
    pub cpi: CpiParams,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            clutch_margin: CLUTCH_MARGIN,
            cpi: CpiParams::default(),
        }
    }
}

fn team_names(raw: &RawTables) -> HashMap<u64, String> {
    let mut names = HashMap::new();
    for team in &raw.teams {
        names.entry(team.team_id).or_insert_with(|| team.name());
    }
    names
}

/// Build the player-season table, ordered by (player, name, team, season),
/// with CPI assigned across every season in the input.
pub fn build_player_season_table(raw: &RawTables, params: &BuildParams) -> Vec<PlayerSeasonRecord> {
    let lines = normalize_box_scores(&raw.box_scores);
    let games = classify_games(&raw.games, params.clutch_margin);
    let index = index_by_id(&games);
    let names = team_names(raw);

    let groups = aggregate_player_seasons(&lines, &index, &names);
    let mut records: Vec<PlayerSeasonRecord> = groups
        .into_iter()
        .map(|(key, totals)| {
            let splits = derive_splits(&totals);
            PlayerSeasonRecord {
                player_id: key.player_id,
                player_name: key.player_name,
                team_name: key.team_name,
                season: key.season,
                diff: differentials(&splits),
                splits,
                cpi: 0.0,
            }
        })
        .collect();

    score_players(&mut records, &params.cpi);
    info!("built player table: {} rows", records.len());
    records
}

/// Build the team-season table, ordered by (team, season).
pub fn build_team_season_table(raw: &RawTables, params: &BuildParams) -> Vec<TeamSeasonRecord> {
    let games = classify_games(&raw.games, params.clutch_margin);
    let records = build_team_records(&games, &team_names(raw));
    info!("built team table: {} rows", records.len());
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{CountingStats, RawBoxScoreRow, RawGameRecord, TeamInfo};

    fn raw() -> RawTables {
        let game = |id, season, home_pts, visitor_pts| RawGameRecord {
            game_id: id,
            season,
            home_team_id: 1,
            visitor_team_id: 2,
            home_pts: Some(home_pts),
            visitor_pts: Some(visitor_pts),
            home_team_wins: home_pts > visitor_pts,
            game_date: None,
        };
        let row = |game_id, minutes: &str, pts| RawBoxScoreRow {
            game_id,
            team_id: 1,
            player_id: 10,
            player_name: "Ten".into(),
            minutes: Some(minutes.to_string()),
            stats: CountingStats {
                pts,
                fga: 10.0,
                fgm: 4.0,
                ..Default::default()
            },
        };
        RawTables {
            games: vec![game(1, 2020, 100.0, 98.0), game(2, 2020, 120.0, 90.0)],
            box_scores: vec![row(1, "30:00", 12.0), row(2, "25:30", 20.0), row(2, "DNP", 0.0)],
            teams: vec![
                TeamInfo {
                    team_id: 1,
                    city: "Home".into(),
                    nickname: "Hosts".into(),
                },
                TeamInfo {
                    team_id: 2,
                    city: "Away".into(),
                    nickname: "Guests".into(),
                },
            ],
        }
    }

    #[test]
    fn player_table_splits_by_regime() {
        let table = build_player_season_table(&raw(), &BuildParams::default());
        assert_eq!(table.len(), 1);
        let r = &table[0];
        assert_eq!(r.team_name, "Home Hosts");
        assert_eq!(r.gp_clutch(), 1);
        assert_eq!(r.non_clutch().games, 1);
        assert_eq!(r.clutch().rates.ppg, 12.0);
        assert_eq!(r.non_clutch().minutes, 25.5);
        assert_eq!(r.diff.ppg, -8.0);
        assert!(r.cpi.is_finite());
    }

    #[test]
    fn team_table_has_both_sides() {
        let table = build_team_season_table(&raw(), &BuildParams::default());
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].splits.clutch.wins, 1);
        assert_eq!(table[1].splits.clutch.wins, 0);
        assert_eq!(table[1].team_name, "Away Guests");
    }
}
