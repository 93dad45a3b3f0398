// Team aggregation: clutch and non-clutch games, wins, and win percentage.

use crate::classify::ClassifiedGame;
use crate::record::{Regime, Split};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, warn};

/// Games, wins, and win percentage for one regime.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeamSplit {
    pub games: u32,
    pub wins: u32,
    pub win_pct: f64,
}

/// One team's season, split by regime.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamSeasonRecord {
    pub team_id: u64,
    pub team_name: String,
    pub season: i32,
    pub splits: Split<TeamSplit>,
}

/// Expand each game into a home row and a visitor row (win flag inverted for
/// the visitor), group by (team, season, regime), and pivot the regimes.
///
/// Teams missing from `team_names` are dropped. A repeated game id is
/// counted once, keeping its first occurrence. There is no small-sample
/// correction at team level.
pub fn build_team_records(
    games: &[ClassifiedGame],
    team_names: &HashMap<u64, String>,
) -> Vec<TeamSeasonRecord> {
    let mut groups: BTreeMap<(u64, i32), Split<TeamSplit>> = BTreeMap::new();
    let mut seen = HashSet::with_capacity(games.len());

    for game in games {
        if !seen.insert(game.game_id) {
            warn!("duplicate game id {}, keeping first occurrence", game.game_id);
            continue;
        }
        let regime = Regime::from_flag(game.is_clutch);
        let sides = [
            (game.home_team_id, game.home_team_wins),
            (game.visitor_team_id, !game.home_team_wins),
        ];
        for (team_id, won) in sides {
            let split = groups
                .entry((team_id, game.season))
                .or_default()
                .get_mut(regime);
            split.games += 1;
            if won {
                split.wins += 1;
            }
        }
    }

    let records: Vec<TeamSeasonRecord> = groups
        .into_iter()
        .filter_map(|((team_id, season), splits)| {
            let team_name = team_names.get(&team_id)?.clone();
            Some(TeamSeasonRecord {
                team_id,
                team_name,
                season,
                splits: splits.map(|s| TeamSplit {
                    win_pct: if s.games == 0 {
                        0.0
                    } else {
                        s.wins as f64 / s.games as f64
                    },
                    ..*s
                }),
            })
        })
        .collect();

    info!("aggregated {} team seasons", records.len());
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(id: u64, home: u64, visitor: u64, home_wins: bool, is_clutch: bool) -> ClassifiedGame {
        ClassifiedGame {
            game_id: id,
            season: 2020,
            home_team_id: home,
            visitor_team_id: visitor,
            home_team_wins: home_wins,
            score_diff: None,
            is_clutch,
        }
    }

    fn names() -> HashMap<u64, String> {
        [(1, "Alpha".to_string()), (2, "Beta".to_string())].into()
    }

    #[test]
    fn home_and_visitor_rows_with_inverted_wins() {
        let games = vec![
            game(1, 1, 2, true, true),
            game(2, 2, 1, true, true),
            game(3, 1, 2, true, false),
        ];
        let records = build_team_records(&games, &names());
        assert_eq!(records.len(), 2);

        let alpha = &records[0];
        assert_eq!(alpha.team_name, "Alpha");
        assert_eq!(alpha.splits.clutch.games, 2);
        assert_eq!(alpha.splits.clutch.wins, 1);
        assert_eq!(alpha.splits.clutch.win_pct, 0.5);
        assert_eq!(alpha.splits.non_clutch.games, 1);
        assert_eq!(alpha.splits.non_clutch.win_pct, 1.0);

        let beta = &records[1];
        assert_eq!(beta.splits.clutch.wins, 1);
        assert_eq!(beta.splits.non_clutch.wins, 0);
        assert_eq!(beta.splits.non_clutch.win_pct, 0.0);
    }

    #[test]
    fn missing_regime_is_zero() {
        let records = build_team_records(&[game(1, 1, 2, false, false)], &names());
        assert_eq!(records[0].splits.clutch, TeamSplit::default());
    }

    #[test]
    fn unknown_team_is_dropped() {
        let records = build_team_records(&[game(1, 1, 99, true, true)], &names());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].team_id, 1);
    }

    #[test]
    fn duplicate_game_id_counts_once() {
        let games = vec![
            game(7, 1, 2, true, true),
            // Same id, different outcome: the first row wins
            game(7, 1, 2, false, false),
            game(8, 2, 1, true, false),
        ];
        let records = build_team_records(&games, &names());
        let alpha = &records[0];
        assert_eq!(alpha.splits.clutch.games, 1);
        assert_eq!(alpha.splits.clutch.wins, 1);
        assert_eq!(alpha.splits.non_clutch.games, 1);
        assert_eq!(alpha.splits.non_clutch.wins, 0);
        assert_eq!(records[1].splits.clutch.games + records[1].splits.non_clutch.games, 2);
    }
}
