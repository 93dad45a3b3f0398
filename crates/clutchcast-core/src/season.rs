// Season aggregation: box-score lines -> per (player, team, season) regime totals.

use crate::classify::ClassifiedGame;
use crate::ingest::BoxScoreLine;
use crate::record::{Regime, Split, SplitTotals};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Grouping key for a player season. Ordered the way the output table is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerSeasonKey {
    pub player_id: u64,
    pub player_name: String,
    pub team_name: String,
    pub season: i32,
}

/// Sum every line into its (player, team, season) group, one total per regime.
///
/// Lines whose game or team is unknown are dropped (inner join semantics).
/// A player who only ever appeared in one regime gets an all-zero total for
/// the other.
pub fn aggregate_player_seasons(
    lines: &[BoxScoreLine],
    games: &HashMap<u64, &ClassifiedGame>,
    team_names: &HashMap<u64, String>,
) -> BTreeMap<PlayerSeasonKey, Split<SplitTotals>> {
    let mut groups: BTreeMap<PlayerSeasonKey, Split<SplitTotals>> = BTreeMap::new();
    let mut unmatched_game = 0usize;
    let mut unmatched_team = 0usize;

    for line in lines {
        let Some(game) = games.get(&line.game_id) else {
            unmatched_game += 1;
            continue;
        };
        let Some(team_name) = team_names.get(&line.team_id) else {
            unmatched_team += 1;
            continue;
        };

        let key = PlayerSeasonKey {
            player_id: line.player_id,
            player_name: line.player_name.clone(),
            team_name: team_name.clone(),
            season: game.season,
        };
        let totals = groups
            .entry(key)
            .or_default()
            .get_mut(Regime::from_flag(game.is_clutch));
        totals.stats += line.stats;
        totals.minutes += line.minutes;
        totals.games += 1;
    }

    if unmatched_game > 0 || unmatched_team > 0 {
        debug!(
            "dropped {} lines with unknown game and {} with unknown team",
            unmatched_game, unmatched_team
        );
    }
    info!("aggregated {} player seasons", groups.len());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::CountingStats;

    fn game(id: u64, season: i32, is_clutch: bool) -> ClassifiedGame {
        ClassifiedGame {
            game_id: id,
            season,
            home_team_id: 1,
            visitor_team_id: 2,
            home_team_wins: true,
            score_diff: Some(if is_clutch { 2.0 } else { 20.0 }),
            is_clutch,
        }
    }

    fn line(game_id: u64, team_id: u64, pts: f64) -> BoxScoreLine {
        BoxScoreLine {
            game_id,
            team_id,
            player_id: 7,
            player_name: "Seven".into(),
            minutes: 30.0,
            stats: CountingStats {
                pts,
                ..Default::default()
            },
        }
    }

    #[test]
    fn sums_and_counts_per_regime() {
        let games = vec![game(1, 2019, true), game(2, 2019, false), game(3, 2019, true)];
        let index: HashMap<u64, &ClassifiedGame> = games.iter().map(|g| (g.game_id, g)).collect();
        let teams: HashMap<u64, String> = [(1, "Home Team".to_string())].into();

        let lines = vec![line(1, 1, 10.0), line(2, 1, 20.0), line(3, 1, 5.0)];
        let groups = aggregate_player_seasons(&lines, &index, &teams);
        assert_eq!(groups.len(), 1);

        let split = groups.values().next().unwrap();
        assert_eq!(split.clutch.games, 2);
        assert_eq!(split.clutch.stats.pts, 15.0);
        assert_eq!(split.clutch.minutes, 60.0);
        assert_eq!(split.non_clutch.games, 1);
        assert_eq!(split.non_clutch.stats.pts, 20.0);
    }

    #[test]
    fn missing_regime_is_zero_filled() {
        let games = vec![game(1, 2019, false)];
        let index: HashMap<u64, &ClassifiedGame> = games.iter().map(|g| (g.game_id, g)).collect();
        let teams: HashMap<u64, String> = [(1, "Home Team".to_string())].into();

        let groups = aggregate_player_seasons(&[line(1, 1, 12.0)], &index, &teams);
        let split = groups.values().next().unwrap();
        assert_eq!(split.clutch, SplitTotals::default());
    }

    #[test]
    fn unknown_game_or_team_is_dropped() {
        let games = vec![game(1, 2019, true)];
        let index: HashMap<u64, &ClassifiedGame> = games.iter().map(|g| (g.game_id, g)).collect();
        let teams: HashMap<u64, String> = [(1, "Home Team".to_string())].into();

        let lines = vec![line(99, 1, 10.0), line(1, 42, 10.0)];
        assert!(aggregate_player_seasons(&lines, &index, &teams).is_empty());
    }

    #[test]
    fn traded_player_gets_one_group_per_team() {
        let games = vec![game(1, 2019, true), game(2, 2019, true)];
        let index: HashMap<u64, &ClassifiedGame> = games.iter().map(|g| (g.game_id, g)).collect();
        let teams: HashMap<u64, String> =
            [(1, "Alpha".to_string()), (2, "Beta".to_string())].into();

        let groups = aggregate_player_seasons(&[line(1, 1, 3.0), line(2, 2, 4.0)], &index, &teams);
        let names: Vec<&str> = groups.keys().map(|k| k.team_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }
}
