// Clutch-game labelling from the final score margin.
//
// "Clutch" here means "decided by at most `clutch_margin` points". There is
// no play-by-play in the inputs, so this is a whole-game label, not the
// last-five-minutes definition used by official statistics.

use crate::raw::RawGameRecord;
use std::collections::HashMap;
use tracing::{info, warn};

/// Default final-margin threshold, inclusive.
pub const CLUTCH_MARGIN: f64 = 5.0;

/// A game with its clutch label attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedGame {
    pub game_id: u64,
    pub season: i32,
    pub home_team_id: u64,
    pub visitor_team_id: u64,
    pub home_team_wins: bool,
    pub score_diff: Option<f64>,
    pub is_clutch: bool,
}

/// Absolute final margin, or `None` when either score is missing.
pub fn score_diff(game: &RawGameRecord) -> Option<f64> {
    match (game.home_pts, game.visitor_pts) {
        (Some(home), Some(visitor)) if home.is_finite() && visitor.is_finite() => {
            Some((home - visitor).abs())
        }
        _ => None,
    }
}

/// True iff the final margin is between 0 and `clutch_margin` inclusive.
pub fn is_clutch_game(game: &RawGameRecord, clutch_margin: f64) -> bool {
    score_diff(game).is_some_and(|diff| (0.0..=clutch_margin).contains(&diff))
}

/// Label every game.
pub fn classify_games(games: &[RawGameRecord], clutch_margin: f64) -> Vec<ClassifiedGame> {
    let classified: Vec<ClassifiedGame> = games
        .iter()
        .map(|g| {
            let diff = score_diff(g);
            ClassifiedGame {
                game_id: g.game_id,
                season: g.season,
                home_team_id: g.home_team_id,
                visitor_team_id: g.visitor_team_id,
                home_team_wins: g.home_team_wins,
                score_diff: diff,
                is_clutch: diff.is_some_and(|d| (0.0..=clutch_margin).contains(&d)),
            }
        })
        .collect();

    let clutch = classified.iter().filter(|g| g.is_clutch).count();
    info!(
        "classified {} games: {} clutch (margin <= {}), {} non-clutch",
        classified.len(),
        clutch,
        clutch_margin,
        classified.len() - clutch
    );
    classified
}

/// Index classified games by id. The first occurrence of a duplicated id wins.
pub fn index_by_id(games: &[ClassifiedGame]) -> HashMap<u64, &ClassifiedGame> {
    let mut map = HashMap::with_capacity(games.len());
    for game in games {
        if map.contains_key(&game.game_id) {
            warn!("duplicate game id {}, keeping first occurrence", game.game_id);
            continue;
        }
        map.insert(game.game_id, game);
    }
    map
}
