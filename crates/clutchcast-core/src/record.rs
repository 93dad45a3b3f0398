// Season-level record types shared by the player pipeline and its consumers.

use crate::raw::CountingStats;

// ---------------------------------------------------------------------------
// Regimes
// ---------------------------------------------------------------------------

/// Which half of the clutch / non-clutch split a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Regime {
    Clutch,
    NonClutch,
}

impl Regime {
    pub const ALL: [Regime; 2] = [Regime::Clutch, Regime::NonClutch];

    pub fn from_flag(is_clutch: bool) -> Self {
        if is_clutch {
            Regime::Clutch
        } else {
            Regime::NonClutch
        }
    }

    /// Column-name suffix used by the processed tables.
    pub fn suffix(self) -> &'static str {
        match self {
            Regime::Clutch => "clutch",
            Regime::NonClutch => "non_clutch",
        }
    }
}

/// A value held once per regime.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Split<T> {
    pub clutch: T,
    pub non_clutch: T,
}

impl<T> Split<T> {
    pub fn get(&self, regime: Regime) -> &T {
        match regime {
            Regime::Clutch => &self.clutch,
            Regime::NonClutch => &self.non_clutch,
        }
    }

    pub fn get_mut(&mut self, regime: Regime) -> &mut T {
        match regime {
            Regime::Clutch => &mut self.clutch,
            Regime::NonClutch => &mut self.non_clutch,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Split<U> {
        Split {
            clutch: f(&self.clutch),
            non_clutch: f(&self.non_clutch),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-regime lines
// ---------------------------------------------------------------------------

/// Summed counting stats for one regime before any rate is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SplitTotals {
    pub stats: CountingStats,
    pub minutes: f64,
    pub games: u32,
}

/// Per-game and efficiency rates for one regime.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateLine {
    pub ppg: f64,
    pub apg: f64,
    pub rpg: f64,
    pub topg: f64,
    pub plus_minus_per_game: f64,
    pub fg_pct: f64,
    pub fg3_pct: f64,
    pub ft_pct: f64,
    pub ast_to_ratio: f64,
}

impl RateLine {
    pub const FIELDS: [&'static str; 9] = [
        "PPG",
        "APG",
        "RPG",
        "TOPG",
        "PLUS_MINUS_PER_GAME",
        "FG_PCT",
        "FG3_PCT",
        "FT_PCT",
        "AST_TO_RATIO",
    ];

    pub fn values(&self) -> [f64; 9] {
        [
            self.ppg,
            self.apg,
            self.rpg,
            self.topg,
            self.plus_minus_per_game,
            self.fg_pct,
            self.fg3_pct,
            self.ft_pct,
            self.ast_to_ratio,
        ]
    }

    pub fn from_values(v: [f64; 9]) -> Self {
        Self {
            ppg: v[0],
            apg: v[1],
            rpg: v[2],
            topg: v[3],
            plus_minus_per_game: v[4],
            fg_pct: v[5],
            fg3_pct: v[6],
            ft_pct: v[7],
            ast_to_ratio: v[8],
        }
    }
}

/// Totals plus derived rates for one regime.
///
/// `games` is 0 whenever no minutes were recorded in this regime, and then
/// every rate is 0 as well.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SplitLine {
    pub totals: CountingStats,
    pub minutes: f64,
    pub games: u32,
    pub rates: RateLine,
}

/// Clutch minus non-clutch for the headline rates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Differentials {
    pub ppg: f64,
    pub fg_pct: f64,
    pub ast_to_ratio: f64,
}

// ---------------------------------------------------------------------------
// Player season record
// ---------------------------------------------------------------------------

/// One player's season with one team, split by regime, with its CPI.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSeasonRecord {
    pub player_id: u64,
    pub player_name: String,
    pub team_name: String,
    pub season: i32,
    pub splits: Split<SplitLine>,
    pub diff: Differentials,
    pub cpi: f64,
}

impl PlayerSeasonRecord {
    pub fn clutch(&self) -> &SplitLine {
        &self.splits.clutch
    }

    pub fn non_clutch(&self) -> &SplitLine {
        &self.splits.non_clutch
    }

    pub fn gp_clutch(&self) -> u32 {
        self.splits.clutch.games
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_get_follows_regime() {
        let mut s = Split {
            clutch: 1,
            non_clutch: 2,
        };
        assert_eq!(*s.get(Regime::Clutch), 1);
        *s.get_mut(Regime::NonClutch) = 5;
        assert_eq!(s.non_clutch, 5);
        assert_eq!(s.map(|v| v * 10), Split { clutch: 10, non_clutch: 50 });
    }

    #[test]
    fn regime_suffixes() {
        assert_eq!(Regime::Clutch.suffix(), "clutch");
        assert_eq!(Regime::from_flag(false), Regime::NonClutch);
    }
}
