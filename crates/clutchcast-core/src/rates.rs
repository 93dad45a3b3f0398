// Rate derivation: per-game and efficiency rates plus clutch differentials.

use crate::record::{Differentials, RateLine, Split, SplitLine, SplitTotals};
use crate::stats::guarded_div;

/// Derive the rate line for one regime.
///
/// Every denominator (games, attempts, turnovers) is floored at 1 for the
/// division only. Afterwards a regime with no recorded minutes reports
/// zero games and all-zero rates.
pub fn derive_split(totals: &SplitTotals) -> SplitLine {
    if totals.minutes == 0.0 {
        return SplitLine {
            totals: totals.stats,
            minutes: totals.minutes,
            games: 0,
            rates: RateLine::default(),
        };
    }

    let s = &totals.stats;
    let gp = totals.games as f64;
    let rates = RateLine {
        ppg: guarded_div(s.pts, gp),
        apg: guarded_div(s.ast, gp),
        rpg: guarded_div(s.reb, gp),
        topg: guarded_div(s.tov, gp),
        plus_minus_per_game: guarded_div(s.plus_minus, gp),
        fg_pct: guarded_div(s.fgm, s.fga),
        fg3_pct: guarded_div(s.fg3m, s.fg3a),
        ft_pct: guarded_div(s.ftm, s.fta),
        ast_to_ratio: guarded_div(s.ast, s.tov),
    };

    SplitLine {
        totals: totals.stats,
        minutes: totals.minutes,
        games: totals.games,
        rates,
    }
}

/// Derive both regimes.
pub fn derive_splits(totals: &Split<SplitTotals>) -> Split<SplitLine> {
    totals.map(derive_split)
}

/// Clutch minus non-clutch for PPG, FG% and AST/TO.
pub fn differentials(lines: &Split<SplitLine>) -> Differentials {
    let c = &lines.clutch.rates;
    let n = &lines.non_clutch.rates;
    Differentials {
        ppg: c.ppg - n.ppg,
        fg_pct: c.fg_pct - n.fg_pct,
        ast_to_ratio: c.ast_to_ratio - n.ast_to_ratio,
    }
}
