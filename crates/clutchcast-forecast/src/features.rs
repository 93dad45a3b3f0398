// Feature engineering: per-player temporal and interaction features plus the
// next-season CPI target.

use clutchcast_core::record::PlayerSeasonRecord;
use clutchcast_core::stats::{median, sample_stdev};
use serde::Serialize;

pub const N_FEATURES: usize = 21;

/// Trailing window for the rolling means (current season plus one prior).
const MEAN_WINDOW: usize = 2;
/// Trailing window for the clutch-PPG stability feature.
const STABILITY_WINDOW: usize = 3;
const STABILITY_MIN_OBS: usize = 2;

// ---------------------------------------------------------------------------
// Feature catalogue
// ---------------------------------------------------------------------------

/// Model inputs, in the fixed column order of every feature matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Feature {
    GpClutch,
    PpgClutch,
    FgPctClutch,
    Fg3PctClutch,
    AstToRatioClutch,
    PlusMinusPerGameClutch,
    PpgDiff,
    FgPctDiff,
    GpNonClutch,
    PpgNonClutch,
    RpgClutch,
    ApgClutch,
    TopgClutch,
    Cpi2yrAvg,
    PpgClutch2yrAvg,
    FgPctClutch2yrAvg,
    PpgTimesFgPct,
    GamesConsistency,
    ClutchVolume,
    Experience,
    PpgStability,
}

impl Feature {
    pub const ALL: [Feature; N_FEATURES] = [
        Feature::GpClutch,
        Feature::PpgClutch,
        Feature::FgPctClutch,
        Feature::Fg3PctClutch,
        Feature::AstToRatioClutch,
        Feature::PlusMinusPerGameClutch,
        Feature::PpgDiff,
        Feature::FgPctDiff,
        Feature::GpNonClutch,
        Feature::PpgNonClutch,
        Feature::RpgClutch,
        Feature::ApgClutch,
        Feature::TopgClutch,
        Feature::Cpi2yrAvg,
        Feature::PpgClutch2yrAvg,
        Feature::FgPctClutch2yrAvg,
        Feature::PpgTimesFgPct,
        Feature::GamesConsistency,
        Feature::ClutchVolume,
        Feature::Experience,
        Feature::PpgStability,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Feature::GpClutch => "GP_clutch",
            Feature::PpgClutch => "PPG_clutch",
            Feature::FgPctClutch => "FG_PCT_clutch",
            Feature::Fg3PctClutch => "FG3_PCT_clutch",
            Feature::AstToRatioClutch => "AST_TO_RATIO_clutch",
            Feature::PlusMinusPerGameClutch => "PLUS_MINUS_PER_GAME_clutch",
            Feature::PpgDiff => "PPG_diff",
            Feature::FgPctDiff => "FG_PCT_diff",
            Feature::GpNonClutch => "GP_non_clutch",
            Feature::PpgNonClutch => "PPG_non_clutch",
            Feature::RpgClutch => "RPG_clutch",
            Feature::ApgClutch => "APG_clutch",
            Feature::TopgClutch => "TOPG_clutch",
            Feature::Cpi2yrAvg => "CPI_2yr_avg",
            Feature::PpgClutch2yrAvg => "PPG_clutch_2yr_avg",
            Feature::FgPctClutch2yrAvg => "FG_PCT_clutch_2yr_avg",
            Feature::PpgTimesFgPct => "PPG_times_FG_PCT",
            Feature::GamesConsistency => "Games_consistency",
            Feature::ClutchVolume => "Clutch_volume",
            Feature::Experience => "experience",
            Feature::PpgStability => "PPG_stability",
        }
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One player season with its engineered features and, when the player has
/// a later recorded season, its target.
#[derive(Debug, Clone)]
pub struct FeatureRow<'a> {
    pub record: &'a PlayerSeasonRecord,
    pub features: [f64; N_FEATURES],
    pub target: Option<f64>,
}

impl FeatureRow<'_> {
    pub fn get(&self, feature: Feature) -> f64 {
        self.features[feature.index()]
    }

    /// True when every feature is a finite number.
    pub fn is_complete(&self) -> bool {
        self.features.iter().all(|v| v.is_finite())
    }
}

fn base_features(r: &PlayerSeasonRecord) -> [f64; N_FEATURES] {
    let c = &r.clutch().rates;
    let n = &r.non_clutch().rates;
    let gp_c = r.clutch().games as f64;
    let gp_n = r.non_clutch().games as f64;

    let mut f = [f64::NAN; N_FEATURES];
    f[Feature::GpClutch.index()] = gp_c;
    f[Feature::PpgClutch.index()] = c.ppg;
    f[Feature::FgPctClutch.index()] = c.fg_pct;
    f[Feature::Fg3PctClutch.index()] = c.fg3_pct;
    f[Feature::AstToRatioClutch.index()] = c.ast_to_ratio;
    f[Feature::PlusMinusPerGameClutch.index()] = c.plus_minus_per_game;
    f[Feature::PpgDiff.index()] = r.diff.ppg;
    f[Feature::FgPctDiff.index()] = r.diff.fg_pct;
    f[Feature::GpNonClutch.index()] = gp_n;
    f[Feature::PpgNonClutch.index()] = n.ppg;
    f[Feature::RpgClutch.index()] = c.rpg;
    f[Feature::ApgClutch.index()] = c.apg;
    f[Feature::TopgClutch.index()] = c.topg;

    f[Feature::PpgTimesFgPct.index()] = c.ppg * c.fg_pct;
    // 0 / 0 stays NaN; such a row never reaches the model.
    f[Feature::GamesConsistency.index()] = gp_c / (gp_c + gp_n);
    f[Feature::ClutchVolume.index()] = gp_c * c.ppg;
    f
}

fn trailing_mean(values: &[f64], end: usize) -> f64 {
    let start = (end + 1).saturating_sub(MEAN_WINDOW);
    let window = &values[start..=end];
    window.iter().sum::<f64>() / window.len() as f64
}

fn trailing_stdev(values: &[f64], end: usize) -> Option<f64> {
    let start = (end + 1).saturating_sub(STABILITY_WINDOW);
    let window = &values[start..=end];
    if window.len() < STABILITY_MIN_OBS {
        return None;
    }
    sample_stdev(window)
}

/// Zero-based average rank of `seasons[pos]` within `seasons`. Duplicate
/// seasons (a traded player's stints) share the mean of their ranks.
fn experience_rank(seasons: &[i32], pos: usize) -> f64 {
    let s = seasons[pos];
    let below = seasons.iter().filter(|&&x| x < s).count();
    let equal = seasons.iter().filter(|&&x| x == s).count();
    below as f64 + (equal as f64 - 1.0) / 2.0
}

/// Engineer features for every record of a multi-season table.
///
/// Rows come back ordered by (player id, season, team). Each player's rows
/// are processed as one season-ordered sequence: rolling windows look back
/// along it, and a row's target is the CPI of the next row in it. A gap
/// season is skipped over, not filled.
pub fn engineer_features(table: &[PlayerSeasonRecord]) -> Vec<FeatureRow<'_>> {
    let mut order: Vec<&PlayerSeasonRecord> = table.iter().collect();
    order.sort_by(|a, b| {
        (a.player_id, a.season, &a.team_name, &a.player_name)
            .cmp(&(b.player_id, b.season, &b.team_name, &b.player_name))
    });

    let mut rows: Vec<FeatureRow<'_>> = Vec::with_capacity(order.len());
    let mut stability: Vec<Option<f64>> = Vec::with_capacity(order.len());

    for group in order.chunk_by(|a, b| a.player_id == b.player_id) {
        let cpi: Vec<f64> = group.iter().map(|r| r.cpi).collect();
        let ppg: Vec<f64> = group.iter().map(|r| r.clutch().rates.ppg).collect();
        let fg: Vec<f64> = group.iter().map(|r| r.clutch().rates.fg_pct).collect();
        let seasons: Vec<i32> = group.iter().map(|r| r.season).collect();

        for (pos, &record) in group.iter().enumerate() {
            let mut features = base_features(record);
            features[Feature::Cpi2yrAvg.index()] = trailing_mean(&cpi, pos);
            features[Feature::PpgClutch2yrAvg.index()] = trailing_mean(&ppg, pos);
            features[Feature::FgPctClutch2yrAvg.index()] = trailing_mean(&fg, pos);
            features[Feature::Experience.index()] = experience_rank(&seasons, pos);

            stability.push(trailing_stdev(&ppg, pos));
            rows.push(FeatureRow {
                record,
                features,
                target: cpi.get(pos + 1).copied(),
            });
        }
    }

    // Short histories take the median stability of the whole table.
    let observed: Vec<f64> = stability.iter().flatten().copied().collect();
    let fill = median(&observed).unwrap_or(f64::NAN);
    for (row, s) in rows.iter_mut().zip(stability) {
        row.features[Feature::PpgStability.index()] = s.unwrap_or(fill);
    }
    rows
}
