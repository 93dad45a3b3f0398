// Clutch Player Index: tiered composite score over five clutch metrics.
//
// High-volume players (GP_clutch >= min_clutch_games) are z-scored against
// each other. Low-volume players (0 < GP_clutch < min_clutch_games) are
// min-max normalized within their own tier, discounted by their share of
// the volume threshold, and floored. Players with no clutch games score 0.
// The two tiers are not on the same scale; CPI across tiers is only an
// approximate ranking.

use crate::record::{PlayerSeasonRecord, RateLine};
use crate::stats::{impute_non_finite, min_max_normalize, TierScale};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Weight per CPI metric. Turnovers carry a negative weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpiWeights {
    pub ppg: f64,
    pub fg_pct: f64,
    pub apg: f64,
    pub topg: f64,
    pub plus_minus: f64,
}

impl Default for CpiWeights {
    fn default() -> Self {
        Self {
            ppg: 0.30,
            fg_pct: 0.25,
            apg: 0.15,
            topg: -0.15,
            plus_minus: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpiParams {
    pub min_clutch_games: u32,
    pub low_volume_floor: f64,
    pub weights: CpiWeights,
}

impl Default for CpiParams {
    fn default() -> Self {
        Self {
            min_clutch_games: 5,
            low_volume_floor: -2.0,
            weights: CpiWeights::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics and tiers
// ---------------------------------------------------------------------------

/// The five clutch metrics the index blends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpiMetric {
    Ppg,
    FgPct,
    Apg,
    Topg,
    PlusMinus,
}

impl CpiMetric {
    pub const ALL: [CpiMetric; 5] = [
        CpiMetric::Ppg,
        CpiMetric::FgPct,
        CpiMetric::Apg,
        CpiMetric::Topg,
        CpiMetric::PlusMinus,
    ];

    pub fn value(self, rates: &RateLine) -> f64 {
        match self {
            CpiMetric::Ppg => rates.ppg,
            CpiMetric::FgPct => rates.fg_pct,
            CpiMetric::Apg => rates.apg,
            CpiMetric::Topg => rates.topg,
            CpiMetric::PlusMinus => rates.plus_minus_per_game,
        }
    }

    pub fn weight(self, weights: &CpiWeights) -> f64 {
        match self {
            CpiMetric::Ppg => weights.ppg,
            CpiMetric::FgPct => weights.fg_pct,
            CpiMetric::Apg => weights.apg,
            CpiMetric::Topg => weights.topg,
            CpiMetric::PlusMinus => weights.plus_minus,
        }
    }
}

/// Which scoring regime a player season falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// No clutch games. CPI is 0 and the player is not ranked.
    Unranked,
    LowVolume,
    HighVolume,
}

pub fn tier_for(gp_clutch: u32, params: &CpiParams) -> Tier {
    if gp_clutch == 0 {
        Tier::Unranked
    } else if gp_clutch < params.min_clutch_games {
        Tier::LowVolume
    } else {
        Tier::HighVolume
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Metric columns for a tier: `columns[m][i]` is metric `m` of member `i`.
fn metric_columns(records: &[PlayerSeasonRecord], members: &[usize]) -> Vec<Vec<f64>> {
    CpiMetric::ALL
        .iter()
        .map(|m| {
            members
                .iter()
                .map(|&i| m.value(&records[i].splits.clutch.rates))
                .collect()
        })
        .collect()
}

/// Impute every non-finite metric with its tier mean. Returns the count.
fn impute_columns(columns: &mut [Vec<f64>]) -> usize {
    columns.iter_mut().map(|c| impute_non_finite(c)).sum()
}

/// Weighted sum of per-metric z-scores across the high-volume pool.
fn score_high_volume(mut columns: Vec<Vec<f64>>, weights: &CpiWeights) -> Vec<f64> {
    let imputed = impute_columns(&mut columns);
    if imputed > 0 {
        debug!("imputed {} unscorable high-volume metric values", imputed);
    }

    let n = columns.first().map_or(0, Vec::len);
    let mut scores = vec![0.0; n];
    for (metric, column) in CpiMetric::ALL.iter().zip(&columns) {
        let w = metric.weight(weights);
        for (score, z) in scores.iter_mut().zip(TierScale::standardize(column)) {
            *score += z * w;
        }
    }
    scores
}

/// Weighted min-max score, discounted by games played and floored.
fn score_low_volume(
    mut columns: Vec<Vec<f64>>,
    games: &[u32],
    params: &CpiParams,
) -> Vec<f64> {
    let imputed = impute_columns(&mut columns);
    if imputed > 0 {
        debug!("imputed {} unscorable low-volume metric values", imputed);
    }

    let mut scores = vec![0.0; games.len()];
    for (metric, column) in CpiMetric::ALL.iter().zip(&columns) {
        let normalized = min_max_normalize(column);
        let w = metric.weight(&params.weights);
        for (score, &v) in scores.iter_mut().zip(&normalized) {
            let v = if *metric == CpiMetric::Topg { 1.0 - v } else { v };
            *score += v * w;
        }
    }

    let threshold = params.min_clutch_games as f64;
    scores
        .iter()
        .zip(games)
        .map(|(&s, &gp)| (s * gp as f64 / threshold).max(params.low_volume_floor))
        .collect()
}

/// Assign CPI to every record in place.
///
/// Scoring is relative: the pools are every record of the tier across the
/// whole table passed in.
pub fn score_players(records: &mut [PlayerSeasonRecord], params: &CpiParams) {
    let mut high = Vec::new();
    let mut low = Vec::new();
    for (i, r) in records.iter().enumerate() {
        match tier_for(r.gp_clutch(), params) {
            Tier::HighVolume => high.push(i),
            Tier::LowVolume => low.push(i),
            Tier::Unranked => {}
        }
    }
    info!(
        "scoring CPI: {} high-volume, {} low-volume, {} unranked",
        high.len(),
        low.len(),
        records.len() - high.len() - low.len()
    );

    for r in records.iter_mut() {
        r.cpi = 0.0;
    }

    if !high.is_empty() {
        let scores = score_high_volume(metric_columns(records, &high), &params.weights);
        for (&i, s) in high.iter().zip(scores) {
            records[i].cpi = s;
        }
    }

    if !low.is_empty() {
        let games: Vec<u32> = low.iter().map(|&i| records[i].gp_clutch()).collect();
        let scores = score_low_volume(metric_columns(records, &low), &games, params);
        for (&i, s) in low.iter().zip(scores) {
            records[i].cpi = s;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
