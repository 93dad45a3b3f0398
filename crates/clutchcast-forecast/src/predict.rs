// Next-season CPI predictions for one season's players.

use crate::ensemble::EnsembleModel;
use crate::features::{engineer_features, N_FEATURES};
use clutchcast_core::record::PlayerSeasonRecord;
use ndarray::Array2;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub player_id: u64,
    pub player_name: String,
    pub team_name: String,
    pub season: i32,
    pub predicted_cpi: f64,
}

/// Predict next-season CPI for every `season` row of `table`.
///
/// Features are engineered over the whole table so rolling windows see
/// prior seasons. Rows missing a feature are skipped. Results are sorted by
/// predicted CPI, highest first; an empty season gives an empty result.
pub fn predict(model: &EnsembleModel, table: &[PlayerSeasonRecord], season: i32) -> Vec<Prediction> {
    let rows: Vec<_> = engineer_features(table)
        .into_iter()
        .filter(|r| r.record.season == season && r.is_complete())
        .collect();
    if rows.is_empty() {
        info!("no predictable rows for season {}", season);
        return Vec::new();
    }

    let mut flat = Vec::with_capacity(rows.len() * N_FEATURES);
    for row in &rows {
        flat.extend_from_slice(&row.features);
    }
    let Ok(x) = Array2::from_shape_vec((rows.len(), N_FEATURES), flat) else {
        return Vec::new();
    };
    let scores = model.predict(x.view());

    let mut out: Vec<Prediction> = rows
        .iter()
        .zip(scores)
        .map(|(row, predicted_cpi)| Prediction {
            player_id: row.record.player_id,
            player_name: row.record.player_name.clone(),
            team_name: row.record.team_name.clone(),
            season,
            predicted_cpi,
        })
        .collect();
    out.sort_by(|a, b| b.predicted_cpi.total_cmp(&a.predicted_cpi));
    info!("predicted {} players for season {}", out.len(), season);
    out
}
