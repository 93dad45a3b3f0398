// Box-score cleaning: minutes parsing, lenient numeric casts, DNP removal.

use crate::raw::{CountingStats, RawBoxScoreRow};
use tracing::debug;

/// Values in the minutes column that mean "did not play".
const MINUTES_SENTINELS: [&str; 3] = ["DNP", "N/A", ""];

/// A box-score line with decimal minutes. Only lines with playing time exist.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxScoreLine {
    pub game_id: u64,
    pub team_id: u64,
    pub player_id: u64,
    pub player_name: String,
    pub minutes: f64,
    pub stats: CountingStats,
}

/// Convert a raw minutes string to decimal minutes.
///
/// - `"MM:SS"` -> minutes + seconds / 60
/// - `"HH:MM:SS"` -> hours * 60 + minutes + seconds / 60
/// - a bare number -> that number
/// - missing, sentinel, or unparsable -> 0.0
pub fn parse_minutes(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };
    let raw = raw.trim();
    if MINUTES_SENTINELS.contains(&raw) {
        return 0.0;
    }

    let parts: Vec<&str> = raw.split(':').collect();
    let parsed: Option<f64> = match parts.as_slice() {
        [m, s] => parse_part(m).zip(parse_part(s)).map(|(m, s)| m + s / 60.0),
        [h, m, s] => match (parse_part(h), parse_part(m), parse_part(s)) {
            (Some(h), Some(m), Some(s)) => Some(h * 60.0 + m + s / 60.0),
            _ => None,
        },
        [first, ..] => parse_part(first),
        [] => None,
    };

    match parsed {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

fn parse_part(part: &str) -> Option<f64> {
    part.trim().parse::<f64>().ok()
}

/// Cast a raw counting-stat cell to a number. Missing, blank, or unparsable
/// cells become 0.0.
pub fn parse_stat(raw: Option<&str>) -> f64 {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Parse minutes and drop every row without playing time.
pub fn normalize_box_scores(rows: &[RawBoxScoreRow]) -> Vec<BoxScoreLine> {
    let lines: Vec<BoxScoreLine> = rows
        .iter()
        .filter_map(|row| {
            let minutes = parse_minutes(row.minutes.as_deref());
            if minutes <= 0.0 {
                return None;
            }
            Some(BoxScoreLine {
                game_id: row.game_id,
                team_id: row.team_id,
                player_id: row.player_id,
                player_name: row.player_name.clone(),
                minutes,
                stats: row.stats,
            })
        })
        .collect();

    debug!(
        "ingest kept {} of {} box-score rows ({} without minutes dropped)",
        lines.len(),
        rows.len(),
        rows.len() - lines.len()
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn minutes_mm_ss() {
        assert!(approx_eq(parse_minutes(Some("35:24")), 35.4));
        assert!(approx_eq(parse_minutes(Some("0:30")), 0.5));
    }

    #[test]
    fn minutes_hh_mm_ss() {
        assert!(approx_eq(parse_minutes(Some("1:02:30")), 62.5));
    }

    #[test]
    fn minutes_bare_number() {
        assert!(approx_eq(parse_minutes(Some("27")), 27.0));
        assert!(approx_eq(parse_minutes(Some("12.5")), 12.5));
    }

    #[test]
    fn minutes_sentinels_and_garbage_are_zero() {
        assert_eq!(parse_minutes(None), 0.0);
        assert_eq!(parse_minutes(Some("DNP")), 0.0);
        assert_eq!(parse_minutes(Some("N/A")), 0.0);
        assert_eq!(parse_minutes(Some("")), 0.0);
        assert_eq!(parse_minutes(Some("abc")), 0.0);
        assert_eq!(parse_minutes(Some("12:xx")), 0.0);
        assert_eq!(parse_minutes(Some("NaN")), 0.0);
    }

    #[test]
    fn stat_cells_are_lenient() {
        assert_eq!(parse_stat(Some("7")), 7.0);
        assert_eq!(parse_stat(Some(" -3.0 ")), -3.0);
        assert_eq!(parse_stat(Some("")), 0.0);
        assert_eq!(parse_stat(Some("x")), 0.0);
        assert_eq!(parse_stat(None), 0.0);
    }

    #[test]
    fn zero_minute_rows_are_dropped() {
        let row = |minutes: Option<&str>| RawBoxScoreRow {
            game_id: 1,
            team_id: 10,
            player_id: 100,
            player_name: "Player".into(),
            minutes: minutes.map(String::from),
            stats: CountingStats::default(),
        };
        let rows = vec![row(Some("12:00")), row(Some("0:00")), row(None), row(Some("DNP"))];
        let lines = normalize_box_scores(&rows);
        assert_eq!(lines.len(), 1);
        assert!(approx_eq(lines[0].minutes, 12.0));
    }
}
