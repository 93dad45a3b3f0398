// Command-line surface: argument parsing and per-command output.

use crate::pipeline::{write_model_report, write_predictions, Forecast, ModelReport, Pipeline};
use anyhow::Context;
use clap::{Parser, Subcommand};
use clutchcast_core::analysis::{
    compare_players, latest_season, league_rank, player_profile, season_leaders, seasons,
    simulate_shot_volume, team_names, team_profile, RankMetric, TeamProfile,
};
use clutchcast_core::record::{PlayerSeasonRecord, Regime};
use clutchcast_core::team::TeamSeasonRecord;
use clutchcast_forecast::TrainOutcome;
use std::io::Write;
use std::path::PathBuf;

/// Clutch performance analytics and next-season CPI forecasts.
#[derive(Debug, Parser)]
#[command(name = "clutchcast")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the processed player and team tables from the raw sources
    Build {
        /// Raw source directory (defaults to data.raw_dir)
        #[arg(long)]
        raw_dir: Option<PathBuf>,
    },
    /// Train the next-season CPI model and write the model report
    Train,
    /// Rank a season's players by predicted next-season CPI
    Predict {
        #[arg(long)]
        season: i32,
        /// Only print the first N players
        #[arg(long)]
        top: Option<usize>,
    },
    /// Show one player's clutch profile and league ranks
    Profile {
        #[arg(long)]
        player: String,
        #[arg(long)]
        season: i32,
    },
    /// Project a player's clutch line under more shot volume
    Simulate {
        #[arg(long)]
        player: String,
        #[arg(long)]
        season: i32,
        /// Percent increase in clutch field-goal attempts
        #[arg(long)]
        shot_increase: f64,
    },
    /// Show a team's clutch record and its top clutch performers
    Team {
        #[arg(long)]
        team: String,
        /// Defaults to the most recent season
        #[arg(long)]
        season: Option<i32>,
    },
    /// List a season's clutch leaders
    Leaders {
        /// Defaults to the most recent season
        #[arg(long)]
        season: Option<i32>,
        /// Rows to show (defaults to analysis.leaderboard_size)
        #[arg(long)]
        top: Option<usize>,
        /// Column to rank by, e.g. CPI or PPG_clutch
        #[arg(long, default_value = "CPI", value_parser = parse_metric)]
        metric: RankMetric,
    },
    /// Compare two players' clutch metrics in one season
    Compare {
        #[arg(long)]
        player_a: String,
        #[arg(long)]
        player_b: String,
        #[arg(long)]
        season: i32,
    },
}

fn parse_metric(name: &str) -> Result<RankMetric, String> {
    RankMetric::from_column(name).ok_or_else(|| {
        let known: Vec<&str> = RankMetric::ALL.iter().map(|m| m.column()).collect();
        format!("unknown metric `{name}`; expected one of {}", known.join(", "))
    })
}

/// Run one command, writing human-readable results to `out`.
pub fn run(command: Command, pipeline: &mut Pipeline, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Build { raw_dir } => {
            let raw_dir = raw_dir.unwrap_or_else(|| pipeline.config().data.raw_dir.clone());
            let built = pipeline
                .build(&raw_dir)
                .with_context(|| format!("failed to build tables from {}", raw_dir.display()))?;
            writeln!(
                out,
                "Built {} player-season rows and {} team-season rows in {}",
                built.players.len(),
                built.teams.len(),
                pipeline.processed_dir().display()
            )?;
        }
        Command::Train => {
            let table = load_table(pipeline)?;
            let trained = pipeline.train(&table).context("failed to train model")?;
            match ModelReport::from_model(&trained) {
                Some(report) => {
                    let path = write_model_report(pipeline.processed_dir(), &report)
                        .context("failed to write model report")?;
                    print_report(out, &report)?;
                    writeln!(out, "Report written to {}", path.display())?;
                }
                None => print_unavailable(out, &trained.outcome)?,
            }
        }
        Command::Predict { season, top } => {
            let table = load_table(pipeline)?;
            match pipeline.predict(&table, season).context("failed to predict")? {
                Forecast::Ranked(predictions) => {
                    let path = write_predictions(pipeline.processed_dir(), season, &predictions)
                        .context("failed to write predictions")?;
                    if predictions.is_empty() {
                        writeln!(out, "No predictable players in season {season}")?;
                    }
                    let shown = top.unwrap_or(predictions.len());
                    for (i, p) in predictions.iter().take(shown).enumerate() {
                        writeln!(
                            out,
                            "{:>4}. {:<28} {:<26} {:>8.3}",
                            i + 1,
                            p.player_name,
                            p.team_name,
                            p.predicted_cpi
                        )?;
                    }
                    writeln!(out, "Predictions written to {}", path.display())?;
                }
                Forecast::Unavailable {
                    usable_rows,
                    required,
                } => {
                    writeln!(
                        out,
                        "Model unavailable: {usable_rows} usable training rows, {required} required"
                    )?;
                }
            }
        }
        Command::Profile { player, season } => {
            let table = load_table(pipeline)?;
            let Some(record) = player_profile(&table, &player, season) else {
                writeln!(out, "No record for {player} in season {season}")?;
                return Ok(());
            };
            print_profile(out, record)?;
            let min_games = pipeline.config().analysis.ranking_min_clutch_games;
            for metric in RankMetric::PROFILE {
                match league_rank(&table, &player, season, metric, min_games) {
                    Some(rank) => writeln!(
                        out,
                        "  {:<22} #{} of {}",
                        metric.column(),
                        rank.rank,
                        rank.pool_size
                    )?,
                    None => writeln!(
                        out,
                        "  {:<22} unranked (under {min_games} clutch games)",
                        metric.column()
                    )?,
                }
            }
        }
        Command::Simulate {
            player,
            season,
            shot_increase,
        } => {
            let table = load_table(pipeline)?;
            let Some(record) = player_profile(&table, &player, season) else {
                writeln!(out, "No record for {player} in season {season}")?;
                return Ok(());
            };
            let (current, projected) = simulate_shot_volume(record, shot_increase);
            writeln!(out, "{} ({}), {:+}% clutch shot volume", record.player_name, season, shot_increase)?;
            writeln!(out, "  {:<10} {:>9} {:>9}", "", "current", "projected")?;
            writeln!(out, "  {:<10} {:>9.2} {:>9.2}", "PPG", current.ppg, projected.ppg)?;
            writeln!(out, "  {:<10} {:>9.2} {:>9.2}", "FGA/G", current.fga_per_game, projected.fga_per_game)?;
            writeln!(out, "  {:<10} {:>9.2} {:>9.2}", "TOPG", current.topg, projected.topg)?;
            writeln!(out, "  {:<10} {:>9.2} {:>9.2}", "AST/TO", current.ast_to, projected.ast_to)?;
        }
        Command::Team { team, season } => {
            let players = load_table(pipeline)?;
            let teams = pipeline
                .load_team_table()
                .context("failed to read the processed team table; run `clutchcast build` first")?;
            let Some(season) = resolve_season(out, &players, season)? else {
                return Ok(());
            };
            let analysis = &pipeline.config().analysis;
            match team_profile(
                &teams,
                &players,
                &team,
                season,
                analysis.leaderboard_min_clutch_games,
                analysis.team_top_players,
            ) {
                Some(profile) => print_team(out, &profile, analysis.leaderboard_min_clutch_games)?,
                None => {
                    writeln!(out, "No record for team {team} in season {season}")?;
                    let known = team_names(&teams, season);
                    if !known.is_empty() {
                        writeln!(out, "Teams in {season}: {}", known.join(", "))?;
                    }
                }
            }
        }
        Command::Leaders { season, top, metric } => {
            let table = load_table(pipeline)?;
            let Some(season) = resolve_season(out, &table, season)? else {
                return Ok(());
            };
            let analysis = &pipeline.config().analysis;
            let n = top.unwrap_or(analysis.leaderboard_size);
            let min_games = analysis.leaderboard_min_clutch_games;
            let leaders = season_leaders(&table, season, metric, min_games, n);
            writeln!(
                out,
                "Clutch leaders {season} by {} (min {min_games} clutch games)",
                metric.column()
            )?;
            for (i, r) in leaders.iter().enumerate() {
                writeln!(
                    out,
                    "{:>4}. {:<28} {:<26} {:>8.3}",
                    i + 1,
                    r.player_name,
                    r.team_name,
                    metric.value(r)
                )?;
            }
        }
        Command::Compare {
            player_a,
            player_b,
            season,
        } => {
            let table = load_table(pipeline)?;
            let a = player_profile(&table, &player_a, season);
            let b = player_profile(&table, &player_b, season);
            let (Some(a), Some(b)) = (a, b) else {
                for (name, record) in [(&player_a, a), (&player_b, b)] {
                    if record.is_none() {
                        writeln!(out, "No record for {name} in season {season}")?;
                    }
                }
                return Ok(());
            };
            writeln!(out, "{:<28} {:>16} {:>16}", season, a.player_name, b.player_name)?;
            for row in compare_players(a, b) {
                let leader = match row.first_leads() {
                    Some(true) => "A",
                    Some(false) => "B",
                    None => "-",
                };
                writeln!(
                    out,
                    "{:<28} {:>16.3} {:>16.3}  {leader}",
                    row.metric.column(),
                    row.first,
                    row.second
                )?;
            }
        }
    }
    Ok(())
}

/// The requested season, or the latest one. Prints why and returns `None`
/// when the table has nothing for it.
fn resolve_season(
    out: &mut impl Write,
    table: &[PlayerSeasonRecord],
    season: Option<i32>,
) -> anyhow::Result<Option<i32>> {
    let Some(season) = season.or_else(|| latest_season(table)) else {
        writeln!(out, "The player table is empty")?;
        return Ok(None);
    };
    let available = seasons(table);
    if available.contains(&season) {
        return Ok(Some(season));
    }
    let listed: Vec<String> = available.iter().map(|s| s.to_string()).collect();
    writeln!(
        out,
        "No players in season {season}; seasons available: {}",
        listed.join(", ")
    )?;
    Ok(None)
}

fn load_table(pipeline: &Pipeline) -> anyhow::Result<Vec<PlayerSeasonRecord>> {
    pipeline
        .load_player_table()
        .context("failed to read the processed player table; run `clutchcast build` first")
}

fn print_report(out: &mut impl Write, report: &ModelReport) -> anyhow::Result<()> {
    let m = &report.metrics;
    writeln!(out, "Model {}", report.model_key)?;
    writeln!(out, "  rows        {} train / {} test", m.train_rows, m.test_rows)?;
    writeln!(out, "  R2          {:.4} train / {:.4} test", m.train_r2, m.test_r2)?;
    writeln!(out, "  MAE         {:.4}", m.mae)?;
    writeln!(out, "  RMSE        {:.4}", m.rmse)?;
    writeln!(out, "Selection F scores:")?;
    for s in &report.selection_scores {
        writeln!(out, "  {:<28} {:.2}", s.feature, s.f_score)?;
    }
    writeln!(out, "Feature importances:")?;
    for f in &report.feature_importances {
        writeln!(out, "  {:<28} {:.4}", f.feature, f.importance)?;
    }
    Ok(())
}

fn print_unavailable(out: &mut impl Write, outcome: &TrainOutcome) -> anyhow::Result<()> {
    if let TrainOutcome::Unavailable {
        usable_rows,
        required,
    } = outcome
    {
        writeln!(
            out,
            "Model unavailable: {usable_rows} usable training rows, {required} required"
        )?;
    }
    Ok(())
}

fn print_profile(out: &mut impl Write, r: &PlayerSeasonRecord) -> anyhow::Result<()> {
    writeln!(out, "{} ({}, {})  CPI {:.3}", r.player_name, r.team_name, r.season, r.cpi)?;
    writeln!(out, "  {:<8} {:>6} {:>7} {:>7} {:>6} {:>6} {:>6} {:>7}", "", "GP", "PPG", "FG%", "APG", "RPG", "TOPG", "AST/TO")?;
    for regime in [Regime::Clutch, Regime::NonClutch] {
        let line = r.splits.get(regime);
        let rates = &line.rates;
        writeln!(
            out,
            "  {:<8} {:>6} {:>7.2} {:>7.3} {:>6.2} {:>6.2} {:>6.2} {:>7.2}",
            match regime {
                Regime::Clutch => "clutch",
                Regime::NonClutch => "other",
            },
            line.games,
            rates.ppg,
            rates.fg_pct,
            rates.apg,
            rates.rpg,
            rates.topg,
            rates.ast_to_ratio
        )?;
    }
    writeln!(
        out,
        "  diff     PPG {:+.2}  FG% {:+.3}  AST/TO {:+.2}",
        r.diff.ppg, r.diff.fg_pct, r.diff.ast_to_ratio
    )?;
    Ok(())
}

fn print_team(out: &mut impl Write, profile: &TeamProfile<'_>, min_games: u32) -> anyhow::Result<()> {
    let record: &TeamSeasonRecord = profile.record;
    writeln!(out, "{} ({})", record.team_name, record.season)?;
    writeln!(out, "  {:<8} {:>5} {:>5} {:>5} {:>7}", "", "GP", "W", "L", "WIN%")?;
    for regime in [Regime::Clutch, Regime::NonClutch] {
        let split = record.splits.get(regime);
        writeln!(
            out,
            "  {:<8} {:>5} {:>5} {:>5} {:>7.3}",
            match regime {
                Regime::Clutch => "clutch",
                Regime::NonClutch => "other",
            },
            split.games,
            split.wins,
            split.games.saturating_sub(split.wins),
            split.win_pct
        )?;
    }
    writeln!(out, "  clutch WIN% diff {:+.3}", profile.win_pct_diff())?;

    if profile.top_players.is_empty() {
        writeln!(out, "No players with {min_games}+ clutch games")?;
        return Ok(());
    }
    writeln!(out, "Top clutch performers (min {min_games} clutch games):")?;
    writeln!(
        out,
        "      {:<28} {:>7} {:>4} {:>7} {:>7} {:>8}",
        "", "CPI", "GP", "PPG", "FG%", "FG% diff"
    )?;
    for (i, r) in profile.top_players.iter().enumerate() {
        let clutch = r.clutch();
        writeln!(
            out,
            "{:>4}. {:<28} {:>7.3} {:>4} {:>7.2} {:>7.3} {:>+8.3}",
            i + 1,
            r.player_name,
            r.cpi,
            clutch.games,
            clutch.rates.ppg,
            clutch.rates.fg_pct,
            r.diff.fg_pct
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_predict_with_top() {
        let cli = Cli::try_parse_from(["clutchcast", "predict", "--season", "2021", "--top", "5"]).unwrap();
        match cli.command {
            Command::Predict { season, top } => {
                assert_eq!(season, 2021);
                assert_eq!(top, Some(5));
            }
            other => panic!("expected predict, got {other:?}"),
        }
    }

    #[test]
    fn parses_simulate() {
        let cli = Cli::try_parse_from([
            "clutchcast",
            "simulate",
            "--player",
            "Jane Doe",
            "--season",
            "2019",
            "--shot-increase",
            "20",
        ])
        .unwrap();
        match cli.command {
            Command::Simulate {
                player,
                season,
                shot_increase,
            } => {
                assert_eq!(player, "Jane Doe");
                assert_eq!(season, 2019);
                assert_eq!(shot_increase, 20.0);
            }
            other => panic!("expected simulate, got {other:?}"),
        }
    }

    #[test]
    fn predict_requires_season() {
        assert!(Cli::try_parse_from(["clutchcast", "predict"]).is_err());
    }

    #[test]
    fn parses_leaders_metric_by_column_name() {
        let cli = Cli::try_parse_from(["clutchcast", "leaders", "--metric", "ppg_clutch", "--top", "3"]).unwrap();
        match cli.command {
            Command::Leaders { season, top, metric } => {
                assert_eq!(season, None);
                assert_eq!(top, Some(3));
                assert_eq!(metric, RankMetric::PpgClutch);
            }
            other => panic!("expected leaders, got {other:?}"),
        }

        let cli = Cli::try_parse_from(["clutchcast", "leaders", "--season", "2019"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Leaders {
                season: Some(2019),
                metric: RankMetric::Cpi,
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_leaders_metric() {
        let err = Cli::try_parse_from(["clutchcast", "leaders", "--metric", "dunks"]).unwrap_err();
        assert!(err.to_string().contains("PLUS_MINUS_PER_GAME_clutch"));
    }

    #[test]
    fn parses_compare_and_team() {
        let cli = Cli::try_parse_from([
            "clutchcast",
            "compare",
            "--player-a",
            "A",
            "--player-b",
            "B",
            "--season",
            "2018",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Compare { season: 2018, .. }));

        let cli = Cli::try_parse_from(["clutchcast", "team", "--team", "City1 Club1"]).unwrap();
        match cli.command {
            Command::Team { team, season } => {
                assert_eq!(team, "City1 Club1");
                assert_eq!(season, None);
            }
            other => panic!("expected team, got {other:?}"),
        }
        assert!(Cli::try_parse_from(["clutchcast", "compare", "--player-a", "A"]).is_err());
    }
}
