// End-to-end: raw CSV sources -> processed tables -> cached model -> predictions.

use clutchcast_app::cli::{run, Command};
use clutchcast_app::config::Config;
use clutchcast_app::pipeline::{write_predictions, Forecast, Pipeline, MODEL_REPORT_FILE};
use clutchcast_core::table::{PLAYER_TABLE_FILE, TEAM_TABLE_FILE};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const TEAMS: u64 = 6;
const PLAYERS_PER_TEAM: u64 = 8;
const SEASONS: [i32; 4] = [2016, 2017, 2018, 2019];

/// Write games.csv, games_details.csv and teams.csv for a small league.
/// Every pair of teams meets four times a season and every player plays
/// every game; about half the games finish within five points.
fn write_raw_league(dir: &Path, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    fs::create_dir_all(dir).unwrap();

    let mut teams = String::from("TEAM_ID,CITY,NICKNAME\n");
    for t in 1..=TEAMS {
        writeln!(teams, "{t},City{t},Club{t}").unwrap();
    }

    let skill: Vec<f64> = (0..TEAMS * PLAYERS_PER_TEAM)
        .map(|_| rng.gen_range(-1.0..1.0))
        .collect();

    let mut games = String::from(
        "GAME_DATE_EST,GAME_ID,SEASON,HOME_TEAM_ID,VISITOR_TEAM_ID,PTS_home,PTS_away,HOME_TEAM_WINS\n",
    );
    let mut details = String::from(
        "GAME_ID,TEAM_ID,PLAYER_ID,PLAYER_NAME,MIN,FGM,FGA,FG3M,FG3A,FTM,FTA,OREB,DREB,REB,AST,STL,BLK,TO,PF,PTS,PLUS_MINUS\n",
    );

    let mut game_id = 10_000u64;
    for season in SEASONS {
        let mut day = 1u32;
        for meeting in 0..4 {
            for home in 1..=TEAMS {
                for visitor in (home + 1)..=TEAMS {
                    let (home, visitor) = if meeting % 2 == 0 { (home, visitor) } else { (visitor, home) };
                    game_id += 1;
                    let margin = rng.gen_range(1..12) as f64;
                    let home_wins = rng.gen_bool(0.5);
                    let (home_pts, away_pts) = if home_wins {
                        (100.0 + margin, 100.0)
                    } else {
                        (100.0, 100.0 + margin)
                    };
                    writeln!(
                        games,
                        "{season}-{:02}-{:02},{game_id},{season},{home},{visitor},{home_pts},{away_pts},{}",
                        10 + day / 28,
                        1 + day % 28,
                        u8::from(home_wins)
                    )
                    .unwrap();
                    day += 1;

                    for team in [home, visitor] {
                        for slot in 0..PLAYERS_PER_TEAM {
                            let player_id = team * 100 + slot;
                            let s = skill[((team - 1) * PLAYERS_PER_TEAM + slot) as usize];
                            let fga = (9.0 + 3.0 * s + rng.gen_range(-2.0..2.0)).round().max(1.0);
                            let fgm = (fga * (0.45 + 0.05 * s + rng.gen_range(-0.1..0.1)))
                                .round()
                                .clamp(0.0, fga);
                            let fg3a: f64 = rng.gen_range(0..5) as f64;
                            let fg3m = (fg3a * 0.35).round().min(fgm);
                            let fta: f64 = rng.gen_range(0..6) as f64;
                            let ftm = (fta * 0.75).round();
                            let pts = 2.0 * fgm + fg3m + ftm;
                            let ast = (3.0 + 2.0 * s + rng.gen_range(-1.5..1.5)).round().max(0.0);
                            let tov = rng.gen_range(0..4) as f64;
                            let reb = rng.gen_range(1..9) as f64;
                            let plus_minus = (4.0 * s + rng.gen_range(-6.0..6.0)).round();
                            let minutes = 18 + rng.gen_range(0..16);
                            writeln!(
                                details,
                                "{game_id},{team},{player_id},Player {player_id},{minutes}:{:02},{fgm},{fga},{fg3m},{fg3a},{ftm},{fta},1,{},{reb},{ast},1,0,{tov},2,{pts},{plus_minus}",
                                rng.gen_range(0..60),
                                reb - 1.0
                            )
                            .unwrap();
                        }
                    }
                }
            }
        }
    }

    fs::write(dir.join("teams.csv"), teams).unwrap();
    fs::write(dir.join("games.csv"), games).unwrap();
    fs::write(dir.join("games_details.csv"), details).unwrap();
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.data.raw_dir = root.join("raw");
    config.data.processed_dir = root.join("processed");
    config.model.forest.n_estimators = 25;
    config.model.boosting.n_estimators = 30;
    config
}

#[test]
fn build_train_predict_with_cache() {
    let root = scratch("clutchcast_e2e_full");
    write_raw_league(&root.join("raw"), 3);
    let config = test_config(&root);
    let mut pipeline = Pipeline::new(config.clone());

    let built = pipeline.build(&config.data.raw_dir).unwrap();
    let players = (TEAMS * PLAYERS_PER_TEAM) as usize;
    assert_eq!(built.players.len(), players * SEASONS.len());
    assert_eq!(built.teams.len(), TEAMS as usize * SEASONS.len());
    assert!(root.join("processed").join(PLAYER_TABLE_FILE).exists());
    assert!(root.join("processed").join(TEAM_TABLE_FILE).exists());

    let table = pipeline.load_player_table().unwrap();
    assert_eq!(table, built.players);

    let first = pipeline.train(&table).unwrap();
    assert!(!first.cache_hit);
    let metrics = first.outcome.metrics().expect("enough rows to train");
    assert!(metrics.train_rows + metrics.test_rows >= 100);

    let second = pipeline.train(&table).unwrap();
    assert!(second.cache_hit);
    assert_eq!(first.key, second.key);
    assert!(std::sync::Arc::ptr_eq(&first.outcome, &second.outcome));

    match pipeline.predict(&table, 2019).unwrap() {
        Forecast::Ranked(predictions) => {
            assert_eq!(predictions.len(), players);
            assert!(predictions
                .windows(2)
                .all(|w| w[0].predicted_cpi >= w[1].predicted_cpi));
        }
        other => panic!("expected predictions, got {other:?}"),
    }

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn changed_parameters_train_a_new_model() {
    let root = scratch("clutchcast_e2e_params");
    write_raw_league(&root.join("raw"), 5);
    let config = test_config(&root);
    let mut pipeline = Pipeline::new(config.clone());
    pipeline.build(&config.data.raw_dir).unwrap();
    let table = pipeline.load_player_table().unwrap();
    let base = pipeline.train(&table).unwrap();

    let mut changed = config.clone();
    changed.model.seed += 1;
    let mut other = Pipeline::new(changed);
    let retrained = other.train(&table).unwrap();
    assert_ne!(base.key, retrained.key);
    assert!(!retrained.cache_hit);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn rebuilding_is_byte_identical() {
    let root = scratch("clutchcast_e2e_rebuild");
    write_raw_league(&root.join("raw"), 9);
    let config = test_config(&root);
    let pipeline = Pipeline::new(config.clone());

    pipeline.build(&config.data.raw_dir).unwrap();
    let first = fs::read(root.join("processed").join(PLAYER_TABLE_FILE)).unwrap();
    pipeline.build(&config.data.raw_dir).unwrap();
    let second = fs::read(root.join("processed").join(PLAYER_TABLE_FILE)).unwrap();
    assert_eq!(first, second);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn missing_source_writes_nothing() {
    let root = scratch("clutchcast_e2e_missing");
    write_raw_league(&root.join("raw"), 1);
    fs::remove_file(root.join("raw").join("teams.csv")).unwrap();
    let config = test_config(&root);
    let pipeline = Pipeline::new(config.clone());

    let err = pipeline.build(&config.data.raw_dir).unwrap_err();
    assert!(err.to_string().contains("teams"));
    assert!(!root.join("processed").exists());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn cli_commands_write_outputs() {
    let root = scratch("clutchcast_e2e_cli");
    write_raw_league(&root.join("raw"), 7);
    let mut pipeline = Pipeline::new(test_config(&root));
    let mut out = Vec::new();

    run(Command::Build { raw_dir: None }, &mut pipeline, &mut out).unwrap();
    run(Command::Train, &mut pipeline, &mut out).unwrap();
    assert!(root.join("processed").join(MODEL_REPORT_FILE).exists());
    let report: serde_json::Value =
        serde_json::from_slice(&fs::read(root.join("processed").join(MODEL_REPORT_FILE)).unwrap())
            .unwrap();
    assert!(report["metrics"]["test_r2"].is_number());
    let selected = report["selected_features"].as_array().unwrap();
    assert!(!selected.is_empty());
    let scores = report["selection_scores"].as_array().unwrap();
    assert_eq!(scores.len(), selected.len());
    assert_eq!(scores[0]["feature"], selected[0]);

    run(
        Command::Predict {
            season: 2019,
            top: Some(3),
        },
        &mut pipeline,
        &mut out,
    )
    .unwrap();
    assert!(root.join("processed").join("predictions_2019.csv").exists());

    run(
        Command::Profile {
            player: "Player 101".into(),
            season: 2018,
        },
        &mut pipeline,
        &mut out,
    )
    .unwrap();
    run(
        Command::Simulate {
            player: "Nobody".into(),
            season: 2018,
            shot_increase: 10.0,
        },
        &mut pipeline,
        &mut out,
    )
    .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Built 192 player-season rows"));
    assert!(text.contains("   1. "));
    assert!(!text.contains("   4. "));
    assert!(text.contains("Player 101 (City1 Club1, 2018)"));
    assert!(text.contains("No record for Nobody in season 2018"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn analysis_commands_read_both_tables() {
    let root = scratch("clutchcast_e2e_analysis");
    write_raw_league(&root.join("raw"), 11);
    let mut pipeline = Pipeline::new(test_config(&root));
    let mut out = Vec::new();

    run(Command::Build { raw_dir: None }, &mut pipeline, &mut out).unwrap();
    let teams = pipeline.load_team_table().unwrap();
    assert_eq!(teams.len(), TEAMS as usize * SEASONS.len());

    let mut run_cmd = |command| {
        let mut buf = Vec::new();
        run(command, &mut pipeline, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    };

    let leaders = run_cmd(Command::Leaders {
        season: None,
        top: Some(5),
        metric: clutchcast_core::analysis::RankMetric::Cpi,
    });
    assert!(leaders.contains("Clutch leaders 2019 by CPI"));
    assert!(leaders.contains("   5. "));
    assert!(!leaders.contains("   6. "));

    let missing_season = run_cmd(Command::Leaders {
        season: Some(1990),
        top: None,
        metric: clutchcast_core::analysis::RankMetric::PpgClutch,
    });
    assert!(missing_season.contains("No players in season 1990; seasons available: 2019, 2018, 2017, 2016"));

    let team = run_cmd(Command::Team {
        team: "City1 Club1".into(),
        season: Some(2018),
    });
    assert!(team.contains("City1 Club1 (2018)"));
    assert!(team.contains("clutch WIN% diff"));
    assert!(team.contains("Top clutch performers"));
    assert!(!team.contains("   6. "));

    let unknown_team = run_cmd(Command::Team {
        team: "Nowhere".into(),
        season: Some(2018),
    });
    assert!(unknown_team.contains("No record for team Nowhere in season 2018"));
    assert!(unknown_team.contains("Teams in 2018: City1 Club1, City2 Club2"));

    let compare = run_cmd(Command::Compare {
        player_a: "Player 101".into(),
        player_b: "Player 202".into(),
        season: 2018,
    });
    for column in ["CPI", "GP_clutch", "FG_PCT_diff", "PLUS_MINUS_PER_GAME_clutch"] {
        assert!(compare.contains(column), "missing {column} in {compare}");
    }
    let compare_missing = run_cmd(Command::Compare {
        player_a: "Player 101".into(),
        player_b: "Nobody".into(),
        season: 2018,
    });
    assert_eq!(compare_missing, "No record for Nobody in season 2018\n");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn empty_forecast_file_keeps_its_header() {
    let root = scratch("clutchcast_e2e_empty_forecast");
    let path = write_predictions(&root, 2040, &[]).unwrap();
    let text = fs::read_to_string(path).unwrap();
    assert_eq!(text.lines().next(), Some("player_id,player_name,team_name,season,predicted_cpi"));
    let _ = fs::remove_dir_all(&root);
}
