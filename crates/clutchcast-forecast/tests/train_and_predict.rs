// Training and prediction over a seeded synthetic multi-season table.

use clutchcast_core::record::{Differentials, PlayerSeasonRecord, RateLine, Split, SplitLine};
use clutchcast_forecast::boosting::BoostingParams;
use clutchcast_forecast::dataset::build_training_set;
use clutchcast_forecast::features::engineer_features;
use clutchcast_forecast::forest::ForestParams;
use clutchcast_forecast::{predict, train_ensemble, Member, TrainOutcome, TrainParams};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// `players` players over `seasons` consecutive seasons. Each player has a
/// latent skill that drifts, so next-season CPI is learnable.
fn league(players: u64, seasons: i32, seed: u64) -> Vec<PlayerSeasonRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut table = Vec::new();
    for id in 1..=players {
        let mut skill: f64 = rng.gen_range(-1.0..1.0);
        for s in 0..seasons {
            skill += rng.gen_range(-0.2..0.2);
            let gp_clutch: u32 = rng.gen_range(5..25);
            let gp_non: u32 = rng.gen_range(20..60);
            let ppg = 8.0 + 4.0 * skill + rng.gen_range(-1.0..1.0);
            let fg = 0.44 + 0.03 * skill + rng.gen_range(-0.02..0.02);
            table.push(PlayerSeasonRecord {
                player_id: id,
                player_name: format!("Player {id}"),
                team_name: format!("Team {}", id % 10),
                season: 2015 + s,
                splits: Split {
                    clutch: SplitLine {
                        games: gp_clutch,
                        minutes: gp_clutch as f64 * 28.0,
                        rates: RateLine {
                            ppg,
                            fg_pct: fg,
                            fg3_pct: 0.35,
                            apg: 2.0 + skill,
                            rpg: 4.0,
                            topg: 1.5 - 0.2 * skill,
                            plus_minus_per_game: skill * 2.0,
                            ast_to_ratio: (2.0 + skill) / (1.5 - 0.2 * skill),
                            ft_pct: 0.78,
                        },
                        ..Default::default()
                    },
                    non_clutch: SplitLine {
                        games: gp_non,
                        minutes: gp_non as f64 * 30.0,
                        rates: RateLine {
                            ppg: ppg - 1.0,
                            fg_pct: fg - 0.01,
                            ..Default::default()
                        },
                        ..Default::default()
                    },
                },
                diff: Differentials {
                    ppg: 1.0,
                    fg_pct: 0.01,
                    ast_to_ratio: 0.0,
                },
                cpi: skill + rng.gen_range(-0.1..0.1),
            });
        }
    }
    table
}

fn fast_params() -> TrainParams {
    TrainParams {
        forest: ForestParams {
            n_estimators: 30,
            ..ForestParams::default()
        },
        boosting: BoostingParams {
            n_estimators: 40,
            ..BoostingParams::default()
        },
        ..TrainParams::default()
    }
}

#[test]
fn trains_and_ranks_a_season() {
    let table = league(60, 4, 11);
    let outcome = train_ensemble(&table, &fast_params()).unwrap();
    let TrainOutcome::Trained { model, metrics } = &outcome else {
        panic!("expected a trained model, got {outcome:?}");
    };
    // 60 players x 3 seasons with a target, minus any IQR outliers.
    assert!(metrics.train_rows + metrics.test_rows >= 100);
    assert!(metrics.train_rows + metrics.test_rows <= 180);
    assert!(metrics.test_r2.is_finite());
    assert!(metrics.train_r2 > 0.3);

    let ranked = predict(model, &table, 2018);
    assert_eq!(ranked.len(), 60);
    assert!(ranked.windows(2).all(|w| w[0].predicted_cpi >= w[1].predicted_cpi));
    assert!(ranked.iter().all(|p| p.season == 2018));
}

#[test]
fn unknown_season_predicts_nothing() {
    let table = league(60, 4, 11);
    let outcome = train_ensemble(&table, &fast_params()).unwrap();
    let model = outcome.model().expect("trained");
    assert!(predict(model, &table, 1990).is_empty());
}

#[test]
fn same_inputs_give_same_model() {
    let table = league(50, 4, 5);
    let a = train_ensemble(&table, &fast_params()).unwrap();
    let b = train_ensemble(&table, &fast_params()).unwrap();
    assert_eq!(a.metrics(), b.metrics());

    let (Some(ma), Some(mb)) = (a.model(), b.model()) else {
        panic!("expected trained models");
    };
    let pa = predict(ma, &table, 2017);
    let pb = predict(mb, &table, 2017);
    assert_eq!(pa, pb);

    let x = Array2::from_shape_fn((3, 21), |(i, j)| (i + j) as f64 * 0.1);
    assert_eq!(
        ma.predict_without(Member::Boosting, x.view()),
        mb.predict_without(Member::Boosting, x.view())
    );
}

#[test]
fn small_league_is_unavailable() {
    let table = league(20, 3, 3);
    match train_ensemble(&table, &TrainParams::default()).unwrap() {
        TrainOutcome::Unavailable {
            usable_rows,
            required,
        } => {
            assert!(usable_rows <= 40);
            assert_eq!(required, 100);
        }
        other => panic!("expected unavailable, got {other:?}"),
    }
}

#[test]
fn minimum_training_rows_is_inclusive() {
    let table = league(60, 4, 11);
    let base = fast_params();
    let usable = build_training_set(&engineer_features(&table), base.min_clutch_games, base.iqr_multiplier).len();
    assert!(usable > 0);

    let at_floor = TrainParams {
        min_training_rows: usable,
        ..base
    };
    let outcome = train_ensemble(&table, &at_floor).unwrap();
    assert!(matches!(outcome, TrainOutcome::Trained { .. }), "got {outcome:?}");

    let above_floor = TrainParams {
        min_training_rows: usable + 1,
        ..base
    };
    match train_ensemble(&table, &above_floor).unwrap() {
        TrainOutcome::Unavailable {
            usable_rows,
            required,
        } => {
            assert_eq!(usable_rows, usable);
            assert_eq!(required, usable + 1);
        }
        other => panic!("expected unavailable, got {other:?}"),
    }
}
