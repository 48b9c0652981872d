use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use rand::Rng;

use winprob_terminal::dataset::MatchData;
use winprob_terminal::estimator::Estimator;
use winprob_terminal::particle::{Particle, ParticleSource};
use winprob_terminal::query::{HomeAway, Query, TeamStats};
use winprob_terminal::sampler::{CancelToken, SamplerConfig, WinAggregation, rejection_sample};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fixture_data() -> Arc<MatchData> {
    let events = read_fixture("events.csv");
    let results = read_fixture("ginf.csv");
    Arc::new(MatchData::from_readers(events.as_bytes(), results.as_bytes()).unwrap())
}

fn seeded(samples: usize, seed: u64) -> SamplerConfig {
    SamplerConfig {
        samples,
        seed: Some(seed),
        aggregation: WinAggregation::Mean,
    }
}

struct NeverMatches;

impl ParticleSource for NeverMatches {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Particle {
        Particle {
            team1_goals: 10 + rng.gen_range(0..5),
            team2_goals: 10,
            win_value: 1.0,
        }
    }
}

#[test]
fn stubbed_generator_with_no_matches_gives_zero() {
    let post = rejection_sample(&NeverMatches, (1, 0), &seeded(1_000, 3), &CancelToken::new())
        .unwrap();
    assert_eq!(post.p_win, 0.0);
    assert_eq!(post.accepted, 0);
}

#[test]
fn fixture_query_is_a_probability_and_reproducible() {
    let query = Query::from_json(&read_fixture("query.json")).unwrap();
    let estimator = Estimator::new(fixture_data(), seeded(1_000, 2024));

    let a = estimator.estimate(&query, &CancelToken::new()).unwrap();
    let b = estimator.estimate(&query, &CancelToken::new()).unwrap();

    assert!((0.0..=1.0).contains(&a.p_win()));
    assert_eq!(a.posterior, b.posterior);
    assert!(a.posterior.accepted > 0);
    assert_eq!(a.historical_rate, 0.5);
    assert_eq!(a.historical_matches, 2);
    assert!((a.team1.morale - 0.6).abs() < 1e-12);
    assert!((a.team2.aggression - 0.35).abs() < 1e-12);
}

#[test]
fn unreachable_score_at_kickoff_reads_as_zero_while_history_stays_neutral() {
    let query = Query {
        home_away: HomeAway::Home,
        time: 0,
        team1: TeamStats {
            goals: 1,
            ..TeamStats::default()
        },
        team2: TeamStats::default(),
    };
    let estimator = Estimator::new(fixture_data(), seeded(500, 1));
    let est = estimator.estimate(&query, &CancelToken::new()).unwrap();

    // Every particle is 0-0 at minute 0, so none reproduce 1-0.
    assert_eq!(est.posterior.accepted, 0);
    assert_eq!(est.p_win(), 0.0);
    assert_eq!(est.historical_rate, 0.5);
}

#[test]
fn kickoff_posterior_blends_linear_model_with_history() {
    let query = Query::default();
    let estimator = Estimator::new(fixture_data(), seeded(2_000, 9));
    let est = estimator.estimate(&query, &CancelToken::new()).unwrap();

    assert_eq!(est.posterior.accepted, 2_000);
    // Five matches with results were 0-0 at kick-off; only m1 was a home win.
    assert!((est.historical_rate - 0.2).abs() < 1e-12);
    // Equal teams at home: linear part averages 0.6, history 0.2.
    assert!((est.p_win() - 0.4).abs() < 0.03, "p_win = {}", est.p_win());
}

#[test]
fn results_in_unit_interval_across_queries() {
    let estimator = Estimator::new(fixture_data(), seeded(300, 77));
    let mut rng = rand::thread_rng();
    for _ in 0..40 {
        let team = |rng: &mut rand::rngs::ThreadRng| TeamStats {
            substitutions: rng.gen_range(0..4),
            yellow_cards: rng.gen_range(0..4),
            total_shots: rng.gen_range(0..25),
            goals: rng.gen_range(0..3),
        };
        let query = Query {
            home_away: if rng.gen_bool(0.5) {
                HomeAway::Home
            } else {
                HomeAway::Away
            },
            time: rng.gen_range(0..=95),
            team1: team(&mut rng),
            team2: team(&mut rng),
        };
        let est = estimator.estimate(&query, &CancelToken::new()).unwrap();
        assert!((0.0..=1.0).contains(&est.p_win()), "{query:?}");
        assert!(est.posterior.accepted <= est.posterior.drawn);
    }
}

#[test]
fn vote_aggregation_is_also_bounded() {
    let query = Query::from_json(&read_fixture("query.json")).unwrap();
    let cfg = SamplerConfig {
        aggregation: WinAggregation::Vote,
        ..seeded(1_000, 5)
    };
    let est = Estimator::new(fixture_data(), cfg)
        .with_threads(2)
        .estimate(&query, &CancelToken::new())
        .unwrap();
    assert!((0.0..=1.0).contains(&est.p_win()));
}
