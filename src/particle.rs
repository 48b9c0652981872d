use rand::Rng;
use rand_distr::{Distribution, Poisson};

use crate::historical::BaseRate;
use crate::query::Query;
use crate::signals::TeamSignals;
use crate::win_prob::compute_win_prob;

/// One draw from the generative model: simulated goals for both teams and
/// team 1's win value under those goals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub team1_goals: u32,
    pub team2_goals: u32,
    pub win_value: f64,
}

impl Particle {
    pub fn matches_score(&self, observed: (u32, u32)) -> bool {
        (self.team1_goals, self.team2_goals) == observed
    }
}

pub trait ParticleSource: Sync {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Particle;
}

/// Draws particles for one query. Signals and goal-rate distributions are
/// fixed at construction; only the RNG varies between draws.
pub struct ParticleGenerator<'a, B: ?Sized> {
    query: &'a Query,
    team1: TeamSignals,
    team2: TeamSignals,
    goals1: Option<Poisson<f64>>,
    goals2: Option<Poisson<f64>>,
    history: &'a B,
}

impl<'a, B: BaseRate + Sync + ?Sized> ParticleGenerator<'a, B> {
    pub fn new(query: &'a Query, history: &'a B) -> Self {
        let team1 = TeamSignals::from_stats(&query.team1, query.home_away);
        let team2 = TeamSignals::from_stats(&query.team2, query.home_away);
        let elapsed = query.elapsed_fraction();
        Self {
            query,
            team1,
            team2,
            goals1: goal_distribution(team1.scoring_rate(elapsed)),
            goals2: goal_distribution(team2.scoring_rate(elapsed)),
            history,
        }
    }

    pub fn team1(&self) -> TeamSignals {
        self.team1
    }

    pub fn team2(&self) -> TeamSignals {
        self.team2
    }
}

impl<B: BaseRate + Sync + ?Sized> ParticleSource for ParticleGenerator<'_, B> {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Particle {
        let team1_goals = draw_goals(self.goals1.as_ref(), rng);
        let team2_goals = draw_goals(self.goals2.as_ref(), rng);

        let drawn1 = TeamSignals {
            morale: bernoulli(self.team1.morale, rng),
            aggression: bernoulli(self.team1.aggression, rng),
        };
        let drawn2 = TeamSignals {
            morale: bernoulli(self.team2.morale, rng),
            aggression: bernoulli(self.team2.aggression, rng),
        };

        let win_value = compute_win_prob(
            drawn1,
            drawn2,
            self.query.home_away,
            self.query.time,
            team1_goals,
            team2_goals,
            self.history,
        );

        Particle {
            team1_goals,
            team2_goals,
            win_value,
        }
    }
}

// A zero rate (kick-off) always yields zero goals; Poisson rejects it.
fn goal_distribution(rate: f64) -> Option<Poisson<f64>> {
    if rate > 0.0 {
        Poisson::new(rate).ok()
    } else {
        None
    }
}

fn draw_goals<R: Rng + ?Sized>(dist: Option<&Poisson<f64>>, rng: &mut R) -> u32 {
    match dist {
        Some(dist) => dist.sample(rng) as u32,
        None => 0,
    }
}

fn bernoulli<R: Rng + ?Sized>(p: f64, rng: &mut R) -> f64 {
    if rng.gen_bool(p.clamp(0.0, 1.0)) { 1.0 } else { 0.0 }
}
