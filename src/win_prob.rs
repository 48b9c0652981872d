use crate::historical::BaseRate;
use crate::query::HomeAway;
use crate::signals::{TeamSignals, clamp01};

const MORALE_WEIGHT: f64 = 0.3;
const AGGRESSION_WEIGHT: f64 = 0.2;
const GOAL_WEIGHT: f64 = 0.4;
const HOME_ADV: f64 = 0.1;

/// Hand-specified part of the estimate, before blending with history.
pub fn linear_score(
    team1: TeamSignals,
    team2: TeamSignals,
    home_away: HomeAway,
    team1_goals: u32,
    team2_goals: u32,
) -> f64 {
    let morale_factor = MORALE_WEIGHT * (team1.morale - team2.morale);
    let aggression_factor = AGGRESSION_WEIGHT * (team1.aggression - team2.aggression);
    let goal_factor = GOAL_WEIGHT * (team1_goals as f64 - team2_goals as f64);
    let home_advantage = match home_away {
        HomeAway::Home => HOME_ADV,
        HomeAway::Away => -HOME_ADV,
    };

    0.5 + morale_factor + aggression_factor + goal_factor + home_advantage
}

/// Probability that team 1 wins from the given (possibly hypothetical) score,
/// weighting the linear model and the historical base rate equally.
pub fn compute_win_prob<R: BaseRate + ?Sized>(
    team1: TeamSignals,
    team2: TeamSignals,
    home_away: HomeAway,
    time: u32,
    team1_goals: u32,
    team2_goals: u32,
    history: &R,
) -> f64 {
    let base = linear_score(team1, team2, home_away, team1_goals, team2_goals);
    let hist = history.base_rate(home_away, time, team1_goals, team2_goals);
    clamp01((base + hist) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(_: HomeAway, _: u32, _: u32, _: u32) -> f64 {
        0.5
    }

    fn always(rate: f64) -> impl Fn(HomeAway, u32, u32, u32) -> f64 {
        move |_, _, _, _| rate
    }

    fn even() -> TeamSignals {
        TeamSignals {
            morale: 0.5,
            aggression: 0.4,
        }
    }

    #[test]
    fn level_home_side_gets_home_bonus() {
        let p = compute_win_prob(even(), even(), HomeAway::Home, 30, 1, 1, &flat);
        assert!((p - 0.55).abs() < 1e-12);
    }

    #[test]
    fn level_away_side_is_penalised() {
        let p = compute_win_prob(even(), even(), HomeAway::Away, 30, 0, 0, &flat);
        assert!((p - 0.45).abs() < 1e-12);
    }

    #[test]
    fn big_lead_saturates_at_one() {
        let p = compute_win_prob(even(), even(), HomeAway::Home, 80, 4, 0, &always(1.0));
        assert_eq!(p, 1.0);
    }

    #[test]
    fn big_deficit_saturates_at_zero() {
        let p = compute_win_prob(even(), even(), HomeAway::Away, 80, 0, 4, &always(0.0));
        assert_eq!(p, 0.0);
    }

    #[test]
    fn history_sees_the_hypothesised_score() {
        let seen = std::cell::Cell::new((0, 0));
        let spy = |_: HomeAway, _: u32, g1: u32, g2: u32| {
            seen.set((g1, g2));
            0.5
        };
        compute_win_prob(even(), even(), HomeAway::Home, 60, 3, 2, &spy);
        assert_eq!(seen.get(), (3, 2));
    }

    #[test]
    fn morale_edge_moves_estimate_up() {
        let strong = TeamSignals {
            morale: 1.0,
            aggression: 0.4,
        };
        let p_even = compute_win_prob(even(), even(), HomeAway::Home, 30, 0, 0, &flat);
        let p_strong = compute_win_prob(strong, even(), HomeAway::Home, 30, 0, 0, &flat);
        assert!((p_strong - p_even - 0.075).abs() < 1e-12);
    }
}
