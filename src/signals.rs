use serde::Serialize;

use crate::query::{HomeAway, TeamStats};

pub fn clamp01(v: f64) -> f64 {
    v.min(1.0).max(0.0)
}

/// Morale rises with substitutions and drops when playing away.
pub fn morale(substitutions: u32, home_away: HomeAway) -> f64 {
    clamp01(0.5 + 0.1 * substitutions as f64 - 0.1 * home_away.as_f64())
}

pub fn aggression(total_shots: u32, yellow_cards: u32) -> f64 {
    clamp01(0.4 + 0.05 * total_shots as f64 - 0.2 * yellow_cards as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TeamSignals {
    pub morale: f64,
    pub aggression: f64,
}

impl TeamSignals {
    pub fn from_stats(stats: &TeamStats, home_away: HomeAway) -> Self {
        Self {
            morale: morale(stats.substitutions, home_away),
            aggression: aggression(stats.total_shots, stats.yellow_cards),
        }
    }

    /// Expected final goals given the fraction of the match already played.
    pub fn scoring_rate(&self, elapsed_fraction: f64) -> f64 {
        (1.5 * self.morale + 1.2 * self.aggression) * elapsed_fraction
    }
}
