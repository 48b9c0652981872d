use anyhow::anyhow;
use serde::{Deserialize, Serialize};

pub const FULL_TIME_MINUTES: u32 = 95;

/// Team 1's venue. Encoded as 0 (home) / 1 (away) on every external surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum HomeAway {
    #[default]
    Home,
    Away,
}

impl HomeAway {
    pub fn as_u8(self) -> u8 {
        match self {
            HomeAway::Home => 0,
            HomeAway::Away => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        self.as_u8() as f64
    }

    pub fn toggled(self) -> Self {
        match self {
            HomeAway::Home => HomeAway::Away,
            HomeAway::Away => HomeAway::Home,
        }
    }
}

impl TryFrom<u8> for HomeAway {
    type Error = anyhow::Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(HomeAway::Home),
            1 => Ok(HomeAway::Away),
            other => Err(anyhow!("home_away must be 0 or 1, got {other}")),
        }
    }
}

impl From<HomeAway> for u8 {
    fn from(value: HomeAway) -> Self {
        value.as_u8()
    }
}

/// Per-team observables collected for one in-play query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamStats {
    #[serde(default)]
    pub substitutions: u32,
    #[serde(default)]
    pub yellow_cards: u32,
    #[serde(default)]
    pub total_shots: u32,
    #[serde(default)]
    pub goals: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub home_away: HomeAway,
    #[serde(default)]
    pub time: u32,
    pub team1: TeamStats,
    pub team2: TeamStats,
}

impl Query {
    pub fn observed_score(&self) -> (u32, u32) {
        (self.team1.goals, self.team2.goals)
    }

    /// Fraction of the match already played, capped at full time.
    pub fn elapsed_fraction(&self) -> f64 {
        self.time.min(FULL_TIME_MINUTES) as f64 / FULL_TIME_MINUTES as f64
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_away_round_trips_through_integers() {
        assert_eq!(HomeAway::try_from(0).unwrap(), HomeAway::Home);
        assert_eq!(HomeAway::try_from(1).unwrap(), HomeAway::Away);
        assert!(HomeAway::try_from(2).is_err());
        assert_eq!(HomeAway::Away.toggled(), HomeAway::Home);
    }

    #[test]
    fn query_parses_with_defaults() {
        let q = Query::from_json(
            r#"{"home_away":1,"time":30,"team1":{"goals":1},"team2":{"total_shots":4}}"#,
        )
        .unwrap();
        assert_eq!(q.home_away, HomeAway::Away);
        assert_eq!(q.observed_score(), (1, 0));
        assert_eq!(q.team2.total_shots, 4);
        assert!(Query::from_json(r#"{"home_away":3,"team1":{},"team2":{}}"#).is_err());
    }

    #[test]
    fn elapsed_fraction_caps_at_full_time() {
        let mut q = Query::default();
        assert_eq!(q.elapsed_fraction(), 0.0);
        q.time = 95;
        assert_eq!(q.elapsed_fraction(), 1.0);
        q.time = 120;
        assert_eq!(q.elapsed_fraction(), 1.0);
    }
}
