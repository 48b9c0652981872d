use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::dataset::{EventLog, FinalScore, MatchData};
use crate::query::HomeAway;

/// Returned when no historical match passed through the queried state.
pub const NEUTRAL_RATE: f64 = 0.5;

/// Anything that can answer "how often did team 1 go on to win from here".
pub trait BaseRate {
    fn base_rate(&self, home_away: HomeAway, time: u32, team1_goals: u32, team2_goals: u32) -> f64;
}

impl<F> BaseRate for F
where
    F: Fn(HomeAway, u32, u32, u32) -> f64,
{
    fn base_rate(&self, home_away: HomeAway, time: u32, team1_goals: u32, team2_goals: u32) -> f64 {
        self(home_away, time, team1_goals, team2_goals)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub wins: usize,
    pub matches: usize,
}

impl Tally {
    pub fn rate(&self) -> f64 {
        if self.matches == 0 {
            NEUTRAL_RATE
        } else {
            (self.wins as f64 / self.matches as f64).clamp(0.0, 1.0)
        }
    }
}

/// Empirical win rate mined from the event log and the final results.
#[derive(Debug, Clone)]
pub struct HistoricalFrequency {
    data: Arc<MatchData>,
}

impl HistoricalFrequency {
    pub fn new(data: Arc<MatchData>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &MatchData {
        &self.data
    }

    pub fn tally(
        &self,
        home_away: HomeAway,
        time_cutoff: u32,
        team1_goals: u32,
        team2_goals: u32,
    ) -> Tally {
        let mut tally = Tally::default();
        for (match_id, events) in self.data.events.matches() {
            let (home, away) = EventLog::score_at(events, time_cutoff);
            if orient(home_away, home, away) != (team1_goals, team2_goals) {
                continue;
            }
            let Some(result) = self.data.results.get(match_id) else {
                continue;
            };
            tally.matches += 1;
            if team1_won(home_away, result) {
                tally.wins += 1;
            }
        }
        tally
    }

    pub fn estimate(
        &self,
        home_away: HomeAway,
        time_cutoff: u32,
        team1_goals: u32,
        team2_goals: u32,
    ) -> f64 {
        self.tally(home_away, time_cutoff, team1_goals, team2_goals)
            .rate()
    }

    /// One pass over the log that answers every score reached at `time_cutoff`.
    pub fn cutoff_table(&self, home_away: HomeAway, time_cutoff: u32) -> CutoffTable {
        let mut by_score: HashMap<(u32, u32), Tally> = HashMap::new();
        for (match_id, events) in self.data.events.matches() {
            let Some(result) = self.data.results.get(match_id) else {
                continue;
            };
            let (home, away) = EventLog::score_at(events, time_cutoff);
            let entry = by_score.entry(orient(home_away, home, away)).or_default();
            entry.matches += 1;
            if team1_won(home_away, result) {
                entry.wins += 1;
            }
        }
        debug!(
            home_away = home_away.as_u8(),
            time_cutoff,
            states = by_score.len(),
            "historical cutoff table built"
        );
        CutoffTable {
            home_away,
            time_cutoff,
            by_score,
            source: self.clone(),
        }
    }
}

impl BaseRate for HistoricalFrequency {
    fn base_rate(&self, home_away: HomeAway, time: u32, team1_goals: u32, team2_goals: u32) -> f64 {
        self.estimate(home_away, time, team1_goals, team2_goals)
    }
}

/// Historical tallies for a fixed (venue, minute), keyed by team 1 / team 2 score.
#[derive(Debug, Clone)]
pub struct CutoffTable {
    home_away: HomeAway,
    time_cutoff: u32,
    by_score: HashMap<(u32, u32), Tally>,
    source: HistoricalFrequency,
}

impl CutoffTable {
    pub fn tally(&self, team1_goals: u32, team2_goals: u32) -> Tally {
        self.by_score
            .get(&(team1_goals, team2_goals))
            .copied()
            .unwrap_or_default()
    }

    pub fn rate(&self, team1_goals: u32, team2_goals: u32) -> f64 {
        self.tally(team1_goals, team2_goals).rate()
    }

    pub fn home_away(&self) -> HomeAway {
        self.home_away
    }

    pub fn time_cutoff(&self) -> u32 {
        self.time_cutoff
    }
}

impl BaseRate for CutoffTable {
    fn base_rate(&self, home_away: HomeAway, time: u32, team1_goals: u32, team2_goals: u32) -> f64 {
        if home_away == self.home_away && time == self.time_cutoff {
            self.rate(team1_goals, team2_goals)
        } else {
            self.source
                .estimate(home_away, time, team1_goals, team2_goals)
        }
    }
}

fn orient(home_away: HomeAway, home: u32, away: u32) -> (u32, u32) {
    match home_away {
        HomeAway::Home => (home, away),
        HomeAway::Away => (away, home),
    }
}

fn team1_won(home_away: HomeAway, result: FinalScore) -> bool {
    match home_away {
        HomeAway::Home => result.home_goals > result.away_goals,
        HomeAway::Away => result.away_goals > result.home_goals,
    }
}
