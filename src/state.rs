use std::collections::VecDeque;

use crate::estimator::Estimate;
use crate::query::{FULL_TIME_MINUTES, HomeAway, Query};

/// Dashboard inputs, in sidebar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Time,
    HomeAway,
    Team1Substitutions,
    Team2Substitutions,
    Team1YellowCards,
    Team2YellowCards,
    Team1TotalShots,
    Team2TotalShots,
    Team1Goals,
    Team2Goals,
}

pub const INPUT_FIELDS: [InputField; 10] = [
    InputField::Time,
    InputField::HomeAway,
    InputField::Team1Substitutions,
    InputField::Team2Substitutions,
    InputField::Team1YellowCards,
    InputField::Team2YellowCards,
    InputField::Team1TotalShots,
    InputField::Team2TotalShots,
    InputField::Team1Goals,
    InputField::Team2Goals,
];

impl InputField {
    pub fn label(self) -> &'static str {
        match self {
            InputField::Time => "Current game time (minutes)",
            InputField::HomeAway => "Home (0) or Away (1)",
            InputField::Team1Substitutions => "Team 1 Substitutions",
            InputField::Team2Substitutions => "Team 2 Substitutions",
            InputField::Team1YellowCards => "Team 1 Yellow Cards",
            InputField::Team2YellowCards => "Team 2 Yellow Cards",
            InputField::Team1TotalShots => "Team 1 Total Shots",
            InputField::Team2TotalShots => "Team 2 Total Shots",
            InputField::Team1Goals => "Team 1 Current Goals",
            InputField::Team2Goals => "Team 2 Current Goals",
        }
    }

    pub fn read(self, q: &Query) -> u32 {
        match self {
            InputField::Time => q.time,
            InputField::HomeAway => q.home_away.as_u8() as u32,
            InputField::Team1Substitutions => q.team1.substitutions,
            InputField::Team2Substitutions => q.team2.substitutions,
            InputField::Team1YellowCards => q.team1.yellow_cards,
            InputField::Team2YellowCards => q.team2.yellow_cards,
            InputField::Team1TotalShots => q.team1.total_shots,
            InputField::Team2TotalShots => q.team2.total_shots,
            InputField::Team1Goals => q.team1.goals,
            InputField::Team2Goals => q.team2.goals,
        }
    }

    /// Applies `step` to the field, clamping to the input's range.
    pub fn adjust(self, q: &mut Query, step: i32) {
        let bump = |v: &mut u32| *v = v.saturating_add_signed(step);
        match self {
            InputField::Time => {
                q.time = q.time.saturating_add_signed(step).min(FULL_TIME_MINUTES);
            }
            InputField::HomeAway => {
                q.home_away = if step > 0 {
                    HomeAway::Away
                } else if step < 0 {
                    HomeAway::Home
                } else {
                    q.home_away
                };
            }
            InputField::Team1Substitutions => bump(&mut q.team1.substitutions),
            InputField::Team2Substitutions => bump(&mut q.team2.substitutions),
            InputField::Team1YellowCards => bump(&mut q.team1.yellow_cards),
            InputField::Team2YellowCards => bump(&mut q.team2.yellow_cards),
            InputField::Team1TotalShots => bump(&mut q.team1.total_shots),
            InputField::Team2TotalShots => bump(&mut q.team2.total_shots),
            InputField::Team1Goals => bump(&mut q.team1.goals),
            InputField::Team2Goals => bump(&mut q.team2.goals),
        }
    }
}

#[derive(Debug, Clone)]
pub enum EstimateCommand {
    Run { generation: u64, query: Query },
}

#[derive(Debug, Clone)]
pub enum Delta {
    Estimate { generation: u64, estimate: Estimate },
    Cancelled { generation: u64 },
    Log(String),
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub query: Query,
    pub selected: usize,
    /// Bumped on every query change; results from older generations are stale.
    pub generation: u64,
    pub estimate: Option<Estimate>,
    pub pending: bool,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            query: Query::default(),
            selected: 0,
            generation: 0,
            estimate: None,
            pending: false,
            help_overlay: false,
            logs: VecDeque::new(),
        }
    }

    pub fn selected_field(&self) -> InputField {
        INPUT_FIELDS[self.selected.min(INPUT_FIELDS.len() - 1)]
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % INPUT_FIELDS.len();
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + INPUT_FIELDS.len() - 1) % INPUT_FIELDS.len();
    }

    /// Adjusts the selected input. Returns the command to send when the query changed.
    pub fn adjust_selected(&mut self, step: i32) -> Option<EstimateCommand> {
        let before = self.query;
        self.selected_field().adjust(&mut self.query, step);
        if self.query == before {
            return None;
        }
        Some(self.next_run())
    }

    pub fn next_run(&mut self) -> EstimateCommand {
        self.generation += 1;
        self.pending = true;
        EstimateCommand::Run {
            generation: self.generation,
            query: self.query,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::Estimate {
            generation,
            estimate,
        } => {
            if generation != state.generation {
                return;
            }
            state.push_log(format!(
                "[INFO] p_win {:.3} ({} of {} particles kept)",
                estimate.p_win(),
                estimate.posterior.accepted,
                estimate.posterior.drawn
            ));
            if estimate.posterior.accepted == 0 {
                state.push_log("[WARN] No particle reproduced the current score");
            }
            state.estimate = Some(estimate);
            state.pending = false;
        }
        Delta::Cancelled { generation } => {
            if generation == state.generation {
                state.pending = false;
            }
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
