use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

/// Which side of the pitch an event belongs to, as encoded in the event log.
pub const SIDE_HOME: u8 = 1;
pub const SIDE_AWAY: u8 = 2;

#[derive(Debug, Clone, Deserialize)]
pub struct MatchEvent {
    #[serde(rename = "id_odsp")]
    pub match_id: String,
    pub time: u32,
    pub side: u8,
    #[serde(rename = "is_goal", deserialize_with = "flag_from_int")]
    pub is_goal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalScore {
    pub home_goals: u32,
    pub away_goals: u32,
}

#[derive(Debug, Deserialize)]
struct ResultRow {
    id_odsp: String,
    fthg: u32,
    ftag: u32,
}

/// Events grouped per match, keeping the first-seen order of match ids.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    order: Vec<String>,
    by_match: HashMap<String, Vec<MatchEvent>>,
}

impl EventLog {
    pub fn from_events(events: impl IntoIterator<Item = MatchEvent>) -> Self {
        let mut log = EventLog::default();
        for ev in events {
            log.push(ev);
        }
        log
    }

    pub fn push(&mut self, ev: MatchEvent) {
        self.touch(&ev.match_id);
        if let Some(events) = self.by_match.get_mut(&ev.match_id) {
            events.push(ev);
        }
    }

    /// Registers a match id with no usable events. It still takes part in
    /// historical lookups, as a match that stayed goalless.
    pub fn touch(&mut self, match_id: &str) {
        if !self.by_match.contains_key(match_id) {
            self.order.push(match_id.to_string());
            self.by_match.insert(match_id.to_string(), Vec::new());
        }
    }

    pub fn matches(&self) -> impl Iterator<Item = (&str, &[MatchEvent])> {
        self.order.iter().filter_map(|id| {
            self.by_match
                .get(id)
                .map(|events| (id.as_str(), events.as_slice()))
        })
    }

    pub fn match_count(&self) -> usize {
        self.order.len()
    }

    pub fn event_count(&self) -> usize {
        self.by_match.values().map(Vec::len).sum()
    }

    /// Home and away goals scored up to and including `time_cutoff`.
    pub fn score_at(events: &[MatchEvent], time_cutoff: u32) -> (u32, u32) {
        let mut home = 0;
        let mut away = 0;
        for ev in events.iter().filter(|ev| ev.is_goal && ev.time <= time_cutoff) {
            match ev.side {
                SIDE_HOME => home += 1,
                SIDE_AWAY => away += 1,
                _ => {}
            }
        }
        (home, away)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchResults {
    by_match: HashMap<String, FinalScore>,
}

impl MatchResults {
    pub fn from_rows(rows: impl IntoIterator<Item = (String, FinalScore)>) -> Self {
        let mut by_match = HashMap::new();
        for (id, score) in rows {
            // First row wins, matching a lookup that takes the first hit.
            by_match.entry(id).or_insert(score);
        }
        Self { by_match }
    }

    pub fn get(&self, match_id: &str) -> Option<FinalScore> {
        self.by_match.get(match_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_match.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_match.is_empty()
    }
}

/// The two read-only tables every estimate is computed against.
#[derive(Debug, Clone, Default)]
pub struct MatchData {
    pub events: EventLog,
    pub results: MatchResults,
}

impl MatchData {
    pub fn new(events: EventLog, results: MatchResults) -> Self {
        Self { events, results }
    }

    pub fn load(events_path: &Path, results_path: &Path) -> Result<Self> {
        let events = File::open(events_path)
            .with_context(|| format!("open event log {}", events_path.display()))?;
        let results = File::open(results_path)
            .with_context(|| format!("open match results {}", results_path.display()))?;
        let data = Self::from_readers(events, results)?;
        info!(
            matches = data.events.match_count(),
            events = data.events.event_count(),
            results = data.results.len(),
            "match data loaded"
        );
        Ok(data)
    }

    pub fn from_readers(events: impl Read, results: impl Read) -> Result<Self> {
        Ok(Self {
            events: read_events(events)?,
            results: read_results(results)?,
        })
    }
}

fn read_events(rdr: impl Read) -> Result<EventLog> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let headers = csv.headers().context("read event log header")?.clone();
    let id_col = headers.iter().position(|h| h == "id_odsp");

    let mut log = EventLog::default();
    let mut skipped = 0usize;
    for record in csv.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                note_skipped(&mut skipped, &err);
                continue;
            }
        };
        match record.deserialize::<MatchEvent>(Some(&headers)) {
            Ok(ev) => log.push(ev),
            Err(err) => {
                // The match still counts even when none of its rows decode.
                if let Some(id) = id_col.and_then(|col| record.get(col)) {
                    log.touch(id);
                }
                note_skipped(&mut skipped, &err);
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, "event rows could not be decoded");
    }
    Ok(log)
}

fn note_skipped(skipped: &mut usize, err: &csv::Error) {
    *skipped += 1;
    if *skipped <= 5 {
        warn!("skipping event row: {err}");
    }
}

fn read_results(rdr: impl Read) -> Result<MatchResults> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let mut rows = Vec::new();
    for row in csv.deserialize::<ResultRow>() {
        let row = row.context("decode match result row")?;
        let score = FinalScore {
            home_goals: row.fthg,
            away_goals: row.ftag,
        };
        rows.push((row.id_odsp, score));
    }
    Ok(MatchResults::from_rows(rows))
}

fn flag_from_int<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(raw != 0.0)
}
