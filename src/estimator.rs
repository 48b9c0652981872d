use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::dataset::MatchData;
use crate::historical::HistoricalFrequency;
use crate::particle::ParticleGenerator;
use crate::query::Query;
use crate::sampler::{CancelToken, Posterior, SamplerConfig, rejection_sample};
use crate::signals::TeamSignals;

/// Everything one query produces: the posterior plus the intermediate values
/// the causal diagram labels.
#[derive(Debug, Clone, Serialize)]
pub struct Estimate {
    pub query: Query,
    pub team1: TeamSignals,
    pub team2: TeamSignals,
    pub historical_rate: f64,
    pub historical_matches: usize,
    pub posterior: Posterior,
}

impl Estimate {
    pub fn p_win(&self) -> f64 {
        self.posterior.p_win
    }
}

pub struct Estimator {
    history: HistoricalFrequency,
    cfg: SamplerConfig,
    pool: Option<rayon::ThreadPool>,
}

impl Estimator {
    pub fn new(data: Arc<MatchData>, cfg: SamplerConfig) -> Self {
        Self {
            history: HistoricalFrequency::new(data),
            cfg,
            pool: None,
        }
    }

    /// Runs sampling on a dedicated pool instead of rayon's global one.
    pub fn with_threads(mut self, threads: usize) -> Self {
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => self.pool = Some(pool),
            Err(err) => warn!("falling back to global rayon pool: {err}"),
        }
        self
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.cfg
    }

    pub fn history(&self) -> &HistoricalFrequency {
        &self.history
    }

    /// `None` when `cancel` fired before the run finished.
    pub fn estimate(&self, query: &Query, cancel: &CancelToken) -> Option<Estimate> {
        let table = self.history.cutoff_table(query.home_away, query.time);
        let (g1, g2) = query.observed_score();
        let tally = table.tally(g1, g2);

        let generator = ParticleGenerator::new(query, &table);
        let run = || rejection_sample(&generator, query.observed_score(), &self.cfg, cancel);
        let posterior = match self.pool.as_ref() {
            Some(pool) => pool.install(run),
            None => run(),
        }?;

        debug!(
            time = query.time,
            score = %format!("{g1}-{g2}"),
            historical = tally.rate(),
            p_win = posterior.p_win,
            "estimate ready"
        );

        Some(Estimate {
            query: *query,
            team1: generator.team1(),
            team2: generator.team2(),
            historical_rate: tally.rate(),
            historical_matches: tally.matches,
            posterior,
        })
    }
}
