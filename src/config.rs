use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::dataset::MatchData;
use crate::estimator::Estimator;
use crate::sampler::{DEFAULT_SAMPLES, SamplerConfig, WinAggregation};

const DEFAULT_EVENTS_CSV: &str = "data/events_subset.csv";
const DEFAULT_GINF_CSV: &str = "data/ginf.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub events_csv: PathBuf,
    pub ginf_csv: PathBuf,
    pub sampler: SamplerConfig,
    pub threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            events_csv: PathBuf::from(DEFAULT_EVENTS_CSV),
            ginf_csv: PathBuf::from(DEFAULT_GINF_CSV),
            sampler: SamplerConfig::default(),
            threads: None,
        }
    }
}

impl EngineConfig {
    /// Reads `WINPROB_*` variables; anything missing or unparseable keeps its default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let samples = lookup("WINPROB_SAMPLES")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_SAMPLES)
            .max(1);
        let seed = lookup("WINPROB_SEED").and_then(|val| val.trim().parse::<u64>().ok());
        let aggregation = lookup("WINPROB_AGGREGATION")
            .and_then(|val| WinAggregation::parse(&val))
            .unwrap_or_default();
        let threads = lookup("WINPROB_THREADS")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .map(|n| n.min(64));

        Self {
            events_csv: lookup("WINPROB_EVENTS_CSV")
                .map(PathBuf::from)
                .unwrap_or(defaults.events_csv),
            ginf_csv: lookup("WINPROB_GINF_CSV")
                .map(PathBuf::from)
                .unwrap_or(defaults.ginf_csv),
            sampler: SamplerConfig {
                samples,
                seed,
                aggregation,
            },
            threads,
        }
    }

    pub fn load_data(&self) -> Result<Arc<MatchData>> {
        Ok(Arc::new(MatchData::load(&self.events_csv, &self.ginf_csv)?))
    }

    pub fn build_estimator(&self, data: Arc<MatchData>) -> Estimator {
        let estimator = Estimator::new(data, self.sampler);
        match self.threads {
            Some(threads) => estimator.with_threads(threads),
            None => estimator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.sampler.samples, 1000);
    }

    #[test]
    fn reads_overrides() {
        let cfg = EngineConfig::from_lookup(lookup(&[
            ("WINPROB_SAMPLES", "250"),
            ("WINPROB_SEED", "7"),
            ("WINPROB_AGGREGATION", "vote"),
            ("WINPROB_THREADS", "4"),
            ("WINPROB_EVENTS_CSV", "/tmp/e.csv"),
        ]));
        assert_eq!(cfg.sampler.samples, 250);
        assert_eq!(cfg.sampler.seed, Some(7));
        assert_eq!(cfg.sampler.aggregation, WinAggregation::Vote);
        assert_eq!(cfg.threads, Some(4));
        assert_eq!(cfg.events_csv, PathBuf::from("/tmp/e.csv"));
        assert_eq!(cfg.ginf_csv, PathBuf::from("data/ginf.csv"));
    }

    #[test]
    fn garbage_values_fall_back() {
        let cfg = EngineConfig::from_lookup(lookup(&[
            ("WINPROB_SAMPLES", "0"),
            ("WINPROB_SEED", "abc"),
            ("WINPROB_AGGREGATION", "median"),
            ("WINPROB_THREADS", "0"),
        ]));
        assert_eq!(cfg.sampler.samples, 1);
        assert_eq!(cfg.sampler.seed, None);
        assert_eq!(cfg.sampler.aggregation, WinAggregation::Mean);
        assert_eq!(cfg.threads, None);
    }
}
