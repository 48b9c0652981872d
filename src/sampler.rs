use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::particle::{Particle, ParticleSource};

pub const DEFAULT_SAMPLES: usize = 1000;

/// Returned when no particle reproduced the observed score. Deliberately not
/// the historical 0.5: an empty posterior reads as "no support for a win".
pub const NO_SURVIVORS: f64 = 0.0;

/// How survivors' win values are summarised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinAggregation {
    /// Average the win probabilities carried by each particle.
    #[default]
    Mean,
    /// Count a particle as a win when its value exceeds one half.
    Vote,
}

impl WinAggregation {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mean" | "prob" | "probability" => Some(WinAggregation::Mean),
            "vote" | "binary" => Some(WinAggregation::Vote),
            _ => None,
        }
    }

    fn score(self, particle: &Particle) -> f64 {
        match self {
            WinAggregation::Mean => particle.win_value,
            WinAggregation::Vote => {
                if particle.win_value > 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub samples: usize,
    /// Fixed seed for reproducible runs; `None` draws a fresh one per run.
    pub seed: Option<u64>,
    pub aggregation: WinAggregation,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            seed: None,
            aggregation: WinAggregation::Mean,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Posterior {
    pub p_win: f64,
    pub drawn: usize,
    pub accepted: usize,
}

impl Posterior {
    pub fn acceptance_rate(&self) -> f64 {
        if self.drawn == 0 {
            0.0
        } else {
            self.accepted as f64 / self.drawn as f64
        }
    }
}

/// Shared flag that lets a newer query abort a sampling run in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Draws `cfg.samples` particles, keeps those that reproduce `observed`
/// exactly, and summarises the survivors. `None` means the run was cancelled.
pub fn rejection_sample<S: ParticleSource>(
    source: &S,
    observed: (u32, u32),
    cfg: &SamplerConfig,
    cancel: &CancelToken,
) -> Option<Posterior> {
    let seed = cfg.seed.unwrap_or_else(rand::random);

    // Each index owns its RNG stream, so the result does not depend on how
    // rayon splits the range.
    let particles: Option<Vec<Particle>> = (0..cfg.samples)
        .into_par_iter()
        .map(|idx| {
            if cancel.is_cancelled() {
                return None;
            }
            let mut rng = particle_rng(seed, idx);
            Some(source.sample(&mut rng))
        })
        .collect();
    let particles = particles?;
    if cancel.is_cancelled() {
        return None;
    }

    let posterior = summarise(&particles, observed, cfg.aggregation);
    debug!(
        seed,
        drawn = posterior.drawn,
        accepted = posterior.accepted,
        p_win = posterior.p_win,
        "rejection sampling finished"
    );
    Some(posterior)
}

pub fn summarise(particles: &[Particle], observed: (u32, u32), agg: WinAggregation) -> Posterior {
    let mut accepted = 0usize;
    let mut total = 0.0;
    for p in particles.iter().filter(|p| p.matches_score(observed)) {
        accepted += 1;
        total += agg.score(p);
    }

    let p_win = if accepted == 0 {
        NO_SURVIVORS
    } else {
        (total / accepted as f64).clamp(0.0, 1.0)
    };

    Posterior {
        p_win,
        drawn: particles.len(),
        accepted,
    }
}

fn particle_rng(seed: u64, idx: usize) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add(idx as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    struct Fixed(Particle);

    impl ParticleSource for Fixed {
        fn sample<R: Rng + ?Sized>(&self, _rng: &mut R) -> Particle {
            self.0
        }
    }

    struct CoinFlip;

    impl ParticleSource for CoinFlip {
        fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Particle {
            Particle {
                team1_goals: rng.gen_range(0..2),
                team2_goals: 0,
                win_value: rng.gen_range(0.0..1.0),
            }
        }
    }

    fn particle(g1: u32, g2: u32, win_value: f64) -> Particle {
        Particle {
            team1_goals: g1,
            team2_goals: g2,
            win_value,
        }
    }

    fn seeded(samples: usize) -> SamplerConfig {
        SamplerConfig {
            samples,
            seed: Some(42),
            aggregation: WinAggregation::Mean,
        }
    }

    #[test]
    fn no_survivors_returns_zero() {
        let source = Fixed(particle(3, 3, 0.9));
        let post = rejection_sample(&source, (1, 0), &seeded(500), &CancelToken::new()).unwrap();
        assert_eq!(post.p_win, 0.0);
        assert_eq!(post.accepted, 0);
        assert_eq!(post.drawn, 500);
    }

    #[test]
    fn survivors_are_averaged() {
        let particles = [
            particle(1, 0, 0.2),
            particle(1, 0, 0.6),
            particle(2, 0, 1.0),
        ];
        let post = summarise(&particles, (1, 0), WinAggregation::Mean);
        assert_eq!(post.accepted, 2);
        assert!((post.p_win - 0.4).abs() < 1e-12);
    }

    #[test]
    fn vote_mode_binarises_win_values() {
        let particles = [
            particle(1, 0, 0.2),
            particle(1, 0, 0.6),
            particle(1, 0, 0.9),
        ];
        let post = summarise(&particles, (1, 0), WinAggregation::Vote);
        assert!((post.p_win - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let a = rejection_sample(&CoinFlip, (1, 0), &seeded(2_000), &CancelToken::new()).unwrap();
        let b = rejection_sample(&CoinFlip, (1, 0), &seeded(2_000), &CancelToken::new()).unwrap();
        assert_eq!(a, b);
        assert!(a.accepted > 0 && a.accepted < 2_000);
        assert!((0.0..=1.0).contains(&a.p_win));
    }

    #[test]
    fn cancelled_run_yields_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(rejection_sample(&CoinFlip, (1, 0), &seeded(100), &cancel).is_none());
    }

    #[test]
    fn aggregation_parses_from_config_strings() {
        assert_eq!(WinAggregation::parse("Vote"), Some(WinAggregation::Vote));
        assert_eq!(WinAggregation::parse(" mean "), Some(WinAggregation::Mean));
        assert_eq!(WinAggregation::parse("median"), None);
    }
}
