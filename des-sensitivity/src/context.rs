//! Per-trial context.
//!
//! Everything a trial mutates lives here and is built fresh for every trial:
//! the simulation (scheduler, clock and components), the recorder every stage
//! samples into, and the single random stream every stochastic component
//! draws from.

use tracing::debug;

use des_core::{SharedRng, SimTime, Simulation};
use des_metrics::SharedRecorder;

use crate::config::RunnerConfig;

pub struct TrialContext {
    pub sim: Simulation,
    pub rng: SharedRng,
    pub recorder: SharedRecorder,
    pub sample_interval: SimTime,
}

impl TrialContext {
    /// Fresh context seeded with `seed`, with the warm-up draws already
    /// discarded.
    pub fn new(config: &RunnerConfig, seed: u64) -> Self {
        let rng = SharedRng::new(seed);
        rng.reseed(seed);
        rng.discard(config.warmup_discards);
        debug!(seed, discarded = config.warmup_discards, "Trial context ready");
        Self {
            sim: Simulation::default(),
            rng,
            recorder: SharedRecorder::new(),
            sample_interval: config.sample_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use des_core::{draw_site, RandomProvider};

    #[test]
    fn contexts_with_the_same_seed_draw_the_same_values() {
        let config = RunnerConfig::default();
        let mut a = TrialContext::new(&config, 5).rng;
        let mut b = TrialContext::new(&config, 5).rng;
        for _ in 0..10 {
            assert_eq!(a.uniform(draw_site!("t")), b.uniform(draw_site!("t")));
        }
    }

    #[test]
    fn warmup_draws_are_skipped() {
        let config = RunnerConfig::default();
        let mut ctx = TrialContext::new(&config, 5).rng;
        let mut raw = SharedRng::new(5);
        let skipped: Vec<f64> = (0..3).map(|_| raw.uniform(draw_site!("raw"))).collect();
        assert_eq!(ctx.uniform(draw_site!("ctx")), skipped[2]);
    }

    #[test]
    fn context_starts_empty() {
        let ctx = TrialContext::new(&RunnerConfig::default(), 1);
        assert_eq!(ctx.sample_interval, SimTime::from_ticks(1000));
        assert!(ctx.recorder.snapshot().is_empty());
    }
}
