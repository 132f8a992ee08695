//! Randomness capability for deterministic simulation.
//!
//! Every component that samples randomness receives a [`RandomProvider`]
//! explicitly; nothing reaches for a global generator. The provider used by a
//! trial is a [`SharedRng`]: a cloneable handle onto one seeded stream, so all
//! stages draw from a single globally ordered sequence and an identical seed
//! reproduces an identical run.
//!
//! - `DrawSite`: a stable identifier for a sampling location, plus a human tag.
//! - `RandomProvider`: the sampling interface handed to components.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use tracing::trace;

/// A labeled sampling location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawSite {
    pub tag: &'static str,
    pub site_id: u64,
}

impl DrawSite {
    pub const fn new(tag: &'static str, site_id: u64) -> Self {
        Self { tag, site_id }
    }
}

/// Sampling interface handed to every stochastic component.
pub trait RandomProvider: Send {
    /// Uniform draw in `[0, 1)`.
    fn uniform(&mut self, site: DrawSite) -> f64;

    /// Normal draw. A negative or non-finite `std_dev` degenerates to `mean`.
    fn normal(&mut self, site: DrawSite, mean: f64, std_dev: f64) -> f64;

    /// Exponential draw parameterized by `rate` (events per tick).
    /// A non-positive rate yields `f64::INFINITY`.
    fn exponential(&mut self, site: DrawSite, rate: f64) -> f64;
}

/// Const-friendly 64-bit FNV-1a hash.
pub const fn fnv1a64(s: &str) -> u64 {
    let bytes = s.as_bytes();
    let mut hash: u64 = 0xcbf29ce484222325;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x100000001b3);
        i += 1;
    }
    hash
}

/// Generate a `DrawSite` at the macro expansion site.
#[macro_export]
macro_rules! draw_site {
    ($tag:expr) => {{
        const _SITE_ID: u64 = $crate::randomness::fnv1a64(concat!(
            module_path!(),
            "::",
            file!(),
            ":",
            line!(),
            ":",
            column!(),
            ":",
            $tag,
        ));
        $crate::randomness::DrawSite::new($tag, _SITE_ID)
    }};
}

/// Cloneable handle onto a single seeded random stream.
///
/// Clones share the underlying generator: a draw made through any clone
/// advances the stream for all of them.
#[derive(Clone, Debug)]
pub struct SharedRng {
    rng: Arc<Mutex<StdRng>>,
}

impl SharedRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Restart the stream from `seed`. Affects every clone.
    pub fn reseed(&self, seed: u64) {
        *self.lock() = StdRng::seed_from_u64(seed);
    }

    /// Throw away `count` uniform draws.
    pub fn discard(&self, count: usize) {
        let mut rng = self.lock();
        for _ in 0..count {
            let _: f64 = rng.gen();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StdRng> {
        self.rng.lock().expect("SharedRng mutex poisoned")
    }
}

impl RandomProvider for SharedRng {
    fn uniform(&mut self, site: DrawSite) -> f64 {
        let value: f64 = self.lock().gen();
        trace!(tag = site.tag, site_id = site.site_id, value, "uniform draw");
        value
    }

    fn normal(&mut self, site: DrawSite, mean: f64, std_dev: f64) -> f64 {
        let value = match Normal::new(mean, std_dev) {
            Ok(dist) => dist.sample(&mut *self.lock()),
            Err(_) => mean,
        };
        trace!(tag = site.tag, site_id = site.site_id, mean, std_dev, value, "normal draw");
        value
    }

    fn exponential(&mut self, site: DrawSite, rate: f64) -> f64 {
        if !(rate > 0.0) {
            return f64::INFINITY;
        }
        let value = match Exp::new(rate) {
            Ok(dist) => dist.sample(&mut *self.lock()),
            Err(_) => f64::INFINITY,
        };
        trace!(tag = site.tag, site_id = site.site_id, rate, value, "exponential draw");
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draws(rng: &mut SharedRng, n: usize) -> Vec<f64> {
        (0..n).map(|_| rng.uniform(draw_site!("test"))).collect()
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = SharedRng::new(42);
        let mut b = SharedRng::new(42);
        assert_eq!(draws(&mut a, 16), draws(&mut b, 16));
    }

    #[test]
    fn clones_share_one_stream() {
        let mut a = SharedRng::new(7);
        let mut b = a.clone();
        let first = a.uniform(draw_site!("a"));
        let second = b.uniform(draw_site!("b"));

        let mut fresh = SharedRng::new(7);
        assert_eq!(draws(&mut fresh, 2), vec![first, second]);
    }

    #[test]
    fn reseed_and_discard_skip_the_warmup() {
        let mut rng = SharedRng::new(1);
        let _ = draws(&mut rng, 5);
        rng.reseed(9);
        rng.discard(2);
        let after = draws(&mut rng, 3);

        let mut reference = SharedRng::new(9);
        let skipped = draws(&mut reference, 5);
        assert_eq!(after, skipped[2..].to_vec());
    }

    #[test]
    fn degenerate_parameters() {
        let mut rng = SharedRng::new(3);
        assert_eq!(rng.normal(draw_site!("n"), 12.0, -1.0), 12.0);
        assert_eq!(rng.exponential(draw_site!("e"), 0.0), f64::INFINITY);
        let u = rng.uniform(draw_site!("u"));
        assert!((0.0..1.0).contains(&u));
    }

    #[test]
    fn site_ids_differ_per_callsite() {
        let a = draw_site!("x");
        let b = draw_site!("x");
        assert_eq!(a.tag, b.tag);
        assert_ne!(a.site_id, b.site_id);
    }
}
