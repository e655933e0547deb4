//! Deterministic RNG streams.
//!
//! # Determinism strategy
//!
//! A replicate owns three independent `SmallRng` streams:
//!
//! | Stream | Drives                                                        |
//! |--------|---------------------------------------------------------------|
//! | `pop`  | population builder and replacement demographics               |
//! | `net`  | partnership formation, duration draws, dissolution            |
//! | `run`  | transmission, progression, mortality, interventions           |
//!
//! Changing one seed perturbs only the dimension of variability that stream
//! drives.  Every stream is consumed from the driver thread in the fixed
//! per-step order, so identical seeds and parameters give identical counts.

use rand::distributions::WeightedIndex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Binomial, Distribution, Poisson, Triangular};

// ── SimRng ────────────────────────────────────────────────────────────────────

/// A single deterministic random stream with the sampling helpers the
/// engines need.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    #[inline]
    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.r#gen()
    }

    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        if p.is_nan() {
            return false;
        }
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Choose a random element from a slice, `None` if empty.
    #[inline]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.0)
    }

    /// Shuffle a mutable slice in place.
    #[inline]
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.0);
    }

    /// Poisson draw with mean `lambda`.  Non-positive means yield 0.
    pub fn poisson(&mut self, lambda: f64) -> u32 {
        if lambda.is_nan() || lambda <= 0.0 {
            return 0;
        }
        match Poisson::new(lambda) {
            Ok(dist) => {
                let x: f64 = dist.sample(&mut self.0);
                x as u32
            }
            Err(_) => 0,
        }
    }

    /// Number of successes in `n` Bernoulli(`p`) trials.
    pub fn binomial(&mut self, n: u32, p: f64) -> u32 {
        if n == 0 || p.is_nan() || p <= 0.0 {
            return 0;
        }
        if p >= 1.0 {
            return n;
        }
        match Binomial::new(u64::from(n), p) {
            Ok(dist) => dist.sample(&mut self.0) as u32,
            Err(_) => 0,
        }
    }

    /// Triangular draw on `[min, max]` with peak at `mode`.
    ///
    /// `mode` is clamped into `[min, max]`; a degenerate interval returns
    /// `min`.
    pub fn triangular(&mut self, min: f64, mode: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        let mode = mode.clamp(min, max);
        match Triangular::new(min, max, mode) {
            Ok(dist) => dist.sample(&mut self.0),
            Err(_) => min,
        }
    }

    /// Index drawn in proportion to `weights`.  `None` when no weight is
    /// positive.
    pub fn categorical(&mut self, weights: &[f64]) -> Option<usize> {
        WeightedIndex::new(weights)
            .ok()
            .map(|dist| dist.sample(&mut self.0))
    }
}

// ── RngStreams ────────────────────────────────────────────────────────────────

/// The three per-replicate streams.
pub struct RngStreams {
    pub run: SimRng,
    pub pop: SimRng,
    pub net: SimRng,
}

impl RngStreams {
    pub fn new(run_seed: u64, pop_seed: u64, net_seed: u64) -> Self {
        Self {
            run: SimRng::new(run_seed),
            pop: SimRng::new(pop_seed),
            net: SimRng::new(net_seed),
        }
    }
}
