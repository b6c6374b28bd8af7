//! Deterministic pseudo-random generator handed to graph and model plugins.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Pseudo-random generator owned by a single trial.
///
/// A trial's generator is seeded with [`trial_seed`], so the same experiment
/// seed and trial id always reproduce the same trajectory regardless of the
/// order in which trials are scheduled. The generator is passed explicitly to
/// every plugin call that needs randomness; it is never shared between trials.
#[derive(Debug, Clone)]
pub struct Prg {
    seed: u64,
    rng: StdRng,
}

impl Prg {
    /// Creates a new generator from a seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed the generator was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform double in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform double in `[min, max]`.
    pub fn uniform_range(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    /// Uniform integer in `[min, max]`.
    pub fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    /// Uniform index in `[0, len)`; `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Returns true with probability `p`.
    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.uniform() < p.clamp(0.0, 1.0)
    }

    /// Returns a mutable reference to the underlying RNG for advanced usage.
    pub fn inner_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl RngCore for Prg {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Seed used by the generator of trial `trial_id` for an experiment seeded with `base_seed`.
pub fn trial_seed(base_seed: u64, trial_id: u16) -> u64 {
    base_seed.wrapping_add(u64::from(trial_id))
}
