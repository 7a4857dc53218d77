//! Bounded positional noise.

use super::types::NoiseMagnitude;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces per-axis offsets in `[-magnitude, magnitude)`.
pub trait JitterSource: Send {
    fn next(&mut self, magnitude: NoiseMagnitude) -> i32;
}

/// Uniform jitter from a non-cryptographic PRNG.
pub struct RandomJitter {
    rng: StdRng,
}

impl RandomJitter {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl JitterSource for RandomJitter {
    fn next(&mut self, magnitude: NoiseMagnitude) -> i32 {
        let m = magnitude.pixels();
        if m == 0 {
            return 0;
        }
        self.rng.gen_range(-m..m)
    }
}
