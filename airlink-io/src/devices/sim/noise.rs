//! Gaussian sensor noise with optional deterministic seeding

use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;

pub struct SensorNoise {
    rng: SmallRng,
}

impl SensorNoise {
    /// Seed 0 draws from OS entropy; anything else is reproducible
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    #[inline]
    pub fn gaussian(&mut self, stddev: f32) -> f32 {
        if stddev <= 0.0 {
            return 0.0;
        }
        let n: f32 = self.rng.sample(StandardNormal);
        n * stddev
    }

    /// Add independent noise to each axis
    #[inline]
    pub fn perturb3(&mut self, v: [f32; 3], stddev: f32) -> [f32; 3] {
        [
            v[0] + self.gaussian(stddev),
            v[1] + self.gaussian(stddev),
            v[2] + self.gaussian(stddev),
        ]
    }
}
