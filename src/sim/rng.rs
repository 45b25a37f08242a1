//! Per-lane noise streams
//!
//! Each agent lane owns a PCG generator whose state comes from the run seed
//! and whose stream is the lane index, so lanes never share or contend for
//! RNG state and results do not depend on how lanes are scheduled.

use rand_distr::{Distribution, StandardNormal};
use rand_pcg::Pcg32;

/// One generator per agent lane
#[derive(Debug, Clone)]
pub struct NoiseStreams {
    lanes: Vec<Pcg32>,
}

impl NoiseStreams {
    /// Seed `lanes` independent streams from one run seed
    pub fn seeded(seed: u64, lanes: usize) -> Self {
        let lanes = (0..lanes as u64)
            .map(|lane| Pcg32::new(seed, lane))
            .collect();
        Self { lanes }
    }

    /// Mutable per-lane generators, for handing one to each lane
    pub(crate) fn lanes_mut(&mut self) -> &mut [Pcg32] {
        &mut self.lanes
    }
}

/// One standard-normal draw from a lane's generator
#[inline]
pub fn normal_sample(rng: &mut Pcg32) -> f32 {
    StandardNormal.sample(rng)
}
