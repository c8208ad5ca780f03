//! Deterministic randomness for the step pipeline.
//!
//! Two sources: an immutable lookup table indexed by `(seed + index)`, used
//! where a value must be stable per agent and frame, and `StepRng`, a ChaCha8
//! stream keyed by `(system seed, agent index, frame)` so that every agent
//! draws the same numbers no matter which thread evaluates it.

use std::sync::OnceLock;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{FRAND_TABLE_SEED, FRAND_TABLE_SIZE};
use crate::math::normalize_or;

static TABLE: OnceLock<Vec<f32>> = OnceLock::new();

fn table() -> &'static [f32] {
    TABLE.get_or_init(|| {
        let mut rng = ChaCha8Rng::seed_from_u64(FRAND_TABLE_SEED);
        (0..FRAND_TABLE_SIZE).map(|_| rng.gen::<f32>()).collect()
    })
}

/// Table value in `[0, 1)`.
pub fn frand(seed: u32, index: u32) -> f32 {
    table()[seed.wrapping_add(index) as usize % FRAND_TABLE_SIZE]
}

/// Rule selector for the Random policy. Stable for a given system seed,
/// agent index and frame.
pub fn rule_selector(seed: u32, agent: usize, frame: u32) -> u32 {
    let first = (frand(seed, agent as u32) * 1000.0) as u32;
    (frand(frame, first) * 1000.0) as u32
}

pub struct StepRng(ChaCha8Rng);

impl StepRng {
    pub fn new(seed: u32, agent: usize, frame: u32) -> Self {
        let mut key = [0u8; 32];
        key[0..4].copy_from_slice(&seed.to_le_bytes());
        key[4..12].copy_from_slice(&(agent as u64).to_le_bytes());
        key[12..16].copy_from_slice(&frame.to_le_bytes());
        Self(ChaCha8Rng::from_seed(key))
    }

    /// `[0, 1)`
    pub fn unit(&mut self) -> f32 {
        self.0.gen::<f32>()
    }

    /// `[-1, 1)`
    pub fn signed(&mut self) -> f32 {
        self.0.gen_range(-1.0..1.0)
    }

    /// Random direction of unit length.
    pub fn unit_vec3(&mut self) -> Vec3 {
        normalize_or(self.signed_vec3(), Vec3::X)
    }

    pub fn signed_vec3(&mut self) -> Vec3 {
        Vec3::new(self.signed(), self.signed(), self.signed())
    }
}
