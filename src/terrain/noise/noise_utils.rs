// src/terrain/noise/noise_utils.rs
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// Each octave's domain offset lies in [-OFFSET_RANGE, OFFSET_RANGE) per axis
pub const OFFSET_RANGE: f32 = 1000.0;

/// Per-octave domain offsets. The sequence only depends on `seed` and `octaves`,
/// so every field built from the same pair decorrelates its octaves the same way.
pub fn octave_offsets(seed: u32, octaves: u8) -> Vec<Vec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(u64::from(seed));
    (0..octaves)
        .map(|_| {
            let x = signed_unit(&mut rng);
            let y = signed_unit(&mut rng);
            let z = signed_unit(&mut rng);
            Vec3::new(x, y, z) * OFFSET_RANGE
        })
        .collect()
}

// Maps a uniform [0, 1) draw onto [-1, 1)
fn signed_unit<R: Rng>(rng: &mut R) -> f32 {
    (rng.random::<f64>() * 2.0 - 1.0) as f32
}

/// Truncated remainder, same sign as `value`.
pub fn terrace(value: f32, height: f32) -> f32 {
    value % height
}
