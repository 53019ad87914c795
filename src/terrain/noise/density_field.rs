// src/terrain/noise/density_field.rs
use std::fmt;

use glam::Vec3;
use noise::{NoiseFn, Simplex};

use super::noise_parameters::NoiseParameters;
use super::noise_utils::{octave_offsets, terrace};
use crate::error::ConfigError;

/// Anything that can be sampled as a scalar field. The extraction pipeline is
/// generic over this so synthetic fields can be meshed the same way.
pub trait DensitySource: Send + Sync {
    fn density(&self, position: Vec3) -> f32;
}

impl<F> DensitySource for F
where
    F: Fn(Vec3) -> f32 + Send + Sync,
{
    fn density(&self, position: Vec3) -> f32 {
        self(position)
    }
}

/// Ridged, terraced fractal noise. Octave offsets are drawn once at
/// construction and shared read-only by every sample afterwards.
pub struct DensityField {
    params: NoiseParameters,
    offsets: Vec<Vec3>,
    simplex: Simplex,
}

impl DensityField {
    pub fn new(params: NoiseParameters) -> Result<Self, ConfigError> {
        params.validate()?;

        Ok(DensityField {
            offsets: octave_offsets(params.seed, params.octaves),
            simplex: Simplex::new(params.seed),
            params,
        })
    }

    pub fn parameters(&self) -> &NoiseParameters {
        &self.params
    }

    pub fn octave_offsets(&self) -> &[Vec3] {
        &self.offsets
    }

    pub fn generate(&self, position: Vec3) -> f32 {
        let p = &self.params;

        let mut value = 0.0f32;
        let mut frequency = p.scale / 100.0;
        let mut amplitude = 1.0f32;
        let mut weight = 1.0f32;

        for offset in &self.offsets {
            let sample_at = position * frequency + *offset + p.offset;
            let n = self.simplex.get([
                f64::from(sample_at.x),
                f64::from(sample_at.y),
                f64::from(sample_at.z),
            ]) as f32;

            // Fold the octave, then feed it back as the next octave's weight
            let mut v = 1.0 - n.abs();
            v = v * v * weight;
            weight = (v * p.weight_multiplier).clamp(0.0, 1.0);

            value += v * amplitude;
            amplitude *= p.persistence;
            frequency *= p.lacunarity;
        }

        let y = position.y;
        let mut density = -(y + p.floor_offset)
            + value * p.weight
            + terrace(y, p.terrace_height) * p.terrace_weight;
        if y < p.hard_floor_height {
            density += p.hard_floor_weight;
        }
        density
    }
}

impl DensitySource for DensityField {
    fn density(&self, position: Vec3) -> f32 {
        self.generate(position)
    }
}

impl fmt::Debug for DensityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DensityField")
            .field("params", &self.params)
            .field("octaves", &self.offsets.len())
            .finish()
    }
}
