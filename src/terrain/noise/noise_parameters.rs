// src/terrain/noise/noise_parameters.rs
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::terrain::terrain_config::ensure_finite;

/// Shape of the density field. Immutable for the lifetime of a terrain; two
/// parameter sets are equal iff every field matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParameters {
    pub seed: u32,
    pub octaves: u8,
    /// Frequency growth per octave
    pub lacunarity: f32,
    /// Amplitude decay per octave
    pub persistence: f32,
    /// Base frequency is `scale / 100`
    pub scale: f32,
    pub weight: f32,
    /// Feedback gain between octaves; higher values sharpen ridges
    pub weight_multiplier: f32,
    /// Constant domain offset added to every octave
    pub offset: Vec3,
    pub floor_offset: f32,
    pub hard_floor_height: f32,
    pub hard_floor_weight: f32,
    pub terrace_height: f32,
    pub terrace_weight: f32,
}

impl Default for NoiseParameters {
    fn default() -> Self {
        NoiseParameters {
            seed: 6,
            octaves: 6,
            lacunarity: 2.0,
            persistence: 0.52,
            scale: 2.99,
            weight: 6.09,
            weight_multiplier: 3.61,
            offset: Vec3::ZERO,
            floor_offset: 5.19,
            hard_floor_height: -2.84,
            hard_floor_weight: 3.05,
            terrace_height: 1.0,
            terrace_weight: 0.0,
        }
    }
}

impl NoiseParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scalars = [
            ("lacunarity", self.lacunarity),
            ("persistence", self.persistence),
            ("scale", self.scale),
            ("weight", self.weight),
            ("weight_multiplier", self.weight_multiplier),
            ("offset.x", self.offset.x),
            ("offset.y", self.offset.y),
            ("offset.z", self.offset.z),
            ("floor_offset", self.floor_offset),
            ("hard_floor_height", self.hard_floor_height),
            ("hard_floor_weight", self.hard_floor_weight),
            ("terrace_height", self.terrace_height),
            ("terrace_weight", self.terrace_weight),
        ];
        for (name, value) in scalars {
            ensure_finite(name, value)?;
        }

        if self.terrace_height == 0.0 {
            return Err(ConfigError::ZeroTerraceHeight);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(NoiseParameters::default().validate().is_ok());
    }

    #[test]
    fn zero_terrace_height_is_rejected() {
        let params = NoiseParameters { terrace_height: 0.0, ..Default::default() };
        assert!(matches!(params.validate(), Err(ConfigError::ZeroTerraceHeight)));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let params = NoiseParameters { offset: Vec3::new(0.0, f32::INFINITY, 0.0), ..Default::default() };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::NonFinite { name: "offset.y", .. })
        ));
    }

    #[test]
    fn equality_covers_every_field() {
        let a = NoiseParameters::default();
        let b = NoiseParameters { hard_floor_weight: 3.06, ..a };
        assert_ne!(a, b);
        assert_eq!(a, NoiseParameters::default());
    }
}
