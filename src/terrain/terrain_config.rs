// src/terrain/terrain_config.rs
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// Defaults for terrain streaming
pub const DEFAULT_VIEW_DISTANCE: f32 = 60.0;
pub const DEFAULT_BOUNDS_SIZE: f32 = 20.0;
pub const DEFAULT_SURFACE: f32 = 0.5;
pub const DEFAULT_RESOLUTION: u32 = 8;

// Upper limits, keep one chunk grid and the slot pool allocatable
pub const MAX_RESOLUTION: u32 = 256;
pub const MAX_CHUNK_SLOTS: usize = 1 << 20;

/// Raw `[terrain]` section as it appears in the TOML file. Turned into
/// [`TerrainParameters`] through [`TerrainSettings::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    pub view_distance: f32,
    pub bounds_size: f32,
    pub surface: f32,
    pub resolution: u32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        TerrainSettings {
            view_distance: DEFAULT_VIEW_DISTANCE,
            bounds_size: DEFAULT_BOUNDS_SIZE,
            surface: DEFAULT_SURFACE,
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

impl TerrainSettings {
    pub fn validate(&self) -> Result<TerrainParameters, ConfigError> {
        TerrainParameters::new(self.bounds_size, self.resolution, self.surface, self.view_distance)
    }
}

impl From<TerrainParameters> for TerrainSettings {
    fn from(params: TerrainParameters) -> Self {
        TerrainSettings {
            view_distance: params.view_distance,
            bounds_size: params.bounds_size,
            surface: params.surface,
            resolution: params.resolution,
        }
    }
}

/// Validated terrain parameters. The squared view distance is computed together
/// with the view distance and the two are never updated separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainParameters {
    bounds_size: f32,
    resolution: u32,
    surface: f32,
    view_distance: f32,
    sqr_view_distance: f32,
}

impl Default for TerrainParameters {
    fn default() -> Self {
        TerrainParameters {
            bounds_size: DEFAULT_BOUNDS_SIZE,
            resolution: DEFAULT_RESOLUTION,
            surface: DEFAULT_SURFACE,
            view_distance: DEFAULT_VIEW_DISTANCE,
            sqr_view_distance: DEFAULT_VIEW_DISTANCE * DEFAULT_VIEW_DISTANCE,
        }
    }
}

impl TerrainParameters {
    pub fn new(
        bounds_size: f32,
        resolution: u32,
        surface: f32,
        view_distance: f32,
    ) -> Result<Self, ConfigError> {
        ensure_finite("bounds_size", bounds_size)?;
        ensure_finite("surface", surface)?;
        ensure_finite("view_distance", view_distance)?;

        if resolution < 2 {
            return Err(ConfigError::ResolutionTooLow(resolution));
        }
        if resolution > MAX_RESOLUTION {
            return Err(ConfigError::ResolutionTooHigh { resolution, max: MAX_RESOLUTION });
        }
        if bounds_size <= 0.0 {
            return Err(ConfigError::NonPositiveBoundsSize(bounds_size));
        }
        if view_distance <= 0.0 {
            return Err(ConfigError::NonPositiveViewDistance(view_distance));
        }

        // Same radius as chunk_radius, the ratio may be infinite here
        let side = 2.0 * f64::from((view_distance / bounds_size).ceil()) + 1.0;
        if side.powi(3) > MAX_CHUNK_SLOTS as f64 {
            return Err(ConfigError::PoolTooLarge {
                view_distance,
                bounds_size,
                max: MAX_CHUNK_SLOTS,
            });
        }

        Ok(TerrainParameters {
            bounds_size,
            resolution,
            surface,
            view_distance,
            sqr_view_distance: view_distance * view_distance,
        })
    }

    /// Same parameters with another view distance; the cached square follows.
    pub fn with_view_distance(&self, view_distance: f32) -> Result<Self, ConfigError> {
        Self::new(self.bounds_size, self.resolution, self.surface, view_distance)
    }

    pub fn bounds_size(&self) -> f32 {
        self.bounds_size
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn surface(&self) -> f32 {
        self.surface
    }

    pub fn view_distance(&self) -> f32 {
        self.view_distance
    }

    pub fn sqr_view_distance(&self) -> f32 {
        self.sqr_view_distance
    }

    /// Distance between neighbouring samples of a chunk grid.
    pub fn spacing(&self) -> f32 {
        self.bounds_size / (self.resolution - 1) as f32
    }

    /// Samples in one chunk grid.
    pub fn points_per_chunk(&self) -> usize {
        let r = self.resolution as usize;
        r * r * r
    }

    /// Chunk radius scanned around the viewer.
    pub fn chunk_radius(&self) -> i32 {
        (self.view_distance / self.bounds_size).ceil() as i32
    }

    /// Most chunks that can be within view distance of any point at once.
    pub fn max_visible_chunks(&self) -> usize {
        let side = (self.chunk_radius() * 2 + 1) as usize;
        side * side * side
    }
}

pub(crate) fn ensure_finite(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { name, value })
    }
}
