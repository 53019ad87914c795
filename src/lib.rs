//! Streaming marching-cubes terrain: a fractal density field meshed chunk by
//! chunk around a moving viewer, with a fixed pool of reusable chunk slots and
//! a parallel extraction pipeline.

pub mod config;
pub mod error;
pub mod terrain;
pub mod threading;
pub mod utils;

pub use error::{ConfigError, TerrainError, TerrainResult};
pub use terrain::{
    ChunkCoord, ChunkPool, ChunkRenderer, DensityField, MeshBuffer, NoiseParameters, SlotId,
    TerrainManager, TerrainParameters, extract, update_visibility,
};
