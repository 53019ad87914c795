// Export all components from the terrain module
pub mod chunk;
pub mod chunk_manager;
pub mod chunk_pool;
pub mod marching;
pub mod noise;
pub mod terrain_config;
pub mod visibility;

// Re-export main types for easier access
pub use chunk::{ChunkCoord, ChunkSlot, SlotId, SlotState};
pub use chunk_manager::{ChunkRenderer, TerrainManager};
pub use chunk_pool::ChunkPool;
pub use marching::{MeshBuffer, extract};
pub use noise::{DensityField, DensitySource, NoiseParameters};
pub use terrain_config::{TerrainParameters, TerrainSettings};
pub use visibility::{ExhaustionPolicy, VisibilityUpdate, update_visibility};
