// src/error.rs
use std::io;

use thiserror::Error;

use crate::terrain::chunk::{ChunkCoord, SlotId};

/// Rejections raised while building parameters or loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("resolution must be at least 2 samples per axis, got {0}")]
    ResolutionTooLow(u32),

    #[error("resolution must be at most {max} samples per axis, got {resolution}")]
    ResolutionTooHigh { resolution: u32, max: u32 },

    #[error("view_distance {view_distance} over bounds_size {bounds_size} needs more than {max} chunk slots")]
    PoolTooLarge { view_distance: f32, bounds_size: f32, max: usize },

    #[error("bounds_size must be positive, got {0}")]
    NonPositiveBoundsSize(f32),

    #[error("view_distance must be positive, got {0}")]
    NonPositiveViewDistance(f32),

    #[error("terrace_height must be non-zero")]
    ZeroTerraceHeight,

    #[error("parameter `{name}` must be finite, got {value}")]
    NonFinite { name: &'static str, value: f32 },

    #[error("pipeline needs at least one worker thread")]
    NoWorkerThreads,

    #[error("max_jobs_per_tick must be at least 1")]
    ZeroJobsPerTick,

    #[error("failed to read configuration file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("configuration has no file path to save to")]
    NoConfigPath,
}

/// Failures of the extraction pipeline. All of them are local to one chunk.
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("extraction of {coordinate} panicked: {message}")]
    ExtractionPanicked { coordinate: ChunkCoord, message: String },

    #[error("slot {0} does not exist in the chunk pool")]
    UnknownSlot(SlotId),

    #[error("failed to build worker thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("pipeline result channel disconnected")]
    ChannelClosed,
}

pub type TerrainResult<T> = Result<T, TerrainError>;
