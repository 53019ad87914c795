pub mod scheduler;
pub mod thread_pool;

pub use scheduler::{ChunkJob, ChunkResult, PipelineScheduler, PipelineStats};
pub use thread_pool::ThreadPool;
