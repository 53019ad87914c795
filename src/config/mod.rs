pub mod config_manager;
pub mod global_config;

pub use config_manager::{ConfigurationManager, PipelineSettings, TerrainConfiguration};
pub use global_config::{get_config, get_config_manager, init_config_manager};
