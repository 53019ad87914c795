// src/config/config_manager.rs

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::terrain::noise::NoiseParameters;
use crate::terrain::terrain_config::{TerrainParameters, TerrainSettings};
use crate::terrain::visibility::ExhaustionPolicy;

// Default values
pub const DEFAULT_MAX_JOBS_PER_TICK: usize = 8;
pub const DEFAULT_MAX_RETRIES: u32 = 2;

pub fn default_max_threads() -> usize {
    std::cmp::max(1, num_cpus::get().saturating_sub(1))
}

// --- Struct Definitions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings { // Represents the data loaded from TOML [pipeline] section
    pub max_threads: usize,
    // Dirty chunks handed to the workers per tick, the rest stay queued
    pub max_jobs_per_tick: usize,
    // Extra attempts after a failed run before an empty mesh is published
    pub max_retries: u32,
    pub exhaustion_policy: ExhaustionPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            max_threads: default_max_threads(),
            max_jobs_per_tick: DEFAULT_MAX_JOBS_PER_TICK,
            max_retries: DEFAULT_MAX_RETRIES,
            exhaustion_policy: ExhaustionPolicy::default(),
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_threads == 0 {
            return Err(ConfigError::NoWorkerThreads);
        }
        if self.max_jobs_per_tick == 0 {
            return Err(ConfigError::ZeroJobsPerTick);
        }
        Ok(())
    }
}

// --- Main TerrainConfiguration Struct ---
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerrainConfiguration {
    #[serde(default)]
    pub terrain: TerrainSettings,

    #[serde(default)]
    pub noise: NoiseParameters,

    #[serde(default)]
    pub pipeline: PipelineSettings,
}

impl TerrainConfiguration {
    /// Checks every section and returns the validated terrain parameters.
    pub fn validate(&self) -> Result<TerrainParameters, ConfigError> {
        let terrain = self.terrain.validate()?;
        self.noise.validate()?;
        self.pipeline.validate()?;
        Ok(terrain)
    }
}

// Configuration Manager: owns the current configuration and the file it came from
#[derive(Debug, Clone, Default)]
pub struct ConfigurationManager {
    current_config: TerrainConfiguration,
    config_path: Option<PathBuf>, // Path used for loading/saving
}

impl ConfigurationManager {
    pub fn with_config(config: TerrainConfiguration, config_path: Option<PathBuf>) -> Self {
        Self {
            current_config: config,
            config_path,
        }
    }

    // Load configuration from a file. Missing sections and fields take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        info!("Loading config from: {:?}", path_ref);
        let config_str = fs::read_to_string(path_ref)?;
        let config: TerrainConfiguration = toml::from_str(&config_str)?;

        let manager = Self {
            current_config: config,
            config_path: Some(path_ref.to_path_buf()),
        };
        manager.validate()?;
        Ok(manager)
    }

    // Save configuration to the path it was loaded from (or set_config_path)
    pub fn save_to_file(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.config_path else {
            warn!("Cannot save configuration: No config path set.");
            return Err(ConfigError::NoConfigPath);
        };
        info!("Saving config to: {:?}", path);
        let toml_string = toml::to_string_pretty(&self.current_config)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    pub fn set_config_path<P: AsRef<Path>>(&mut self, path: P) {
        self.config_path = Some(path.as_ref().to_path_buf());
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    // Replace the whole configuration after validating it
    pub fn update_config(&mut self, updates: TerrainConfiguration) -> Result<(), ConfigError> {
        updates.validate()?;
        self.current_config = updates;
        Ok(())
    }

    pub fn get_config(&self) -> &TerrainConfiguration {
        &self.current_config
    }

    pub fn validate(&self) -> Result<TerrainParameters, ConfigError> {
        self.current_config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("march_terrain_{}_{}.toml", name, std::process::id()))
    }

    #[test]
    fn defaults_are_valid() {
        let manager = ConfigurationManager::default();
        let terrain = manager.validate().unwrap();
        assert_eq!(terrain, TerrainParameters::default());
        assert!(manager.get_config().pipeline.max_threads >= 1);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: TerrainConfiguration = toml::from_str(
            r#"
            [terrain]
            view_distance = 30.0

            [pipeline]
            exhaustion_policy = "nearest_first"
            "#,
        )
        .unwrap();

        assert_eq!(config.terrain.view_distance, 30.0);
        assert_eq!(config.terrain.bounds_size, TerrainSettings::default().bounds_size);
        assert_eq!(config.noise, NoiseParameters::default());
        assert_eq!(config.pipeline.exhaustion_policy, ExhaustionPolicy::NearestFirst);
        assert_eq!(config.pipeline.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn save_then_load_preserves_configuration() {
        let path = temp_path("round_trip");
        let mut config = TerrainConfiguration::default();
        config.terrain.resolution = 12;
        config.noise.seed = 99;
        config.pipeline.max_jobs_per_tick = 3;

        let manager = ConfigurationManager::with_config(config.clone(), Some(path.clone()));
        manager.save_to_file().unwrap();
        let loaded = ConfigurationManager::load_from_file(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.get_config(), &config);
        assert_eq!(loaded.config_path(), Some(path.as_path()));
    }

    #[test]
    fn invalid_files_are_rejected() {
        let path = temp_path("invalid");
        fs::write(&path, "[terrain]\nresolution = 1\n").unwrap();
        let result = ConfigurationManager::load_from_file(&path);
        let _ = fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::ResolutionTooLow(1))));

        assert!(matches!(
            ConfigurationManager::load_from_file(temp_path("does_not_exist")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn saving_without_path_fails() {
        assert!(matches!(
            ConfigurationManager::default().save_to_file(),
            Err(ConfigError::NoConfigPath)
        ));
    }

    #[test]
    fn update_rejects_zero_threads() {
        let mut manager = ConfigurationManager::default();
        let mut config = TerrainConfiguration::default();
        config.pipeline.max_threads = 0;
        assert!(matches!(manager.update_config(config), Err(ConfigError::NoWorkerThreads)));
    }
}
