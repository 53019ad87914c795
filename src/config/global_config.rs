// src/config/global_config.rs
use std::path::Path;
use std::sync::{Arc, RwLock};

use log::{info, warn};
use once_cell::sync::OnceCell;

use crate::config::config_manager::{ConfigurationManager, TerrainConfiguration};

// Global static variable to hold the initialized ConfigurationManager
static GLOBAL_CONFIG_MANAGER: OnceCell<Arc<RwLock<ConfigurationManager>>> = OnceCell::new();

pub const DEFAULT_CONFIG_PATH: &str = "terrain_config.toml";

fn load_or_default(config_path: &Path) -> ConfigurationManager {
    match ConfigurationManager::load_from_file(config_path) {
        Ok(manager) => {
            info!("Successfully loaded global config from {:?}", config_path);
            manager
        }
        Err(e) => {
            warn!(
                "Failed to load global config from {:?}: {}. Using default configuration.",
                config_path, e
            );
            let mut manager = ConfigurationManager::default();
            manager.set_config_path(config_path);
            manager
        }
    }
}

/// Initializes the global manager from `config_path`. Has no effect if it was
/// already initialized; returns whichever manager is installed.
pub fn init_config_manager<P: AsRef<Path>>(config_path: P) -> &'static Arc<RwLock<ConfigurationManager>> {
    GLOBAL_CONFIG_MANAGER.get_or_init(|| Arc::new(RwLock::new(load_or_default(config_path.as_ref()))))
}

/// Gets the globally initialized ConfigurationManager, loading
/// `DEFAULT_CONFIG_PATH` on first use.
pub fn get_config_manager() -> &'static Arc<RwLock<ConfigurationManager>> {
    init_config_manager(DEFAULT_CONFIG_PATH)
}

/// Snapshot of the current global configuration. A poisoned lock still holds
/// a complete configuration, so it is read through.
pub fn get_config() -> TerrainConfiguration {
    let manager = get_config_manager();
    let guard = manager.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.get_config().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_config_is_initialized_once() {
        let first = get_config_manager();
        let second = init_config_manager("some/other/path.toml");
        assert!(Arc::ptr_eq(first, second));
        assert!(get_config().validate().is_ok());
    }
}
