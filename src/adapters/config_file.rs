//! JSON file configuration store.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::ConfigPort;
use crate::config::CoordinatorConfig;
use crate::error::ConfigError;

/// Reads and writes a [`CoordinatorConfig`] as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigStore {
    /// A missing file yields the default configuration.
    fn load(&self) -> Result<CoordinatorConfig, ConfigError> {
        if !self.path.exists() {
            info!("JsonConfigStore: {} not found, using defaults", self.path.display());
            return Ok(CoordinatorConfig::default());
        }
        let text = fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::Source(format!("{}: {e}", self.path.display())))?;
        let config = serde_json::from_str(&text)
            .map_err(|e| ConfigError::Source(format!("{}: {e}", self.path.display())))?;
        info!("JsonConfigStore: loaded {}", self.path.display());
        Ok(config)
    }

    fn save(&self, config: &CoordinatorConfig) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::Source(e.to_string()))?;
        fs::write(&self.path, text)
            .map_err(|e| ConfigError::Source(format!("{}: {e}", self.path.display())))?;
        Ok(())
    }
}
