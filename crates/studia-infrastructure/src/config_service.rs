//! Configuration service implementation.
//!
//! Loads the root configuration from `config.toml` and caches it.

use crate::paths::StudiaPaths;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use studia_core::config::StudiaConfig;
use studia_core::error::{Result, StudiaError};

/// Configuration service that loads and caches [`StudiaConfig`].
///
/// A missing file yields the defaults. A file that fails to parse is
/// reported by `load` and falls back to defaults in `get_config`.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration, filled on first access.
    config: Arc<RwLock<Option<StudiaConfig>>>,
}

impl ConfigService {
    pub fn new(base_path: Option<&Path>) -> Result<Self> {
        let path = StudiaPaths::new(base_path)
            .config_file()
            .map_err(|e| StudiaError::config(format!("Failed to get config path: {}", e)))?;
        Ok(Self::with_path(path))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> StudiaConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = match self.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("[ConfigService] {}; using defaults", e);
                StudiaConfig::default()
            }
        };

        {
            let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    /// Reads and parses the config file without touching the cache.
    pub fn load(&self) -> Result<StudiaConfig> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let config = toml::from_str(&content)?;
                tracing::debug!("[ConfigService] Loaded {}", self.path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StudiaConfig::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studia_core::config::StaleWritePolicy;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let service = ConfigService::new(Some(dir.path())).unwrap();

        assert_eq!(service.get_config(), StudiaConfig::default());
    }

    #[test]
    fn test_loads_and_caches() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "stale_write_policy = \"last_write_wins\"\n").unwrap();
        let service = ConfigService::with_path(path.clone());

        assert_eq!(
            service.get_config().stale_write_policy,
            StaleWritePolicy::LastWriteWins
        );

        std::fs::write(&path, "narration_enabled = true\n").unwrap();
        assert!(!service.get_config().narration_enabled);

        service.invalidate_cache();
        assert!(service.get_config().narration_enabled);
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "narration_enabled = [").unwrap();
        let service = ConfigService::with_path(path);

        assert!(service.load().is_err());
        assert_eq!(service.get_config(), StudiaConfig::default());
    }
}
