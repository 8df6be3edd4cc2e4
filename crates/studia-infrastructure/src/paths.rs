//! Unified path management for studia configuration and data files.
//!
//! Paths are resolved via AppPaths from the version-migrate crate so every
//! platform gets its conventional locations.

use std::path::{Path, PathBuf};
use version_migrate::AppPaths;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for studia.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/studia/            # Config directory
/// ├── config.toml              # Application configuration
/// ├── secret.json              # API keys
/// └── logs/                    # Application logs
///     └── studia.log.YYYY-MM-DD
///
/// ~/.local/share/studia/       # Data directory
/// └── store.json               # Accounts and sessions (single versioned blob)
/// ```
///
/// A base override places everything under one directory, which is what
/// tests and `--data-dir` use.
#[derive(Debug, Clone, Default)]
pub struct StudiaPaths {
    base: Option<PathBuf>,
}

impl StudiaPaths {
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
        }
    }

    fn app_paths() -> AppPaths {
        AppPaths::new("studia")
    }

    /// Returns the configuration directory (e.g. `~/.config/studia/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => Self::app_paths()
                .config_dir()
                .map_err(|_| PathError::HomeDirNotFound),
        }
    }

    /// Returns the data directory (e.g. `~/.local/share/studia/`).
    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => Self::app_paths()
                .data_dir()
                .map_err(|_| PathError::HomeDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// Keep this file readable by the owner only.
    pub fn secret_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("secret.json"))
    }

    pub fn store_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("store.json"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("logs"))
    }
}
