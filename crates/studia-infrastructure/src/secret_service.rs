//! Secret service implementation.
//!
//! Reads provider API keys from `secret.json`, falling back to the
//! `GEMINI_API_KEY` environment variable.

use crate::paths::StudiaPaths;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use studia_core::config::{GeminiSecret, SecretConfig};
use studia_core::error::{Result, StudiaError};

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Service for reading secret configuration.
///
/// # Example
///
/// ```ignore
/// use studia_infrastructure::SecretService;
///
/// let service = SecretService::new(None)?;
/// let key = service.gemini_api_key()?;
/// ```
#[derive(Debug, Clone)]
pub struct SecretService {
    path: PathBuf,
    secrets: Arc<RwLock<Option<SecretConfig>>>,
}

impl SecretService {
    pub fn new(base_path: Option<&Path>) -> Result<Self> {
        let path = StudiaPaths::new(base_path)
            .secret_file()
            .map_err(|e| StudiaError::config(format!("Failed to get secret path: {}", e)))?;
        Ok(Self::with_path(path))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            secrets: Arc::new(RwLock::new(None)),
        }
    }

    /// Loads `secret.json`, caching the result. A missing file is empty.
    pub fn load_secrets(&self) -> Result<SecretConfig> {
        {
            let read_lock = self.secrets.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => SecretConfig::default(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SecretConfig::default(),
            Err(e) => return Err(e.into()),
        };

        {
            let mut write_lock = self.secrets.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Resolves the Gemini API key: `secret.json` first, then the environment.
    pub fn gemini_api_key(&self) -> Result<String> {
        let from_file = self
            .load_secrets()?
            .gemini
            .map(|GeminiSecret { api_key }| api_key)
            .filter(|key| !key.trim().is_empty());

        from_file
            .or_else(|| {
                std::env::var(GEMINI_API_KEY_ENV)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            })
            .ok_or_else(|| {
                StudiaError::config(format!(
                    "Gemini API key not found. Add it to {} or set {}",
                    self.path.display(),
                    GEMINI_API_KEY_ENV
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reads_gemini_key_from_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("secret.json"),
            r#"{"gemini": {"api_key": "file-key"}}"#,
        )
        .unwrap();

        let service = SecretService::new(Some(dir.path())).unwrap();
        assert_eq!(service.gemini_api_key().unwrap(), "file-key");
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let service = SecretService::new(Some(dir.path())).unwrap();

        assert_eq!(service.load_secrets().unwrap(), SecretConfig::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("secret.json"), "{oops").unwrap();

        let service = SecretService::new(Some(dir.path())).unwrap();
        assert!(service.load_secrets().is_err());
    }
}
