//! Configuration service implementation.
//!
//! Loads [`PalaverConfig`] from `~/.config/palaver/config.toml` (or an
//! explicit path) and caches it.

use crate::paths::PalaverPaths;
use palaver_core::config::PalaverConfig;
use palaver_core::error::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Configuration service that loads and caches the configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Explicit config file; the platform default when `None`.
    path: Option<PathBuf>,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<PalaverConfig>>>,
}

impl ConfigService {
    /// Creates a service reading the platform default config file.
    ///
    /// The configuration is loaded lazily on first access.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service reading `path` instead of the default file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// A missing file yields defaults; an unreadable or invalid one is
    /// logged and also yields defaults.
    pub fn get_config(&self) -> PalaverConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = self.load_config().unwrap_or_else(|e| {
            tracing::warn!("Using default configuration: {}", e);
            PalaverConfig::default()
        });

        {
            let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = None;
    }

    /// Directory of the file-backed store.
    ///
    /// `override_dir` wins over the configured `data_dir`, which wins over
    /// the platform default.
    pub fn store_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = override_dir {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = self.get_config().data_dir {
            return Ok(dir);
        }
        Ok(PalaverPaths::store_dir()?)
    }

    fn load_config(&self) -> Result<PalaverConfig> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => PalaverPaths::config_file()?,
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(PalaverConfig::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: PalaverConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
