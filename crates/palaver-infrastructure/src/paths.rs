//! Unified path management for palaver.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/palaver/           # Config directory
//! └── config.toml              # Application configuration
//!
//! ~/.local/share/palaver/      # Data directory
//! └── store/                   # File-backed key-value store, one file per key
//! ```

use palaver_core::error::PalaverError;
use std::path::PathBuf;

const APP_DIR: &str = "palaver";

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

impl From<PathError> for PalaverError {
    fn from(err: PathError) -> Self {
        PalaverError::config(err.to_string())
    }
}

/// Platform directories for palaver, resolved through `dirs`.
pub struct PalaverPaths;

impl PalaverPaths {
    /// Returns the palaver configuration directory (e.g. `~/.config/palaver/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the palaver data directory (e.g. `~/.local/share/palaver/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the default directory of the file-backed store.
    pub fn store_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("store"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        if let (Ok(config), Ok(store)) = (PalaverPaths::config_file(), PalaverPaths::store_dir()) {
            assert!(config.ends_with("palaver/config.toml"));
            assert!(store.ends_with("palaver/store"));
        }
    }

    #[test]
    fn test_path_error_maps_to_config_error() {
        let err: PalaverError = PathError::HomeDirNotFound.into();
        assert!(matches!(err, PalaverError::Config(_)));
    }
}
