//! Settings file discovery and loading.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::LintSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// `$CONFIG/lintd/config.toml`, when the platform has a config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lintd").join("config.toml"))
}

/// Load settings from `path`.
///
/// A missing file is not an error: `Ok(None)` means "use defaults".
pub fn load_settings(path: &Path) -> Result<Option<LintSettings>, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No settings file");
        return Ok(None);
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!("Failed to read settings at {:?}: {}", path, err);
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: err,
            });
        }
    };

    match toml::from_str(&content) {
        Ok(settings) => Ok(Some(settings)),
        Err(err) => {
            tracing::warn!("Failed to parse settings at {:?}: {}", path, err);
            Err(ConfigError::Parse {
                path: path.to_path_buf(),
                source: err,
            })
        }
    }
}
