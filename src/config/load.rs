use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::types::{ConfigError, ModelSettings, Settings};
use super::{CONFIG_FILE_NAME, MODEL_FILE_NAME, map_app_dir_error};
use crate::app_dirs;

/// Resolve the settings file path inside the app root.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load settings from the app root, returning defaults if the file is missing.
pub fn load_or_default() -> Result<Settings, ConfigError> {
    load_settings_from(&config_path()?)
}

/// Load and normalize settings from `path`; a missing file yields defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<Settings>(&text)
        .map(Settings::normalized)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
}

/// Write settings as TOML, replacing the file atomically.
pub fn save_settings_to_path(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    let data = toml::to_string_pretty(settings).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    std::io::Write::write_all(&mut tmp, data.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}

impl ModelSettings {
    /// Configured artifact path, else the default file under `models/`.
    pub fn resolved_artifact_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.artifact_path {
            Some(path) => Ok(path.clone()),
            None => Ok(app_dirs::models_dir()
                .map_err(map_app_dir_error)?
                .join(MODEL_FILE_NAME)),
        }
    }
}
