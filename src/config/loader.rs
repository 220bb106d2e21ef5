// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile, config_root_dir};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** resolve paths
/// or validate fields. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file, resolve relative paths against its directory
/// and validate it into task descriptors.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let mut raw_config = load_from_path(path)?;
    raw_config.resolve_paths(&config_root_dir(path));

    let config = ConfigFile::try_from(raw_config)?;
    debug!(
        path = %path.display(),
        tasks = config.tasks().len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Config file used when `--config` is not given: `Scriptrun.toml` in the
/// current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Scriptrun.toml")
}
