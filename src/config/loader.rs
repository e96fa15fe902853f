// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::ConfigFile;
use crate::config::validate::validate_config;
use crate::errors::{Result, TensordagError};

/// Load a problem description from a given path and return the raw
/// `ConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (tensor references, expression syntax, etc.). Use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| TensordagError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|source| TensordagError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(config)
}

/// Load a problem description from path and run semantic validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks tensor references, step operators, expression syntax, element
///   counts, and run parameters.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let config = load_from_path(&path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Default config path: `Tensordag.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Tensordag.toml")
}
