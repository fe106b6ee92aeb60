//! Loading generation configs and writing reports.
//!
//! Configs are RON files holding a [`GenerationConfig`]. A bare preset name
//! (`cave`, `maze`, `overworld`) is accepted wherever a path is, as long as
//! no file of that name exists.

use std::path::Path;

use levelgen_core::config::GenerationConfig;
use serde::Serialize;
use thiserror::Error;

/// Error type for config and report files.
#[derive(Error, Debug)]
pub enum ConfigFileError {
    /// Neither a file nor a preset.
    #[error("Config file not found and no preset named '{0}'")]
    FileNotFound(String),
    /// Failed to read or write a file.
    #[error("Failed to access file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Failed to render RON.
    #[error("Failed to render config: {0}")]
    Render(#[from] ron::Error),
    /// Failed to encode JSON.
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Built-in config by name.
#[must_use]
pub fn preset(name: &str) -> Option<GenerationConfig> {
    match name.trim().to_ascii_lowercase().as_str() {
        "cave" => Some(GenerationConfig::cave()),
        "maze" => Some(GenerationConfig::maze()),
        "overworld" => Some(GenerationConfig::overworld()),
        _ => None,
    }
}

/// Load a config from a RON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GenerationConfig, ConfigFileError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigFileError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let config: GenerationConfig = ron::from_str(&contents)?;
    Ok(config)
}

/// Load `source` as a file, or fall back to the preset of that name.
pub fn resolve_config(source: &str) -> Result<GenerationConfig, ConfigFileError> {
    if Path::new(source).exists() {
        return load_config(source);
    }
    preset(source).ok_or_else(|| ConfigFileError::FileNotFound(source.to_string()))
}

/// Render a config as pretty RON.
pub fn config_to_ron(config: &GenerationConfig) -> Result<String, ConfigFileError> {
    Ok(ron::ser::to_string_pretty(
        config,
        ron::ser::PrettyConfig::default(),
    )?)
}

/// Write any serializable value as pretty JSON, creating parent directories.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<(), ConfigFileError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
