use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("invalid config in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("transition_hour must be 0-23, got {0}")]
    InvalidTransitionHour(u32),
    #[error("max_nesting_depth must be at least 1")]
    InvalidNestingDepth,
}

/// Get the config file path, respecting XDG_CONFIG_HOME
pub fn config_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    config_dir.join("tltd").join("config.toml")
}

/// Get the user's home directory
pub fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Default data file: `~/.tltd/tasks.json`
pub fn default_data_file() -> PathBuf {
    home_dir().join(".tltd").join("tasks.json")
}

/// Read the config from the default location.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Read the config from `path`. A missing file means defaults; a file that
/// exists but does not parse is an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.transition_hour > 23 {
        return Err(ConfigError::InvalidTransitionHour(config.transition_hour));
    }
    if config.max_nesting_depth == 0 {
        return Err(ConfigError::InvalidNestingDepth);
    }
    Ok(())
}

/// Data file to use: an explicit override, else the config's `data_file`,
/// else the default. A leading `~/` expands to the home directory.
pub fn resolve_data_file(config: &Config, override_path: Option<&Path>) -> PathBuf {
    let chosen = override_path
        .map(Path::to_path_buf)
        .or_else(|| config.data_file.clone())
        .unwrap_or_else(default_data_file);
    expand_tilde(&chosen)
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    }
}
