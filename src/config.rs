use std::{
    io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::parse::MAX_ARGS;

/// Environment variable naming the config file to load.
pub const CONFIG_ENV: &str = "ORBIT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "orbit.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub prompt_symbol: String,
    /// Colour the prompt. Ignored when stdout is not a terminal.
    pub color: bool,
    pub max_line_len: usize,
    /// Argument vector capacity, including the end-of-arguments slot.
    pub max_args: usize,
    pub log_dir: PathBuf,
    pub log_file: String,
    pub report_background_completion: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt_symbol: "🚀".into(),
            color: true,
            max_line_len: 1024,
            max_args: MAX_ARGS,
            log_dir: PathBuf::from("."),
            log_file: "orbit.log".into(),
            report_background_completion: true,
        }
    }
}

impl Config {
    /// Loads the file named by `ORBIT_CONFIG`, or `orbit.toml` if it exists.
    /// Without either, the defaults are used.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;

        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.max_args < 2 {
            return Err(ConfigError::Invalid("max_args must be at least 2"));
        }
        if self.max_line_len == 0 {
            return Err(ConfigError::Invalid("max_line_len must be positive"));
        }
        if self.log_file.is_empty() {
            return Err(ConfigError::Invalid("log_file must not be empty"));
        }
        Ok(self)
    }
}
