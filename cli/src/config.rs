use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "contest_tools.toml";

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Snippet library directory, used when `onefile` is not given one.
    pub libdir: Option<String>,

    /// Compiler executable for `runtest`.
    pub compiler: String,

    /// Extra compiler arguments, placed before the source file.
    pub compiler_args: Vec<String>,

    /// Path of the compiled solution.
    pub binary: String,

    /// Per-case time limit in seconds.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            libdir: None,
            compiler: "g++".to_string(),
            compiler_args: Vec::new(),
            binary: "./a.out".to_string(),
            timeout_secs: harness::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config '{}': {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Load `explicit`, or the default config file if it exists, or defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG);
                if path.is_file() {
                    Self::from_file(path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
