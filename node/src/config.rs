//! `thunderbolt.conf` parsing: the one place this workspace reads a
//! configuration file from disk. Everything downstream of this module takes
//! plain struct arguments rather than reaching for a config singleton.

use std::path::{Path, PathBuf};

use thunderbolt_chain::parameters::Network;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Which network this node validates and stores state for.
    pub network: Network,

    /// On-disk layout for the block store, revert store, and metadata
    /// database.
    pub storage: thunderbolt_storage::Config,
}

impl Default for Config {
    fn default() -> Self {
        Config { network: Network::default(), storage: thunderbolt_storage::Config::default() }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse {path} as TOML: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

impl Config {
    /// Loads a `Config` from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_owned(), source })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path: path.to_owned(), source })
    }
}
