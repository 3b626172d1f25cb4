//! On-disk layout configuration: where the block store's segment files and
//! the metadata database live.

use std::path::PathBuf;

use thunderbolt_chain::parameters::Network;

/// The segment roll threshold: a `block%05d.bin`/`revert%05d.bin` file is
/// closed and a new one started once it would otherwise exceed this size.
pub const SEGMENT_ROLL_THRESHOLD: u64 = 128 * 1024 * 1024;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// The root directory under which per-network subdirectories are
    /// created. Defaults to the platform cache directory.
    pub cache_dir: PathBuf,

    /// Whether to delete the on-disk state on startup; used by tests that
    /// want a clean slate without leaking a temp directory per run.
    pub ephemeral: bool,
}

impl Default for Config {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("thunderbolt");
        Config { cache_dir, ephemeral: false }
    }
}

impl Config {
    /// The directory the block store's segment files live in, for `network`.
    pub fn block_store_dir(&self, network: Network) -> PathBuf {
        self.network_dir(network).join("blocks")
    }

    /// The directory the reverse-delta store's segment files live in.
    pub fn revert_store_dir(&self, network: Network) -> PathBuf {
        self.network_dir(network).join("reverts")
    }

    /// The directory sled opens its database in, for `network`.
    pub fn metadata_dir(&self, network: Network) -> PathBuf {
        self.network_dir(network).join("metadata")
    }

    fn network_dir(&self, network: Network) -> PathBuf {
        let name = match network {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        };
        self.cache_dir.join(name)
    }
}
