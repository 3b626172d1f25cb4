//! `thunderbolt-node`: opens on-disk state for one network and holds it
//! open. No peer connections, no RPC, no mining — see
//! [`thunderbolt_node::collaborators`] for the trait boundaries a future
//! crate plugs into.

use std::path::PathBuf;

use color_eyre::eyre::Result;

use thunderbolt_node::config::Config;

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match config_path {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    let node = thunderbolt_node::start(&config)?;
    tracing::info!(mempool_size = node.mempool.len(), "thunderbolt node ready");

    Ok(())
}
