//! Application shell: reads `thunderbolt.conf`, opens the on-disk state for
//! the configured network, and wires the persistence service, blockchain
//! engine, and mempool together behind a [`thunderbolt_consensus::service::ConsensusService`].
//!
//! Everything this binary does NOT do — accept peer connections, answer
//! RPC calls, mine blocks, manage a wallet — is named in [`collaborators`]
//! as a trait boundary for a future crate to implement.

pub mod collaborators;
pub mod config;

use std::sync::Arc;

use thunderbolt_consensus::engine::BlockchainEngine;
use thunderbolt_consensus::mempool::Mempool;
use thunderbolt_consensus::service::ConsensusService;
use thunderbolt_storage::metadata::sled_store::SledMetadataProvider;
use thunderbolt_storage::PersistenceService;

use crate::config::Config;

#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Store(#[from] thunderbolt_storage::StoreError),
}

/// The running node's handle: a [`ConsensusService`] plus a reference to
/// the mempool, for whatever external collaborator drives block/transaction
/// submission.
pub struct Node {
    pub service: ConsensusService<SledMetadataProvider>,
    pub mempool: Arc<Mempool>,
}

/// Opens on-disk state for `config.network` and constructs the engine,
/// mempool, and service facade. Does not bootstrap genesis or start any
/// network listener — both are left to the caller.
pub fn start(config: &Config) -> Result<Node, StartupError> {
    let persistence = PersistenceService::<SledMetadataProvider>::open(&config.storage, config.network)?;
    let engine = Arc::new(BlockchainEngine::new(persistence, config.network));
    let mempool = Arc::new(Mempool::new());

    engine.register_outputs_listener(mempool.clone());
    engine.register_block_rolled_back_listener(mempool.clone());

    tracing::info!(network = ?config.network, "thunderbolt node storage opened");

    let service = ConsensusService::new(engine, mempool.clone());
    Ok(Node { service, mempool })
}
