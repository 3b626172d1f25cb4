//! Transaction validation, the fee-priority mempool, and the blockchain
//! engine for Thunderbolt (spec §4.6–§4.8): the layer that decides which
//! blocks and transactions are valid and keeps the persisted chain state at
//! the heaviest valid tip.

pub mod block;
pub mod engine;
pub mod error;
pub mod listener;
pub mod mempool;
pub mod service;
pub mod subsidy;
pub mod transaction;

pub use engine::BlockchainEngine;
pub use error::{BlockError, EngineError, ValidationError};
pub use listener::{OnBlockCommitted, OnBlockRolledBack, OnOutputsUpdate, OnTransactionAdded, OnTransactionRemoved};
pub use mempool::Mempool;
pub use service::{ConsensusService, Request, Response, ServiceError};
