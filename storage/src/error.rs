//! Errors raised by the block store, the metadata store, and the
//! persistence layer that ties them together.

use std::io;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// an io error occurred: {0}
    #[error("an io error occurred: {0}")]
    Io(#[from] io::Error),
    /// the sled database returned an error: {0}
    #[error("the sled database returned an error: {0}")]
    Sled(#[from] sled::Error),
    /// a value read back from the store was corrupt: {0}
    #[error("a value read back from the store was corrupt: {0}")]
    Corrupt(&'static str),
    /// a serialization error occurred: {0}
    #[error("a serialization error occurred: {0}")]
    Codec(#[from] thunderbolt_chain::codec::CodecError),
    /// no block with hash {0} is known to the store
    #[error("no block with hash {0} is known to the store")]
    UnknownBlock(thunderbolt_chain::block::Hash),
    /// attempted to roll back past the genesis block
    #[error("attempted to roll back past the genesis block")]
    RolledBackPastGenesis,
}
