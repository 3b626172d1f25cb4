//! Global, read-only network parameters, passed into the validator and
//! blockchain engine at construction rather than reached for as a singleton.

use crate::block;

/// Which Thunderbolt network a node is participating in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

/// The previous-block-hash value used by the genesis block (no real parent).
pub const GENESIS_PREVIOUS_BLOCK_HASH: block::Hash = block::Hash([0; 32]);

/// The coinbase maturity rule: a coinbase output cannot be spent until the
/// chain is this many blocks taller than the block that created it.
pub const COINBASE_MATURITY: u32 = 100;

/// The maximum serialized size of one block, in bytes.
pub const MAX_BLOCK_SIZE: u64 = 4_000_000;

/// The maximum serialized size of one transaction, in bytes.
pub const MAX_TX_SIZE: u64 = 1_000_000;

/// How far into the future (relative to local clock) a block's timestamp may
/// be and still be accepted.
pub const MAX_FUTURE_BLOCK_TIME_SECONDS: u64 = 2 * 60 * 60;

/// How long an unconfirmed transaction may sit in the mempool before
/// `Mempool::cleanup` evicts it regardless of UTXO validity.
pub const MAX_MEMPOOL_AGE_SECONDS: i64 = 14 * 24 * 60 * 60;
