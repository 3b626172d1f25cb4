//! Narrow trait boundaries for the collaborators this crate excludes
//! (wire protocol, RPC, mining, wallet — see spec.md §1 Non-goals). These
//! traits name the shape a future network or RPC crate would plug into;
//! nothing in this workspace implements them.

use thunderbolt_chain::block::Block;
use thunderbolt_chain::transaction::{self, Transaction};

/// Whatever feeds newly-seen blocks into `submit_block` — a P2P peer set
/// in a real deployment.
pub trait BlockSource {
    fn next_block(&mut self) -> Option<Block>;
}

/// Whatever feeds newly-seen transactions into `submit_transaction`.
pub trait TransactionRelay {
    fn next_transaction(&mut self) -> Option<Transaction>;
    fn announce(&mut self, hash: transaction::Hash);
}
