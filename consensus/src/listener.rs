//! Capability-object listener traits (design note §9): each actor that
//! cares about a particular change in chain or mempool state implements
//! only the narrow trait for that change, and is registered with the
//! engine or mempool as `Arc<dyn Trait>`. Listeners receive everything
//! they need as call arguments — they never hold a back-pointer into the
//! engine or storage.

use thunderbolt_chain::block;
use thunderbolt_chain::transaction::{self, Transaction};
use thunderbolt_chain::transparent::Utxo;

use crate::transaction::UtxoView;

/// Fired by the mempool when a transaction is accepted.
pub trait OnTransactionAdded: Send + Sync {
    fn transaction_added(&self, tx_id: transaction::Hash);
}

/// Fired by the mempool when a transaction leaves it, for any reason
/// (explicit removal, confirmation, or eviction by a conflicting spend).
pub trait OnTransactionRemoved: Send + Sync {
    fn transaction_removed(&self, tx_id: transaction::Hash);
}

/// Fired by the blockchain engine whenever a block's commit or rollback
/// changes the UTXO set. `removed` is the set of outpoints that are no
/// longer spendable; `added` is the set that became spendable, each with
/// its restored record.
pub trait OnOutputsUpdate: Send + Sync {
    fn outputs_update(&self, removed: &[(transaction::Hash, u32)], added: &[(transaction::Hash, u32, Utxo)]);
}

/// Fired by the blockchain engine once a block has been durably committed
/// to the main chain.
pub trait OnBlockCommitted: Send + Sync {
    fn block_committed(&self, block_id: block::Hash, height: u32);
}

/// Fired by the blockchain engine for each block undone during a
/// reorganization's rollback phase, most recent first. Firing is suppressed
/// until the reorganization is confirmed to land on the new best chain, so
/// `utxo_view` reflects the chain's final state once the whole
/// reorganization has completed rather than the transient state immediately
/// after this one block's rollback — a listener re-admitting `transactions`
/// to its own pool revalidates them against the chain they will actually
/// live alongside, and a losing reorganization attempt never reaches a
/// listener at all.
pub trait OnBlockRolledBack: Send + Sync {
    fn block_rolled_back(&self, transactions: &[Transaction], utxo_view: &dyn UtxoView, height: u32);
}
