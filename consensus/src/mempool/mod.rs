//! The fee-priority mempool (spec §4.7): an unconfirmed-transaction pool
//! that rejects invalid or conflicting transactions on entry, selects a
//! fee-maximizing subset under a size budget, and reacts to the blockchain
//! engine's UTXO-set changes and reorganizations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use thunderbolt_chain::amount::{Amount, NonNegative};
use thunderbolt_chain::transaction::{self, Transaction};
use thunderbolt_chain::transparent::{OutPoint, Utxo};

use crate::error::ValidationError;
use crate::listener::{OnBlockRolledBack, OnOutputsUpdate, OnTransactionAdded, OnTransactionRemoved};
use crate::transaction::{validate_transaction, UtxoView};

#[derive(Clone)]
struct Entry {
    tx: Transaction,
    size: u64,
    fee: Amount<NonNegative>,
    sequence: u64,
    received_at: i64,
}

#[derive(Default)]
struct State {
    entries: HashMap<transaction::Hash, Entry>,
    spent_outpoints: HashSet<OutPoint>,
    next_sequence: u64,
}

/// The mempool. Cheaply clonable via `Arc` so it can be registered as a
/// listener with the blockchain engine while also being driven directly by
/// whatever relays transactions in from the network.
#[derive(Default)]
pub struct Mempool {
    state: RwLock<State>,
    added_listeners: RwLock<Vec<Arc<dyn OnTransactionAdded>>>,
    removed_listeners: RwLock<Vec<Arc<dyn OnTransactionRemoved>>>,
}

impl Mempool {
    pub fn new() -> Mempool {
        Mempool::default()
    }

    pub fn register_transaction_added_listener(&self, listener: Arc<dyn OnTransactionAdded>) {
        self.added_listeners.write().push(listener);
    }

    pub fn register_transaction_removed_listener(&self, listener: Arc<dyn OnTransactionRemoved>) {
        self.removed_listeners.write().push(listener);
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, tx_id: &transaction::Hash) -> bool {
        self.state.read().entries.contains_key(tx_id)
    }

    /// Validates and admits `tx`. Rejects it outright if it is already
    /// present, is a coinbase, or spends an outpoint another pool entry
    /// already claims.
    pub fn add(
        &self,
        tx: Transaction,
        utxos: &dyn UtxoView,
        height: u32,
        coinbase_maturity: u32,
    ) -> Result<Amount<NonNegative>, ValidationError> {
        let tx_id = tx.hash();
        if tx.is_coinbase() {
            return Err(ValidationError::UnexpectedCoinbase);
        }

        {
            let state = self.state.read();
            if state.entries.contains_key(&tx_id) {
                return Err(ValidationError::AlreadyInMempool);
            }
            for input in &tx.inputs {
                if state.spent_outpoints.contains(&input.outpoint) {
                    return Err(ValidationError::DuplicateInput(
                        input.outpoint.prev_tx_id,
                        input.outpoint.output_index,
                    ));
                }
            }
        }

        let fee = validate_transaction(&tx, utxos, height, false, Amount::zero(), coinbase_maturity)?;
        let size = tx.serialized_len() as u64;

        {
            let mut state = self.state.write();
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            for input in &tx.inputs {
                state.spent_outpoints.insert(input.outpoint);
            }
            let received_at = Utc::now().timestamp();
            state.entries.insert(tx_id, Entry { tx, size, fee, sequence, received_at });
        }

        metrics::gauge!("mempool.size", self.len() as f64);
        for listener in self.added_listeners.read().iter() {
            listener.transaction_added(tx_id);
        }
        Ok(fee)
    }

    /// Removes `tx_id` if present, returning whether it was.
    pub fn remove(&self, tx_id: &transaction::Hash) -> bool {
        let removed = {
            let mut state = self.state.write();
            match state.entries.remove(tx_id) {
                Some(entry) => {
                    for input in &entry.tx.inputs {
                        state.spent_outpoints.remove(&input.outpoint);
                    }
                    true
                }
                None => false,
            }
        };
        if removed {
            metrics::gauge!("mempool.size", self.len() as f64);
            for listener in self.removed_listeners.read().iter() {
                listener.transaction_removed(*tx_id);
            }
        }
        removed
    }

    /// Selects transactions in descending fee-per-byte order, skipping any
    /// that would exceed `size_budget` or that double-spend an
    /// already-selected transaction's input, until the whole pool has been
    /// scanned.
    pub fn pick_transactions(&self, size_budget: u64) -> Vec<Transaction> {
        let state = self.state.read();
        let mut candidates: Vec<&Entry> = state.entries.values().collect();
        candidates.sort_by(|a, b| {
            let lhs = a.fee.value().max(0) as u128 * b.size as u128;
            let rhs = b.fee.value().max(0) as u128 * a.size as u128;
            rhs.cmp(&lhs).then_with(|| a.sequence.cmp(&b.sequence))
        });

        let mut used = 0u64;
        let mut claimed: HashSet<OutPoint> = HashSet::new();
        let mut selected = Vec::new();
        for entry in candidates {
            if entry.tx.inputs.iter().any(|input| claimed.contains(&input.outpoint)) {
                continue;
            }
            if used.saturating_add(entry.size) > size_budget {
                continue;
            }
            used += entry.size;
            for input in &entry.tx.inputs {
                claimed.insert(input.outpoint);
            }
            selected.push(entry.tx.clone());
        }
        selected
    }

    /// Evicts every entry that no longer validates against `utxos` (its
    /// inputs were spent by a confirmed transaction outside the pool, or it
    /// no longer satisfies coinbase maturity at the current height) or that
    /// has sat in the pool longer than `MAX_MEMPOOL_AGE_SECONDS`.
    pub fn cleanup(&self, utxos: &dyn UtxoView, height: u32, coinbase_maturity: u32) {
        let now = Utc::now().timestamp();
        let stale: Vec<transaction::Hash> = {
            let state = self.state.read();
            state
                .entries
                .iter()
                .filter(|(_, entry)| {
                    now.saturating_sub(entry.received_at) > thunderbolt_chain::parameters::MAX_MEMPOOL_AGE_SECONDS
                        || validate_transaction(&entry.tx, utxos, height, false, Amount::zero(), coinbase_maturity)
                            .is_err()
                })
                .map(|(id, _)| *id)
                .collect()
        };
        for id in stale {
            self.remove(&id);
        }
    }
}

impl OnOutputsUpdate for Mempool {
    /// A confirmed spend of an outpoint makes every pool entry that also
    /// spends it permanently invalid (whether it was the very transaction
    /// that just confirmed, or one that double-spent it) — evict them.
    fn outputs_update(&self, removed: &[(transaction::Hash, u32)], _added: &[(transaction::Hash, u32, Utxo)]) {
        let stale: Vec<transaction::Hash> = {
            let state = self.state.read();
            state
                .entries
                .values()
                .filter(|entry| {
                    entry
                        .tx
                        .inputs
                        .iter()
                        .any(|input| removed.contains(&(input.outpoint.prev_tx_id, input.outpoint.output_index)))
                })
                .map(|entry| entry.tx.hash())
                .collect()
        };
        for id in stale {
            self.remove(&id);
        }
    }
}

impl OnBlockRolledBack for Mempool {
    /// A rolled-back block's non-coinbase transactions return to being
    /// unconfirmed; re-admit them through the normal `add` path so a
    /// transaction that is no longer valid (e.g. one of its inputs was
    /// spent by something else on the new best chain) is silently dropped
    /// rather than resurrected.
    fn block_rolled_back(&self, transactions: &[Transaction], utxo_view: &dyn UtxoView, height: u32) {
        for tx in transactions {
            if tx.is_coinbase() {
                continue;
            }
            let _ = self.add(tx.clone(), utxo_view, height, thunderbolt_chain::parameters::COINBASE_MATURITY);
        }
    }
}
