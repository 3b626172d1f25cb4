//! The blockchain engine (spec §4.8): the state machine that accepts
//! submitted blocks, validates them in context, and keeps the persisted
//! chain state as the heaviest valid chain, replaying LCA-based
//! reorganizations when a competing branch overtakes the current tip.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use thunderbolt_chain::block::{self, Block};
use thunderbolt_chain::parameters::{Network, COINBASE_MATURITY};
use thunderbolt_chain::transaction;
use thunderbolt_chain::transparent::Utxo;
use thunderbolt_chain::work::difficulty::{retarget, CompactDifficulty, RETARGET_INTERVAL};
use thunderbolt_storage::{BlockMetadata, BlockStatus, MetadataProvider, PersistenceService, ReverseDelta};

use crate::error::{BlockError, EngineError};
use crate::listener::{OnBlockCommitted, OnBlockRolledBack, OnOutputsUpdate};
use crate::{block::check, transaction::UtxoView};

/// Owns the persisted chain state and drives it forward one submitted
/// block at a time. Generic over the metadata provider so a test can run
/// the whole engine over `InMemoryMetadataProvider`.
pub struct BlockchainEngine<M: MetadataProvider> {
    persistence: RwLock<PersistenceService<M>>,
    network: Network,
    outputs_listeners: RwLock<Vec<Arc<dyn OnOutputsUpdate>>>,
    committed_listeners: RwLock<Vec<Arc<dyn OnBlockCommitted>>>,
    rolled_back_listeners: RwLock<Vec<Arc<dyn OnBlockRolledBack>>>,
}

impl<M: MetadataProvider> BlockchainEngine<M> {
    pub fn new(persistence: PersistenceService<M>, network: Network) -> BlockchainEngine<M> {
        BlockchainEngine {
            persistence: RwLock::new(persistence),
            network,
            outputs_listeners: RwLock::new(Vec::new()),
            committed_listeners: RwLock::new(Vec::new()),
            rolled_back_listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn register_outputs_listener(&self, listener: Arc<dyn OnOutputsUpdate>) {
        self.outputs_listeners.write().push(listener);
    }

    pub fn register_block_committed_listener(&self, listener: Arc<dyn OnBlockCommitted>) {
        self.committed_listeners.write().push(listener);
    }

    pub fn register_block_rolled_back_listener(&self, listener: Arc<dyn OnBlockRolledBack>) {
        self.rolled_back_listeners.write().push(listener);
    }

    pub fn chain_head(&self) -> Result<Option<block::Hash>, EngineError> {
        Ok(self.persistence.read().get_chain_head()?)
    }

    pub fn block_metadata(&self, id: &block::Hash) -> Result<Option<BlockMetadata>, EngineError> {
        Ok(self.persistence.read().get_block_metadata(id)?)
    }

    pub fn get_utxo(&self, tx_id: &transaction::Hash, index: u32) -> Result<Option<Utxo>, EngineError> {
        Ok(self.persistence.read().get_utxo(tx_id, index)?)
    }

    /// Runs `f` against a read-only view of the live UTXO set, for callers
    /// (the mempool, wallet queries) that need one but must not hold the
    /// engine's lock any longer than the call itself.
    pub fn with_utxo_view<R>(&self, f: impl FnOnce(&dyn UtxoView) -> R) -> R {
        let persistence = self.persistence.read();
        f(&*persistence as &dyn UtxoView)
    }

    /// The height a block extending the current tip would have (0 if the
    /// chain has no blocks yet).
    pub fn next_height(&self) -> Result<u32, EngineError> {
        let persistence = self.persistence.read();
        match persistence.get_chain_head()? {
            Some(head) => {
                let metadata = persistence
                    .get_block_metadata(&head)?
                    .ok_or_else(|| EngineError::ReorganizationFailed("missing metadata for the current head".into()))?;
                Ok(metadata.height + 1)
            }
            None => Ok(0),
        }
    }

    /// Seeds an empty chain with `genesis`. This is the one block
    /// `submit_block` can never accept — its `parent_hash` is the
    /// well-known sentinel, never a block this engine has stored — so a
    /// fresh node calls this once before any `submit_block` call, and never
    /// again once the chain has a head.
    pub fn bootstrap_genesis(&self, genesis: Block) -> Result<block::Hash, EngineError> {
        let mut persistence = self.persistence.write();
        if persistence.get_chain_head()?.is_some() {
            return Err(EngineError::ReorganizationFailed("chain already has a genesis block".into()));
        }
        if genesis.header.parent_hash != thunderbolt_chain::parameters::GENESIS_PREVIOUS_BLOCK_HASH {
            return Err(BlockError::UnknownParent(genesis.header.parent_hash).into());
        }

        check::proof_of_work_is_valid(&genesis, self.network)?;
        check::body_is_valid(&genesis, &*persistence, 0, COINBASE_MATURITY)?;

        let target = genesis.header.target_difficulty.to_expanded().ok_or(BlockError::WrongDifficulty)?;
        self.apply(&mut persistence, &genesis, 0, target.work())?;
        Ok(genesis.hash())
    }

    /// Validates `block` in context and, if it extends the current best
    /// chain or overtakes it via reorganization, commits it durably.
    pub fn submit_block(&self, block: Block) -> Result<block::Hash, EngineError> {
        let mut persistence = self.persistence.write();
        let block_id = block.hash();

        if persistence.get_block_metadata(&block_id)?.is_some() {
            return Err(EngineError::InvalidBlock(BlockError::AlreadyKnown(block_id)));
        }

        let parent_metadata = persistence
            .get_block_metadata(&block.header.parent_hash)?
            .ok_or(BlockError::UnknownParent(block.header.parent_hash))?;

        let expected_target = self.expected_target(&persistence, &parent_metadata)?;
        check::header_is_valid(&block, expected_target, Utc::now(), self.network)?;

        let new_height = parent_metadata.height + 1;
        let target = block
            .header
            .target_difficulty
            .to_expanded()
            .ok_or(BlockError::WrongDifficulty)?;
        let new_work = parent_metadata.cumulative_work.saturating_add(target.work());

        let current_head = persistence.get_chain_head()?;
        if current_head.map_or(true, |head| head == block.header.parent_hash) {
            self.apply(&mut persistence, &block, new_height, new_work)?;
        } else {
            self.reorganize(&mut persistence, &block, new_height, new_work)?;
        }

        Ok(block_id)
    }

    /// The target the block following `parent_metadata` must declare: the
    /// parent's target unchanged, except on a retarget boundary, where it is
    /// recomputed from the timespan of the just-completed 2016-block window.
    fn expected_target(
        &self,
        persistence: &PersistenceService<M>,
        parent_metadata: &BlockMetadata,
    ) -> Result<CompactDifficulty, EngineError> {
        let next_height = parent_metadata.height + 1;
        if next_height % RETARGET_INTERVAL != 0 || next_height == 0 {
            return Ok(parent_metadata.header.target_difficulty);
        }

        let mut window_start = parent_metadata.clone();
        for _ in 0..(RETARGET_INTERVAL - 1) {
            window_start = persistence
                .get_block_metadata(&window_start.header.parent_hash)?
                .ok_or_else(|| EngineError::ReorganizationFailed("retarget window walked off known history".into()))?;
        }

        let previous = parent_metadata
            .header
            .target_difficulty
            .to_expanded()
            .ok_or(BlockError::WrongDifficulty)?;
        let expanded = retarget(previous, window_start.header.timestamp, parent_metadata.header.timestamp, self.network);
        Ok(CompactDifficulty::from_expanded(expanded))
    }

    /// Validates `block`'s body against the live UTXO set, commits it as the
    /// new tip at `height` with status `OnMainChain`, and immediately fires
    /// the outputs-update and block-committed listeners. Used for a direct,
    /// non-reorganizing extension of the tip, where there is no speculative
    /// outcome to wait on.
    fn apply(
        &self,
        persistence: &mut PersistenceService<M>,
        block: &Block,
        height: u32,
        cumulative_work: primitive_types::U256,
    ) -> Result<(), EngineError> {
        let (block_id, removed, added) =
            self.apply_only(persistence, block, height, cumulative_work, BlockStatus::OnMainChain)?;
        self.notify_committed(block_id, height, &removed, &added);
        Ok(())
    }

    /// Does everything [`Self::apply`] does except notify listeners, and
    /// persists the block with the given `status` rather than always
    /// `OnMainChain`. Reorganization uses this directly so a losing replay
    /// attempt never reaches a listener and never claims to be on the main
    /// chain; the caller notifies via [`Self::notify_committed`] once the
    /// outcome is known.
    fn apply_only(
        &self,
        persistence: &mut PersistenceService<M>,
        block: &Block,
        height: u32,
        cumulative_work: primitive_types::U256,
        status: BlockStatus,
    ) -> Result<(block::Hash, Vec<(transaction::Hash, u32)>, Vec<(transaction::Hash, u32, Utxo)>), EngineError> {
        let total_fees = check::body_is_valid(block, &*persistence, height, COINBASE_MATURITY)?;
        let reverse_delta = build_reverse_delta(&*persistence, block)?;

        let block_id = persistence.persist_block(block, &reverse_delta, height, cumulative_work, total_fees.value() as u64, status)?;

        let removed: Vec<(transaction::Hash, u32)> =
            reverse_delta.consumed.iter().map(|(tx_id, index, _)| (*tx_id, *index)).collect();
        let mut added = Vec::with_capacity(reverse_delta.created.len());
        for (tx_id, index) in &reverse_delta.created {
            if let Some(utxo) = persistence.get_utxo(tx_id, *index)? {
                added.push((*tx_id, *index, utxo));
            }
        }

        Ok((block_id, removed, added))
    }

    fn notify_committed(
        &self,
        block_id: block::Hash,
        height: u32,
        removed: &[(transaction::Hash, u32)],
        added: &[(transaction::Hash, u32, Utxo)],
    ) {
        for listener in self.outputs_listeners.read().iter() {
            listener.outputs_update(removed, added);
        }
        for listener in self.committed_listeners.read().iter() {
            listener.block_committed(block_id, height);
        }
        metrics::counter!("chain.engine.blocks_applied", 1);
    }

    /// Undoes `block_id`'s commit and immediately fires the corresponding
    /// outputs-update and block-rolled-back listeners. `transactions` is the
    /// block's own transaction list (read before calling, since the
    /// rollback doesn't return it). Used outside of a reorganization attempt
    /// (there is none in this engine today, but kept symmetric with
    /// [`Self::apply`] for callers that don't need suppression).
    fn unapply(
        &self,
        persistence: &mut PersistenceService<M>,
        block_id: block::Hash,
        height: u32,
        transactions: &[thunderbolt_chain::transaction::Transaction],
    ) -> Result<(), EngineError> {
        let (removed, added, non_coinbase) = self.unapply_only(persistence, block_id, height, transactions)?;
        self.notify_rolled_back(persistence, height, &removed, &added, &non_coinbase);
        Ok(())
    }

    /// Does everything [`Self::unapply`] does except notify listeners; see
    /// [`Self::apply_only`].
    fn unapply_only(
        &self,
        persistence: &mut PersistenceService<M>,
        block_id: block::Hash,
        _height: u32,
        transactions: &[thunderbolt_chain::transaction::Transaction],
    ) -> Result<
        (Vec<(transaction::Hash, u32)>, Vec<(transaction::Hash, u32, Utxo)>, Vec<thunderbolt_chain::transaction::Transaction>),
        EngineError,
    > {
        let reverse_delta = persistence
            .read_reverse_delta(block_id)?
            .ok_or_else(|| EngineError::ReorganizationFailed("missing reverse delta for a known block".into()))?;
        let parent_hash = persistence
            .get_block_metadata(&block_id)?
            .ok_or_else(|| EngineError::ReorganizationFailed("missing metadata for a known block".into()))?
            .header
            .parent_hash;

        persistence.rollback(block_id, parent_hash)?;

        let removed: Vec<(transaction::Hash, u32)> = reverse_delta.created.clone();
        let added = reverse_delta.consumed.clone();
        let non_coinbase: Vec<_> = transactions.iter().skip(1).cloned().collect();

        Ok((removed, added, non_coinbase))
    }

    fn notify_rolled_back(
        &self,
        persistence: &PersistenceService<M>,
        height: u32,
        removed: &[(transaction::Hash, u32)],
        added: &[(transaction::Hash, u32, Utxo)],
        non_coinbase: &[thunderbolt_chain::transaction::Transaction],
    ) {
        for listener in self.outputs_listeners.read().iter() {
            listener.outputs_update(removed, added);
        }
        for listener in self.rolled_back_listeners.read().iter() {
            listener.block_rolled_back(non_coinbase, persistence as &dyn UtxoView, height);
        }
        metrics::counter!("chain.engine.blocks_rolled_back", 1);
    }

    /// Attempts to replace the current best chain with the one ending at
    /// `new_block`: finds the lowest common ancestor, rolls back the losing
    /// branch, and speculatively replays the winning branch (including
    /// blocks stored from an earlier, since-lost submission) followed by
    /// `new_block` itself. The replay happens unconditionally — even a
    /// competing branch that turns out not to exceed the current chain's
    /// work is persisted this way, so a later, heavier block building on it
    /// still finds a known parent. If the replay errors, the old branch is
    /// restored and the error is returned — the submission itself failed.
    /// If the replay succeeds but does not exceed the prior chain's
    /// cumulative work, this is not a failure (spec §4.8 step 7): the old
    /// branch is still restored as the live chain, but `new_block` and any
    /// newly-applied ancestors stay on record as ordinary validated side
    /// branches (`BlockStatus::Validated`, not `Stale` — that status is
    /// reserved for a block actually undone off the main chain) and
    /// `submit_block` returns `Ok` with the block accepted, just not head.
    /// On success, `new_branch` and `new_block` are retagged `OnMainChain`
    /// and the restored `old_branch` blocks, having gone through
    /// [`Self::unapply_only`]'s rollback path, are already `Stale`.
    fn reorganize(
        &self,
        persistence: &mut PersistenceService<M>,
        new_block: &Block,
        new_height: u32,
        new_work: primitive_types::U256,
    ) -> Result<(), EngineError> {
        let current_head = persistence
            .get_chain_head()?
            .ok_or_else(|| EngineError::ReorganizationFailed("no current head to reorganize from".into()))?;
        let current_metadata = persistence
            .get_block_metadata(&current_head)?
            .ok_or_else(|| EngineError::ReorganizationFailed("missing metadata for the current head".into()))?;

        let old_chain = ancestor_chain(persistence, current_head)?;
        let new_chain = ancestor_chain(persistence, new_block.header.parent_hash)?;

        let old_set: HashSet<block::Hash> = old_chain.iter().map(|(hash, _)| *hash).collect();
        let lca = new_chain
            .iter()
            .find(|(hash, _)| old_set.contains(hash))
            .map(|(hash, _)| *hash)
            .ok_or_else(|| EngineError::ReorganizationFailed("no common ancestor with the current chain".into()))?;

        let old_branch: Vec<(block::Hash, BlockMetadata)> =
            old_chain.into_iter().take_while(|(hash, _)| *hash != lca).collect();
        let mut new_branch: Vec<(block::Hash, BlockMetadata)> =
            new_chain.into_iter().take_while(|(hash, _)| *hash != lca).collect();
        new_branch.reverse();

        // Roll back and replay with listener notification suppressed: a
        // competing branch that turns out not to exceed the current chain's
        // work must never have been visible to a listener. Each step's
        // would-be notification is collected and only fired once the new
        // chain is confirmed, in final ascending order.
        type RollbackNotification =
            (u32, Vec<(transaction::Hash, u32)>, Vec<(transaction::Hash, u32, Utxo)>, Vec<thunderbolt_chain::transaction::Transaction>);
        type CommitNotification = (block::Hash, u32, Vec<(transaction::Hash, u32)>, Vec<(transaction::Hash, u32, Utxo)>);

        let mut pending_rollbacks: Vec<RollbackNotification> = Vec::with_capacity(old_branch.len());
        for (hash, metadata) in &old_branch {
            let block = persistence
                .read_block(*hash)?
                .ok_or_else(|| EngineError::ReorganizationFailed("missing block bytes during rollback".into()))?;
            let (removed, added, non_coinbase) = self.unapply_only(persistence, *hash, metadata.height, &block.transactions)?;
            pending_rollbacks.push((metadata.height, removed, added, non_coinbase));
        }

        let mut attempted_new_branch: Vec<block::Hash> = Vec::new();
        let mut pending_commits: Vec<CommitNotification> = Vec::with_capacity(new_branch.len() + 1);
        let replay_result: Result<(), EngineError> = (|| {
            for (hash, metadata) in &new_branch {
                let block = persistence
                    .read_block(*hash)?
                    .ok_or_else(|| EngineError::ReorganizationFailed("missing block bytes during replay".into()))?;
                let (block_id, removed, added) =
                    self.apply_only(persistence, &block, metadata.height, metadata.cumulative_work, BlockStatus::Validated)?;
                pending_commits.push((block_id, metadata.height, removed, added));
                attempted_new_branch.push(*hash);
            }
            let (block_id, removed, added) =
                self.apply_only(persistence, new_block, new_height, new_work, BlockStatus::Validated)?;
            pending_commits.push((block_id, new_height, removed, added));
            attempted_new_branch.push(new_block.hash());
            Ok(())
        })();

        if let Err(error) = replay_result {
            // The blocks in `attempted_new_branch` that did apply were each
            // individually valid; only a later block in the chain failed.
            // `restore_old_branch` unwinds them through the same rollback
            // path a genuinely-replaced main-chain block takes, which tags
            // status as `Stale` — retag them `Validated` since they were
            // never actually the chain head.
            self.restore_old_branch(persistence, &attempted_new_branch, &old_branch)?;
            self.retag_status(persistence, &attempted_new_branch, BlockStatus::Validated)?;
            return Err(error);
        }

        if new_work <= current_metadata.cumulative_work {
            // Not a reorg: the competing branch validated but doesn't beat
            // the current chain's work. Undo its speculative live effects
            // and restore the old branch as the chain head, same as a
            // failed replay, but this is a successful submission — the new
            // block (and any of its ancestors newly applied during the
            // attempted replay) is accepted and persisted as a side branch,
            // not rejected. `restore_old_branch` unapplies them through the
            // same rollback path a genuinely-replaced main-chain block
            // takes, which tags status as `Stale`; retag them `Validated`
            // here since they were never actually the chain head.
            self.restore_old_branch(persistence, &attempted_new_branch, &old_branch)?;
            self.retag_status(persistence, &attempted_new_branch, BlockStatus::Validated)?;
            return Ok(());
        }

        // The new branch wins: it is now the main chain. The old branch was
        // already tagged `Stale` by `unapply_only`'s rollback path; promote
        // every block the replay applied, including `new_block` itself, to
        // `OnMainChain`.
        self.retag_status(persistence, &attempted_new_branch, BlockStatus::OnMainChain)?;

        for (height, removed, added, non_coinbase) in &pending_rollbacks {
            self.notify_rolled_back(persistence, *height, removed, added, non_coinbase);
        }
        for (block_id, height, removed, added) in &pending_commits {
            self.notify_committed(*block_id, *height, removed, added);
        }

        Ok(())
    }

    /// Recovery path: undoes whatever of the new branch made it in (newest
    /// first, reading each one's height back from its own persisted
    /// metadata), then replays the original branch forward to restore the
    /// prior tip exactly. Entirely listener-silent: a reorganization attempt
    /// that gets rolled back here never happened as far as any listener is
    /// concerned.
    fn restore_old_branch(
        &self,
        persistence: &mut PersistenceService<M>,
        attempted_new_branch: &[block::Hash],
        old_branch: &[(block::Hash, BlockMetadata)],
    ) -> Result<(), EngineError> {
        for hash in attempted_new_branch.iter().rev() {
            if persistence.get_chain_head()? == Some(*hash) {
                let metadata = persistence
                    .get_block_metadata(hash)?
                    .ok_or_else(|| EngineError::ReorganizationFailed("missing metadata for an applied block during recovery".into()))?;
                let block = persistence.read_block(*hash)?.expect("just-applied block has stored bytes");
                self.unapply_only(persistence, *hash, metadata.height, &block.transactions)?;
            }
        }
        for (hash, metadata) in old_branch.iter().rev() {
            let block = persistence
                .read_block(*hash)?
                .ok_or_else(|| EngineError::ReorganizationFailed("missing block bytes during recovery".into()))?;
            self.apply_only(persistence, &block, metadata.height, metadata.cumulative_work, BlockStatus::OnMainChain)?;
        }
        Ok(())
    }

    /// Resets each named block's persisted status to `status`. Used to
    /// retag a branch `unapply_only`'s or `apply_only`'s path left in the
    /// wrong state for the outcome that was actually decided: a winning
    /// replay promotes its branch to `OnMainChain`; a losing or failed one
    /// demotes its speculatively-applied blocks back to `Validated` (they
    /// were never undone off the main chain, so `Stale` would be wrong).
    fn retag_status(
        &self,
        persistence: &mut PersistenceService<M>,
        hashes: &[block::Hash],
        status: BlockStatus,
    ) -> Result<(), EngineError> {
        for hash in hashes {
            let mut metadata = persistence
                .get_block_metadata(hash)?
                .ok_or_else(|| EngineError::ReorganizationFailed("missing metadata while retagging a branch".into()))?;
            metadata.status = status;
            persistence.put_block_metadata(hash, &metadata)?;
        }
        Ok(())
    }

    /// The standard exponentially-spaced set of ancestor hashes of the
    /// current tip, for a peer to find where its chain diverges from ours.
    pub fn block_locator_hashes(&self) -> Result<Vec<block::Hash>, EngineError> {
        let persistence = self.persistence.read();
        let head = match persistence.get_chain_head()? {
            Some(head) => head,
            None => return Ok(Vec::new()),
        };

        let mut hashes = Vec::new();
        let mut cursor = head;
        let mut step = 1u32;

        loop {
            hashes.push(cursor);
            let metadata = persistence
                .get_block_metadata(&cursor)?
                .ok_or_else(|| EngineError::ReorganizationFailed("locator walked off known history".into()))?;
            if metadata.height == 0 {
                break;
            }
            if hashes.len() > 10 {
                step *= 2;
            }

            let mut remaining = step.min(metadata.height);
            let mut walk_hash = cursor;
            let mut walk_metadata = metadata;
            while remaining > 0 {
                walk_hash = walk_metadata.header.parent_hash;
                walk_metadata = persistence
                    .get_block_metadata(&walk_hash)?
                    .ok_or_else(|| EngineError::ReorganizationFailed("locator walked off known history".into()))?;
                remaining -= 1;
            }
            cursor = walk_hash;
        }
        Ok(hashes)
    }
}

/// Collects `(hash, metadata)` from `start` back to genesis, inclusive.
fn ancestor_chain<M: MetadataProvider>(
    persistence: &PersistenceService<M>,
    start: block::Hash,
) -> Result<Vec<(block::Hash, BlockMetadata)>, EngineError> {
    let mut chain = Vec::new();
    let mut cursor = start;
    loop {
        let metadata = persistence
            .get_block_metadata(&cursor)?
            .ok_or_else(|| EngineError::ReorganizationFailed("missing ancestor metadata".into()))?;
        let height = metadata.height;
        let parent = metadata.header.parent_hash;
        chain.push((cursor, metadata));
        if height == 0 {
            break;
        }
        cursor = parent;
    }
    Ok(chain)
}

fn build_reverse_delta<M: MetadataProvider>(
    persistence: &PersistenceService<M>,
    block: &Block,
) -> Result<thunderbolt_storage::ReverseDelta, EngineError> {
    let mut consumed = Vec::new();
    for tx in block.transactions.iter().skip(1) {
        for input in &tx.inputs {
            let utxo = persistence
                .get_utxo(&input.outpoint.prev_tx_id, input.outpoint.output_index)?
                .ok_or_else(|| EngineError::ReorganizationFailed("body validation passed but the utxo vanished".into()))?;
            consumed.push((input.outpoint.prev_tx_id, input.outpoint.output_index, utxo));
        }
    }

    let mut created = Vec::new();
    for tx in &block.transactions {
        let tx_id = tx.hash();
        for output_index in 0..tx.outputs.len() {
            created.push((tx_id, output_index as u32));
        }
    }

    Ok(thunderbolt_storage::ReverseDelta { consumed, created })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;
    use thunderbolt_chain::amount::{Amount, NonNegative};
    use thunderbolt_chain::block::Header;
    use thunderbolt_chain::transaction::Transaction;
    use thunderbolt_chain::transparent::{Input, LockingParameters, OutPoint, Output, UnlockingParameters};
    use thunderbolt_storage::metadata::memory::InMemoryMetadataProvider;

    fn coinbase_paying(pubkey_hash: [u8; 20], amount: i64) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![Input {
                outpoint: OutPoint::coinbase(),
                unlocking_parameters: UnlockingParameters::SingleSig { pubkey: [0; 33], signature: Vec::new() },
                sequence: 0xffff_ffff,
            }],
            outputs: vec![Output {
                amount: Amount::<NonNegative>::try_from(amount).unwrap(),
                locking_parameters: LockingParameters::single_sig(pubkey_hash),
            }],
            lock_time: 0,
        }
    }

    fn genesis_block() -> Block {
        let header = Header {
            version: 1,
            parent_hash: block::Hash::from_bytes([0; 32]),
            merkle_root: [0; 32],
            timestamp: 1_700_000_000,
            target_difficulty: CompactDifficulty(0x207f_ffff),
            nonce: 0,
        };
        Block::new(header, vec![coinbase_paying([1; 20], crate::subsidy::subsidy(0).value())])
    }

    fn child_block(parent: &Block, nonce: u32, reward_to: [u8; 20]) -> Block {
        let header = Header {
            version: 1,
            parent_hash: parent.hash(),
            merkle_root: [0; 32],
            timestamp: parent.header.timestamp + 600,
            target_difficulty: CompactDifficulty(0x207f_ffff),
            nonce,
        };
        Block::new(header, vec![coinbase_paying(reward_to, crate::subsidy::subsidy(1).value())])
    }

    fn engine() -> BlockchainEngine<InMemoryMetadataProvider> {
        let blocks_dir = tempdir::TempDir::new("thunderbolt-engine-blocks").unwrap();
        let reverts_dir = tempdir::TempDir::new("thunderbolt-engine-reverts").unwrap();
        let persistence = PersistenceService::with_metadata_provider(
            InMemoryMetadataProvider::new(),
            blocks_dir.path(),
            reverts_dir.path(),
        )
        .unwrap();
        std::mem::forget(blocks_dir);
        std::mem::forget(reverts_dir);
        let engine = BlockchainEngine::new(persistence, Network::Mainnet);

        engine.bootstrap_genesis(genesis_block()).unwrap();
        engine
    }

    #[test]
    fn bootstrap_genesis_rejects_a_second_call() {
        let engine = engine();
        assert!(matches!(
            engine.bootstrap_genesis(genesis_block()),
            Err(EngineError::ReorganizationFailed(_))
        ));
    }

    #[test]
    fn bootstrap_genesis_rejects_a_block_whose_parent_hash_is_not_the_sentinel() {
        let blocks_dir = tempdir::TempDir::new("thunderbolt-engine-blocks").unwrap();
        let reverts_dir = tempdir::TempDir::new("thunderbolt-engine-reverts").unwrap();
        let persistence = PersistenceService::with_metadata_provider(
            InMemoryMetadataProvider::new(),
            blocks_dir.path(),
            reverts_dir.path(),
        )
        .unwrap();
        let engine = BlockchainEngine::new(persistence, Network::Mainnet);

        let mut not_genesis = genesis_block();
        not_genesis.header.parent_hash = block::Hash::from_bytes([0xaa; 32]);
        assert!(matches!(
            engine.bootstrap_genesis(not_genesis),
            Err(EngineError::InvalidBlock(BlockError::UnknownParent(_)))
        ));
    }

    #[test]
    fn submitting_a_block_that_extends_the_tip_commits_it() {
        let engine = engine();
        let genesis = engine.persistence.read().read_block(engine.chain_head().unwrap().unwrap()).unwrap().unwrap();
        let next = child_block(&genesis, 0, [2; 20]);

        let committed_id = engine.submit_block(next.clone()).unwrap();
        assert_eq!(committed_id, next.hash());
        assert_eq!(engine.chain_head().unwrap(), Some(next.hash()));
    }

    #[test]
    fn resubmitting_a_known_block_is_rejected() {
        let engine = engine();
        let genesis = engine.persistence.read().read_block(engine.chain_head().unwrap().unwrap()).unwrap().unwrap();
        let next = child_block(&genesis, 0, [2; 20]);
        engine.submit_block(next.clone()).unwrap();

        assert!(matches!(
            engine.submit_block(next),
            Err(EngineError::InvalidBlock(BlockError::AlreadyKnown(_)))
        ));
    }

    #[test]
    fn a_block_with_an_unknown_parent_is_rejected() {
        let engine = engine();
        let mut header = child_block(&genesis_block(), 0, [2; 20]).header;
        header.parent_hash = block::Hash::from_bytes([0xee; 32]);
        let orphan = Block::new(header, vec![coinbase_paying([3; 20], crate::subsidy::subsidy(1).value())]);

        assert!(matches!(
            engine.submit_block(orphan),
            Err(EngineError::InvalidBlock(BlockError::UnknownParent(_)))
        ));
    }

    #[test]
    fn a_competing_branch_that_outgrows_the_tip_triggers_a_reorg() {
        let engine = engine();
        let genesis_id = engine.chain_head().unwrap().unwrap();
        let genesis = engine.persistence.read().read_block(genesis_id).unwrap().unwrap();
        assert_eq!(engine.block_metadata(&genesis_id).unwrap().unwrap().status, BlockStatus::OnMainChain);

        let a1 = child_block(&genesis, 0, [2; 20]);
        engine.submit_block(a1.clone()).unwrap();
        assert_eq!(engine.chain_head().unwrap(), Some(a1.hash()));
        assert_eq!(engine.block_metadata(&a1.hash()).unwrap().unwrap().status, BlockStatus::OnMainChain);

        // b1 matches a1's work exactly, so it is accepted and persisted as a
        // side branch, but loses the tie and the original tip is restored.
        let b1 = child_block(&genesis, 1, [3; 20]);
        assert_eq!(engine.submit_block(b1.clone()).unwrap(), b1.hash());
        assert_eq!(engine.chain_head().unwrap(), Some(a1.hash()));
        assert!(engine.get_utxo(&b1.transactions[0].hash(), 0).unwrap().is_none());
        assert_eq!(engine.block_metadata(&b1.hash()).unwrap().unwrap().status, BlockStatus::Validated);
        assert_eq!(engine.block_metadata(&a1.hash()).unwrap().unwrap().status, BlockStatus::OnMainChain);

        // b2 extends the previously-losing branch past a1's total work, so
        // this submission reorganizes onto it.
        let b2 = child_block(&b1, 2, [4; 20]);
        let committed = engine.submit_block(b2.clone()).unwrap();
        assert_eq!(committed, b2.hash());
        assert_eq!(engine.chain_head().unwrap(), Some(b2.hash()));

        assert!(engine.get_utxo(&a1.transactions[0].hash(), 0).unwrap().is_none());
        assert!(engine.get_utxo(&b1.transactions[0].hash(), 0).unwrap().is_some());
        assert!(engine.get_utxo(&b2.transactions[0].hash(), 0).unwrap().is_some());

        // The now-displaced branch is Stale; the new main chain is OnMainChain.
        assert_eq!(engine.block_metadata(&a1.hash()).unwrap().unwrap().status, BlockStatus::Stale);
        assert_eq!(engine.block_metadata(&b1.hash()).unwrap().unwrap().status, BlockStatus::OnMainChain);
        assert_eq!(engine.block_metadata(&b2.hash()).unwrap().unwrap().status, BlockStatus::OnMainChain);
    }

    #[test]
    fn block_locator_hashes_starts_from_the_tip_and_ends_at_genesis() {
        let engine = engine();
        let genesis_id = engine.chain_head().unwrap().unwrap();
        let genesis = engine.persistence.read().read_block(genesis_id).unwrap().unwrap();
        let next = child_block(&genesis, 0, [2; 20]);
        engine.submit_block(next.clone()).unwrap();

        let locators = engine.block_locator_hashes().unwrap();
        assert_eq!(locators.first(), Some(&next.hash()));
        assert_eq!(locators.last(), Some(&genesis_id));
    }
}
