//! The persistence service (spec §4.5): composes the block store, the
//! reverse-delta store, and the metadata provider into the transactional
//! surface the blockchain engine drives.

use thunderbolt_chain::block::{self, Block};
use thunderbolt_chain::codec::{Decode, Encode};
use thunderbolt_chain::transaction::{self, Transaction};
use thunderbolt_chain::transparent::Utxo;
use primitive_types::U256;

use crate::block_store::SegmentedStore;
use crate::config::Config;
use crate::error::StoreError;
use crate::metadata::sled_store::SledMetadataProvider;
use crate::metadata::{BlockMetadata, BlockStatus, MetadataOp, MetadataProvider, TransactionMetadata};
use crate::reverse_delta::ReverseDelta;

/// The persistence service backing a running node: `SledMetadataProvider`
/// plus two `SegmentedStore`s. Generic over the metadata provider so tests
/// can substitute `InMemoryMetadataProvider` without a real sled database,
/// while still exercising the two real segment files on a temp directory
/// (the cheap part of the I/O surface to keep real in tests).
pub struct PersistenceService<M: MetadataProvider> {
    blocks: SegmentedStore,
    reverts: SegmentedStore,
    metadata: M,
}

impl PersistenceService<SledMetadataProvider> {
    /// Opens the on-disk persistence service for `network` under `config`.
    pub fn open(config: &Config, network: thunderbolt_chain::parameters::Network) -> Result<Self, StoreError> {
        let blocks = SegmentedStore::open(&config.block_store_dir(network), "block", crate::config::SEGMENT_ROLL_THRESHOLD)?;
        let reverts = SegmentedStore::open(&config.revert_store_dir(network), "revert", crate::config::SEGMENT_ROLL_THRESHOLD)?;
        let metadata = SledMetadataProvider::open(&config.metadata_dir(network), config.ephemeral)?;
        Ok(PersistenceService { blocks, reverts, metadata })
    }
}

impl<M: MetadataProvider> PersistenceService<M> {
    /// Builds a persistence service over an already-constructed metadata
    /// provider (e.g. `InMemoryMetadataProvider` in tests) and real segment
    /// stores rooted at `blocks_dir`/`reverts_dir`.
    pub fn with_metadata_provider(
        metadata: M,
        blocks_dir: &std::path::Path,
        reverts_dir: &std::path::Path,
    ) -> Result<Self, StoreError> {
        let blocks = SegmentedStore::open(blocks_dir, "block", crate::config::SEGMENT_ROLL_THRESHOLD)?;
        let reverts = SegmentedStore::open(reverts_dir, "revert", crate::config::SEGMENT_ROLL_THRESHOLD)?;
        Ok(PersistenceService { blocks, reverts, metadata })
    }

    /// Appends `block` and its pre-computed `reverse_delta`, then commits
    /// the metadata write, the UTXO set changes, and the chain-head advance
    /// to `block_id` as one atomic [`MetadataProvider::apply_batch`] (spec
    /// §8: a crash can never leave the UTXO set and the chain-head pointer
    /// disagreeing about which block is current). The block/revert segment
    /// appends happen first and are not part of that batch; if the batch
    /// never runs, the bytes already on disk are orphaned but harmless — no
    /// metadata will ever point at them. `status` is the caller's call:
    /// `OnMainChain` for a block actually extending the canonical chain,
    /// `Validated` for a side branch or a reorg candidate still being
    /// speculatively replayed.
    pub fn persist_block(
        &mut self,
        block: &Block,
        reverse_delta: &ReverseDelta,
        height: u32,
        cumulative_work: U256,
        total_fees: u64,
        status: BlockStatus,
    ) -> Result<block::Hash, StoreError> {
        let block_id = block.hash();

        let revert_locator = self.reverts.append(&reverse_delta.encode_to_vec())?;
        self.reverts.flush()?;

        let block_locator = self.blocks.append(&block.encode_to_vec())?;
        self.blocks.flush()?;

        let metadata = BlockMetadata {
            header: block.header,
            height,
            cumulative_work,
            status,
            block_locator,
            revert_locator,
            tx_count: block.transactions.len() as u32,
            total_fees,
        };

        let mut ops = vec![MetadataOp::PutBlockMetadata(block_id, metadata)];

        let mut offset = 0u32;
        for tx in &block.transactions {
            let tx_id = tx.hash();
            let size = tx.serialized_len() as u32;
            ops.push(MetadataOp::PutTransactionMetadata(tx_id, TransactionMetadata { block_id, offset, size }));
            offset += size;
        }

        for (tx_id, index, _utxo) in &reverse_delta.consumed {
            ops.push(MetadataOp::RemoveUnspentOutput(*tx_id, *index));
        }

        for (tx_index, tx) in block.transactions.iter().enumerate() {
            let tx_id = tx.hash();
            let is_coinbase = tx_index == 0;
            for (output_index, output) in tx.outputs.iter().enumerate() {
                let utxo = Utxo { output: output.clone(), height, is_coinbase };
                ops.push(MetadataOp::AddUnspentOutput(tx_id, output_index as u32, utxo));
            }
        }

        ops.push(MetadataOp::SetChainHead(block_id));
        self.metadata.apply_batch(ops)?;

        metrics::counter!("chain.blocks.persisted", 1);
        metrics::gauge!("chain.head.height", height as f64);

        Ok(block_id)
    }

    /// Undoes a committed block's effect on the UTXO set and transaction
    /// index, marks it `Stale`, and advances the chain head to
    /// `new_chain_head` (the caller's parent block), all as one atomic
    /// [`MetadataProvider::apply_batch`] for the same crash-recovery reason
    /// `persist_block` batches its writes. Re-inserting
    /// `reverse_delta.consumed` immediately after persisting the same block
    /// restores the UTXO set bitwise (the rollback-reversibility property).
    pub fn rollback(&mut self, block_id: block::Hash, new_chain_head: block::Hash) -> Result<(), StoreError> {
        let mut metadata = self
            .metadata
            .get_block_metadata(&block_id)?
            .ok_or(StoreError::UnknownBlock(block_id))?;

        let reverse_delta = self.read_reverse_delta_at(metadata.revert_locator)?;

        let mut ops = Vec::new();
        for (tx_id, index) in &reverse_delta.created {
            ops.push(MetadataOp::RemoveUnspentOutput(*tx_id, *index));
        }
        for (tx_id, index, utxo) in &reverse_delta.consumed {
            ops.push(MetadataOp::AddUnspentOutput(*tx_id, *index, utxo.clone()));
        }

        let block = self.read_block_at(metadata.block_locator)?;
        for tx in &block.transactions {
            ops.push(MetadataOp::RemoveTransactionMetadata(tx.hash()));
        }

        metadata.status = BlockStatus::Stale;
        ops.push(MetadataOp::PutBlockMetadata(block_id, metadata));
        ops.push(MetadataOp::SetChainHead(new_chain_head));

        self.metadata.apply_batch(ops)?;

        metrics::counter!("chain.blocks.rolled_back", 1);
        Ok(())
    }

    pub fn read_block(&self, block_id: block::Hash) -> Result<Option<Block>, StoreError> {
        match self.metadata.get_block_metadata(&block_id)? {
            Some(metadata) => Ok(Some(self.read_block_at(metadata.block_locator)?)),
            None => Ok(None),
        }
    }

    pub fn read_reverse_delta(&self, block_id: block::Hash) -> Result<Option<ReverseDelta>, StoreError> {
        match self.metadata.get_block_metadata(&block_id)? {
            Some(metadata) => Ok(Some(self.read_reverse_delta_at(metadata.revert_locator)?)),
            None => Ok(None),
        }
    }

    pub fn get_utxo(&self, tx_id: &transaction::Hash, index: u32) -> Result<Option<Utxo>, StoreError> {
        self.metadata.get_unspent_output(tx_id, index)
    }

    pub fn get_transaction(&self, tx_id: &transaction::Hash) -> Result<Option<(Transaction, TransactionMetadata)>, StoreError> {
        let tx_metadata = match self.metadata.get_transaction_metadata(tx_id)? {
            Some(metadata) => metadata,
            None => return Ok(None),
        };
        let block = self
            .read_block(tx_metadata.block_id)?
            .ok_or(StoreError::Corrupt("transaction metadata points at a missing block"))?;
        let tx = block
            .transactions
            .into_iter()
            .find(|tx| tx.hash() == *tx_id)
            .ok_or(StoreError::Corrupt("transaction not found in the block its metadata names"))?;
        Ok(Some((tx, tx_metadata)))
    }

    pub fn get_block_metadata(&self, block_id: &block::Hash) -> Result<Option<BlockMetadata>, StoreError> {
        self.metadata.get_block_metadata(block_id)
    }

    pub fn put_block_metadata(&mut self, block_id: &block::Hash, metadata: &BlockMetadata) -> Result<(), StoreError> {
        self.metadata.put_block_metadata(block_id, metadata)
    }

    pub fn get_chain_head(&self) -> Result<Option<block::Hash>, StoreError> {
        self.metadata.get_chain_head()
    }

    pub fn get_unspent_outputs_for_address(&self, pubkey_hash: &[u8; 20]) -> Result<Vec<(transaction::Hash, u32)>, StoreError> {
        self.metadata.get_unspent_outputs_for_address(pubkey_hash)
    }

    fn read_block_at(&self, locator: crate::locator::Locator) -> Result<Block, StoreError> {
        let bytes = self.blocks.read(locator)?;
        Ok(Block::decode(&bytes[..])?)
    }

    fn read_reverse_delta_at(&self, locator: crate::locator::Locator) -> Result<ReverseDelta, StoreError> {
        let bytes = self.reverts.read(locator)?;
        Ok(ReverseDelta::decode(&bytes[..])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::memory::InMemoryMetadataProvider;
    use std::convert::TryFrom;
    use thunderbolt_chain::amount::{Amount, NonNegative};
    use thunderbolt_chain::block::Header;
    use thunderbolt_chain::transparent::{Input, LockingParameters, OutPoint, Output, UnlockingParameters};
    use thunderbolt_chain::work::difficulty::CompactDifficulty;

    fn coinbase() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![Input {
                outpoint: OutPoint::coinbase(),
                unlocking_parameters: UnlockingParameters::SingleSig { pubkey: [0; 33], signature: Vec::new() },
                sequence: 0xffff_ffff,
            }],
            outputs: vec![Output {
                amount: Amount::<NonNegative>::try_from(5_000_000_000i64).unwrap(),
                locking_parameters: LockingParameters::single_sig([1; 20]),
            }],
            lock_time: 0,
        }
    }

    fn service() -> (PersistenceService<InMemoryMetadataProvider>, tempdir::TempDir, tempdir::TempDir) {
        let blocks_dir = tempdir::TempDir::new("thunderbolt-blocks").unwrap();
        let reverts_dir = tempdir::TempDir::new("thunderbolt-reverts").unwrap();
        let service = PersistenceService::with_metadata_provider(
            InMemoryMetadataProvider::new(),
            blocks_dir.path(),
            reverts_dir.path(),
        )
        .unwrap();
        (service, blocks_dir, reverts_dir)
    }

    fn template_header() -> Header {
        Header {
            version: 1,
            parent_hash: block::Hash::from_bytes([0; 32]),
            merkle_root: [0; 32],
            timestamp: 1_700_000_000,
            target_difficulty: CompactDifficulty(0x207f_ffff),
            nonce: 0,
        }
    }

    #[test]
    fn persisting_then_reading_a_block_round_trips() {
        let (mut service, _blocks_dir, _reverts_dir) = service();
        let block = Block::new(template_header(), vec![coinbase()]);

        let block_id = service
            .persist_block(&block, &ReverseDelta::default(), 1, U256::from(100u32), 0, BlockStatus::OnMainChain)
            .unwrap();

        assert_eq!(service.read_block(block_id).unwrap(), Some(block));
        assert!(service.get_utxo(&coinbase().hash(), 0).unwrap().is_some());
    }

    #[test]
    fn rollback_restores_the_utxo_set() {
        let (mut service, _blocks_dir, _reverts_dir) = service();
        let block = Block::new(template_header(), vec![coinbase()]);
        let tx_id = coinbase().hash();

        let block_id = service
            .persist_block(&block, &ReverseDelta::default(), 1, U256::from(100u32), 0, BlockStatus::OnMainChain)
            .unwrap();
        assert!(service.get_utxo(&tx_id, 0).unwrap().is_some());

        service.rollback(block_id, block.header.parent_hash).unwrap();
        assert!(service.get_utxo(&tx_id, 0).unwrap().is_none());

        let metadata = service.get_block_metadata(&block_id).unwrap().unwrap();
        assert_eq!(metadata.status, BlockStatus::Stale);
    }

    #[test]
    fn rollback_of_a_spend_restores_the_consumed_utxo() {
        let (mut service, _blocks_dir, _reverts_dir) = service();
        let genesis = Block::new(template_header(), vec![coinbase()]);
        let genesis_tx = coinbase();
        let genesis_utxo_key = (genesis_tx.hash(), 0u32);

        service.persist_block(&genesis, &ReverseDelta::default(), 0, U256::from(1u32), 0, BlockStatus::OnMainChain).unwrap();
        let consumed_utxo = service.get_utxo(&genesis_utxo_key.0, genesis_utxo_key.1).unwrap().unwrap();

        let mut spend_header = template_header();
        spend_header.parent_hash = genesis.hash();
        let spend_coinbase = coinbase();
        let spend = Block::new(spend_header, vec![spend_coinbase]);

        let delta = ReverseDelta {
            consumed: vec![(genesis_utxo_key.0, genesis_utxo_key.1, consumed_utxo.clone())],
            created: vec![],
        };
        let spend_id = service.persist_block(&spend, &delta, 1, U256::from(2u32), 0, BlockStatus::OnMainChain).unwrap();
        assert!(service.get_utxo(&genesis_utxo_key.0, genesis_utxo_key.1).unwrap().is_none());

        service.rollback(spend_id, genesis.hash()).unwrap();
        assert_eq!(
            service.get_utxo(&genesis_utxo_key.0, genesis_utxo_key.1).unwrap(),
            Some(consumed_utxo)
        );
    }
}
