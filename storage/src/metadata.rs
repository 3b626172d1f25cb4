//! The metadata provider (spec §4.4): a key/value index over block
//! headers, transaction locations, UTXOs, and the chain-head pointer.
//!
//! [`MetadataProvider`] is the narrow trait the persistence service is
//! written against; [`sled_store::SledMetadataProvider`] is the disk-backed
//! implementation a real node runs, grounded on the teacher's
//! `sled::Tree`-per-index layout in `sled_state.rs`. [`memory::InMemoryMetadataProvider`]
//! is a `HashMap`-backed implementation used by tests throughout the
//! workspace, per the design note that the interface must not require a
//! real database to exercise.

use primitive_types::U256;
use thunderbolt_chain::block;
use thunderbolt_chain::codec::{CodecError, Decode, Encode};
use thunderbolt_chain::transaction;
use thunderbolt_chain::transparent::Utxo;

use crate::error::StoreError;
use crate::locator::Locator;

pub mod memory;
pub mod sled_store;

/// Where a validated block stands relative to the main chain (spec §4.8's
/// state machine, restricted to the three states the metadata store
/// actually persists — `Unknown`/`Received`/`HeaderValid`/`BodyValid` are
/// transient in-memory states the blockchain engine never writes down).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BlockStatus {
    Validated,
    OnMainChain,
    Stale,
}

const STATUS_VALIDATED: u8 = 0;
const STATUS_ON_MAIN_CHAIN: u8 = 1;
const STATUS_STALE: u8 = 2;

impl Encode for BlockStatus {
    fn encode<W: std::io::Write>(&self, mut writer: W) -> std::io::Result<()> {
        let tag = match self {
            BlockStatus::Validated => STATUS_VALIDATED,
            BlockStatus::OnMainChain => STATUS_ON_MAIN_CHAIN,
            BlockStatus::Stale => STATUS_STALE,
        };
        tag.encode(&mut writer)
    }
}

impl Decode for BlockStatus {
    fn decode<R: std::io::Read>(mut reader: R) -> Result<Self, CodecError> {
        match u8::decode(&mut reader)? {
            STATUS_VALIDATED => Ok(BlockStatus::Validated),
            STATUS_ON_MAIN_CHAIN => Ok(BlockStatus::OnMainChain),
            STATUS_STALE => Ok(BlockStatus::Stale),
            _ => Err(CodecError::Parse("unrecognized block status tag")),
        }
    }
}

/// Everything the engine and persistence layer track about one validated
/// block, beyond the block bytes themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockMetadata {
    pub header: block::Header,
    pub height: u32,
    pub cumulative_work: U256,
    pub status: BlockStatus,
    pub block_locator: Locator,
    pub revert_locator: Locator,
    pub tx_count: u32,
    pub total_fees: u64,
}

impl Encode for BlockMetadata {
    fn encode<W: std::io::Write>(&self, mut writer: W) -> std::io::Result<()> {
        self.header.encode(&mut writer)?;
        self.height.encode(&mut writer)?;
        let mut work_bytes = [0u8; 32];
        self.cumulative_work.to_big_endian(&mut work_bytes);
        writer.write_all(&work_bytes)?;
        self.status.encode(&mut writer)?;
        self.block_locator.encode(&mut writer)?;
        self.revert_locator.encode(&mut writer)?;
        self.tx_count.encode(&mut writer)?;
        self.total_fees.encode(&mut writer)
    }
}

impl Decode for BlockMetadata {
    fn decode<R: std::io::Read>(mut reader: R) -> Result<Self, CodecError> {
        let header = block::Header::decode(&mut reader)?;
        let height = u32::decode(&mut reader)?;
        let work_bytes = <[u8; 32]>::decode(&mut reader)?;
        let cumulative_work = U256::from_big_endian(&work_bytes);
        let status = BlockStatus::decode(&mut reader)?;
        let block_locator = Locator::decode(&mut reader)?;
        let revert_locator = Locator::decode(&mut reader)?;
        let tx_count = u32::decode(&mut reader)?;
        let total_fees = u64::decode(&mut reader)?;
        Ok(BlockMetadata {
            header,
            height,
            cumulative_work,
            status,
            block_locator,
            revert_locator,
            tx_count,
            total_fees,
        })
    }
}

/// Resolves a transaction identifier to its canonical on-disk location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thunderbolt_serde_derive::Encode, thunderbolt_serde_derive::Decode)]
pub struct TransactionMetadata {
    pub block_id: block::Hash,
    pub offset: u32,
    pub size: u32,
}

/// One write `apply_batch` can sequence atomically. Mirrors
/// [`MetadataProvider`]'s individual write methods one-for-one; see
/// `apply_batch`'s doc comment for why they're collected into a list
/// instead of called directly.
pub enum MetadataOp {
    PutBlockMetadata(block::Hash, BlockMetadata),
    PutTransactionMetadata(transaction::Hash, TransactionMetadata),
    RemoveTransactionMetadata(transaction::Hash),
    AddUnspentOutput(transaction::Hash, u32, Utxo),
    RemoveUnspentOutput(transaction::Hash, u32),
    SetChainHead(block::Hash),
}

/// The key/value index spec §4.4 describes. Every method beside
/// `apply_batch` is individually atomic but does not compose: a caller
/// sequencing several of them (the persistence service's
/// `persist_block`/`rollback`) gets no guarantee that a crash partway
/// through leaves anything more than a prefix of the writes durable.
/// `apply_batch` is what those two callers use instead, so the UTXO set and
/// the chain-head pointer can never crash out of agreement (spec §8's
/// crash-recovery property).
pub trait MetadataProvider {
    fn get_block_metadata(&self, id: &block::Hash) -> Result<Option<BlockMetadata>, StoreError>;
    fn put_block_metadata(&mut self, id: &block::Hash, metadata: &BlockMetadata) -> Result<(), StoreError>;

    fn get_transaction_metadata(&self, id: &transaction::Hash) -> Result<Option<TransactionMetadata>, StoreError>;
    fn put_transaction_metadata(
        &mut self,
        id: &transaction::Hash,
        metadata: &TransactionMetadata,
    ) -> Result<(), StoreError>;
    fn remove_transaction_metadata(&mut self, id: &transaction::Hash) -> Result<(), StoreError>;
    fn has_transaction(&self, id: &transaction::Hash) -> Result<bool, StoreError> {
        Ok(self.get_transaction_metadata(id)?.is_some())
    }

    fn get_unspent_output(&self, tx_id: &transaction::Hash, index: u32) -> Result<Option<Utxo>, StoreError>;
    fn add_unspent_output(&mut self, tx_id: &transaction::Hash, index: u32, utxo: &Utxo) -> Result<(), StoreError>;
    fn remove_unspent_output(&mut self, tx_id: &transaction::Hash, index: u32) -> Result<(), StoreError>;
    fn get_unspent_outputs_for_address(
        &self,
        pubkey_hash: &[u8; 20],
    ) -> Result<Vec<(transaction::Hash, u32)>, StoreError>;

    fn get_chain_head(&self) -> Result<Option<block::Hash>, StoreError>;
    fn set_chain_head(&mut self, id: &block::Hash) -> Result<(), StoreError>;

    /// Applies every op in `ops`, in order, as a single all-or-nothing unit.
    /// The default sequences the individual methods one at a time, which is
    /// correct but not atomic — fine for [`memory::InMemoryMetadataProvider`],
    /// where there's no process to crash mid-batch. [`sled_store::SledMetadataProvider`]
    /// overrides this with a real `sled` transaction spanning every tree
    /// touched.
    fn apply_batch(&mut self, ops: Vec<MetadataOp>) -> Result<(), StoreError> {
        for op in ops {
            match op {
                MetadataOp::PutBlockMetadata(id, metadata) => self.put_block_metadata(&id, &metadata)?,
                MetadataOp::PutTransactionMetadata(id, metadata) => self.put_transaction_metadata(&id, &metadata)?,
                MetadataOp::RemoveTransactionMetadata(id) => self.remove_transaction_metadata(&id)?,
                MetadataOp::AddUnspentOutput(tx_id, index, utxo) => self.add_unspent_output(&tx_id, index, &utxo)?,
                MetadataOp::RemoveUnspentOutput(tx_id, index) => self.remove_unspent_output(&tx_id, index)?,
                MetadataOp::SetChainHead(id) => self.set_chain_head(&id)?,
            }
        }
        Ok(())
    }
}

/// Extracts the address-index key (the locking pubkey hash) from a UTXO's
/// locking parameters, if it has one. `MultiSig` outputs are not indexed by
/// any single address (spec §6's address index is a single-sig convenience
/// the wallet uses; a multisig UTXO is still reachable via `get_utxo`).
pub(crate) fn address_key(utxo: &Utxo) -> Option<[u8; 20]> {
    match &utxo.output.locking_parameters {
        thunderbolt_chain::transparent::LockingParameters::SingleSig { pubkey_hash } => Some(*pubkey_hash),
        thunderbolt_chain::transparent::LockingParameters::MultiSig { .. } => None,
    }
}
