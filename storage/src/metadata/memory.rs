//! An in-memory [`MetadataProvider`], for unit and integration tests that
//! would otherwise need a real sled database just to exercise the
//! persistence service or the blockchain engine.

use std::collections::HashMap;

use thunderbolt_chain::block;
use thunderbolt_chain::transaction;
use thunderbolt_chain::transparent::Utxo;

use super::{address_key, BlockMetadata, MetadataProvider, TransactionMetadata};
use crate::error::StoreError;

#[derive(Default)]
pub struct InMemoryMetadataProvider {
    block_metadata: HashMap<block::Hash, BlockMetadata>,
    transaction_metadata: HashMap<transaction::Hash, TransactionMetadata>,
    utxos: HashMap<(transaction::Hash, u32), Utxo>,
    address_index: HashMap<[u8; 20], Vec<(transaction::Hash, u32)>>,
    chain_head: Option<block::Hash>,
}

impl InMemoryMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataProvider for InMemoryMetadataProvider {
    fn get_block_metadata(&self, id: &block::Hash) -> Result<Option<BlockMetadata>, StoreError> {
        Ok(self.block_metadata.get(id).cloned())
    }

    fn put_block_metadata(&mut self, id: &block::Hash, metadata: &BlockMetadata) -> Result<(), StoreError> {
        self.block_metadata.insert(*id, metadata.clone());
        Ok(())
    }

    fn get_transaction_metadata(&self, id: &transaction::Hash) -> Result<Option<TransactionMetadata>, StoreError> {
        Ok(self.transaction_metadata.get(id).copied())
    }

    fn put_transaction_metadata(
        &mut self,
        id: &transaction::Hash,
        metadata: &TransactionMetadata,
    ) -> Result<(), StoreError> {
        self.transaction_metadata.insert(*id, *metadata);
        Ok(())
    }

    fn remove_transaction_metadata(&mut self, id: &transaction::Hash) -> Result<(), StoreError> {
        self.transaction_metadata.remove(id);
        Ok(())
    }

    fn get_unspent_output(&self, tx_id: &transaction::Hash, index: u32) -> Result<Option<Utxo>, StoreError> {
        Ok(self.utxos.get(&(*tx_id, index)).cloned())
    }

    fn add_unspent_output(&mut self, tx_id: &transaction::Hash, index: u32, utxo: &Utxo) -> Result<(), StoreError> {
        self.utxos.insert((*tx_id, index), utxo.clone());
        if let Some(pubkey_hash) = address_key(utxo) {
            self.address_index.entry(pubkey_hash).or_default().push((*tx_id, index));
        }
        Ok(())
    }

    fn remove_unspent_output(&mut self, tx_id: &transaction::Hash, index: u32) -> Result<(), StoreError> {
        if let Some(utxo) = self.utxos.remove(&(*tx_id, index)) {
            if let Some(pubkey_hash) = address_key(&utxo) {
                if let Some(entries) = self.address_index.get_mut(&pubkey_hash) {
                    entries.retain(|entry| *entry != (*tx_id, index));
                }
            }
        }
        Ok(())
    }

    fn get_unspent_outputs_for_address(
        &self,
        pubkey_hash: &[u8; 20],
    ) -> Result<Vec<(transaction::Hash, u32)>, StoreError> {
        Ok(self.address_index.get(pubkey_hash).cloned().unwrap_or_default())
    }

    fn get_chain_head(&self) -> Result<Option<block::Hash>, StoreError> {
        Ok(self.chain_head)
    }

    fn set_chain_head(&mut self, id: &block::Hash) -> Result<(), StoreError> {
        self.chain_head = Some(*id);
        Ok(())
    }
}
