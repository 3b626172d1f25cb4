//! Minimal chain-data builders shared by the workspace's tests: a genesis
//! block, a way to extend it one block at a time, and an ephemeral
//! persistence fixture backed by a temp directory.

use std::convert::TryFrom;

use thunderbolt_chain::amount::{Amount, NonNegative};
use thunderbolt_chain::block::{Block, Header};
use thunderbolt_chain::parameters::GENESIS_PREVIOUS_BLOCK_HASH;
use thunderbolt_chain::transaction::Transaction;
use thunderbolt_chain::transparent::{Input, LockingParameters, OutPoint, Output, UnlockingParameters};
use thunderbolt_chain::work::difficulty::CompactDifficulty;
use thunderbolt_storage::metadata::memory::InMemoryMetadataProvider;
use thunderbolt_storage::PersistenceService;

/// A target so permissive that any nonce satisfies proof of work; every
/// block this module builds mines with it so tests never have to search for
/// a valid nonce.
pub const EASY_TARGET: CompactDifficulty = CompactDifficulty(0x207f_ffff);

/// A coinbase transaction paying `amount` to `pubkey_hash`. Coinbase inputs
/// carry an empty placeholder unlock — the validator never checks a
/// signature against the coinbase sentinel outpoint.
pub fn coinbase(pubkey_hash: [u8; 20], amount: i64) -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![Input {
            outpoint: OutPoint::coinbase(),
            unlocking_parameters: UnlockingParameters::SingleSig { pubkey: [0; 33], signature: Vec::new() },
            sequence: 0xffff_ffff,
        }],
        outputs: vec![Output {
            amount: Amount::<NonNegative>::try_from(amount).expect("fixture amounts stay within range"),
            locking_parameters: LockingParameters::single_sig(pubkey_hash),
        }],
        lock_time: 0,
    }
}

/// A well-formed genesis block: one coinbase transaction, `EASY_TARGET`, and
/// the sentinel parent hash `bootstrap_genesis` requires.
pub fn genesis_block(reward_to: [u8; 20], amount: i64, timestamp: u64) -> Block {
    let header = Header {
        version: 1,
        parent_hash: GENESIS_PREVIOUS_BLOCK_HASH,
        merkle_root: [0; 32],
        timestamp,
        target_difficulty: EASY_TARGET,
        nonce: 0,
    };
    Block::new(header, vec![coinbase(reward_to, amount)])
}

/// Extends `parent` with a block 600 seconds later, distinguished from
/// sibling blocks at the same height only by `nonce`. A coinbase paying
/// `coinbase_amount` to `coinbase_to` is prepended to `transactions`.
pub fn child_block(
    parent: &Block,
    nonce: u32,
    coinbase_to: [u8; 20],
    coinbase_amount: i64,
    transactions: Vec<Transaction>,
) -> Block {
    let header = Header {
        version: 1,
        parent_hash: parent.hash(),
        merkle_root: [0; 32],
        timestamp: parent.header.timestamp + 600,
        target_difficulty: EASY_TARGET,
        nonce,
    };
    let mut all = Vec::with_capacity(transactions.len() + 1);
    all.push(coinbase(coinbase_to, coinbase_amount));
    all.extend(transactions);
    Block::new(header, all)
}

/// An ephemeral, temp-directory-backed [`PersistenceService`] over
/// [`InMemoryMetadataProvider`]: real segment files, no real database,
/// cleaned up when the returned guard is dropped.
pub struct EphemeralPersistence {
    pub service: PersistenceService<InMemoryMetadataProvider>,
    _blocks_dir: tempdir::TempDir,
    _reverts_dir: tempdir::TempDir,
}

/// Opens a fresh [`EphemeralPersistence`] with no blocks yet persisted.
pub fn ephemeral_persistence() -> EphemeralPersistence {
    let blocks_dir = tempdir::TempDir::new("thunderbolt-test-blocks").expect("can create a temp directory");
    let reverts_dir = tempdir::TempDir::new("thunderbolt-test-reverts").expect("can create a temp directory");
    let service = PersistenceService::with_metadata_provider(InMemoryMetadataProvider::new(), blocks_dir.path(), reverts_dir.path())
        .expect("an empty temp directory always opens");
    EphemeralPersistence { service, _blocks_dir: blocks_dir, _reverts_dir: reverts_dir }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_block_is_well_formed() {
        let genesis = genesis_block([1; 20], 5_000_000_000, 1_700_000_000);
        assert!(genesis.merkle_root_matches());
        assert_eq!(genesis.header.parent_hash, GENESIS_PREVIOUS_BLOCK_HASH);
    }

    #[test]
    fn child_block_extends_its_parent() {
        let genesis = genesis_block([1; 20], 5_000_000_000, 1_700_000_000);
        let next = child_block(&genesis, 0, [2; 20], 5_000_000_000, Vec::new());
        assert_eq!(next.header.parent_hash, genesis.hash());
        assert_eq!(next.header.timestamp, genesis.header.timestamp + 600);
    }

    #[test]
    fn ephemeral_persistence_starts_with_no_chain_head() {
        let fixture = ephemeral_persistence();
        assert_eq!(fixture.service.get_chain_head().unwrap(), None);
    }
}
