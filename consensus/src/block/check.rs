//! Stateless header and body checks. Functions here take everything they
//! need as arguments (the expected target, the current time) rather than
//! reaching into storage themselves — the engine resolves those from chain
//! state and calls in.

use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use thunderbolt_chain::amount::{Amount, NonNegative};
use thunderbolt_chain::block::Block;
use thunderbolt_chain::parameters::{MAX_BLOCK_SIZE, MAX_FUTURE_BLOCK_TIME_SECONDS};
use thunderbolt_chain::parameters::Network;
use thunderbolt_chain::work::difficulty::CompactDifficulty;

use crate::error::BlockError;
use crate::transaction::{validate_transaction, UtxoView};

/// Checks the header's declared target matches `expected_target`, its
/// timestamp is not unreasonably far in the future, and its hash actually
/// satisfies that target.
pub fn header_is_valid(
    block: &Block,
    expected_target: CompactDifficulty,
    now: DateTime<Utc>,
    network: Network,
) -> Result<(), BlockError> {
    if block.header.target_difficulty != expected_target {
        return Err(BlockError::WrongDifficulty);
    }

    let max_future = now.timestamp() as u64 + MAX_FUTURE_BLOCK_TIME_SECONDS;
    if block.header.timestamp > max_future {
        return Err(BlockError::TimestampTooFarInFuture);
    }

    proof_of_work_is_valid(block, network)
}

/// Checks the block hash, read as a 256-bit big-endian integer, does not
/// exceed the header's expanded target.
pub fn proof_of_work_is_valid(block: &Block, network: Network) -> Result<(), BlockError> {
    let target = block
        .header
        .target_difficulty
        .to_expanded()
        .ok_or(BlockError::WrongDifficulty)?;

    let limit = thunderbolt_chain::work::difficulty::ExpandedDifficulty::target_difficulty_limit(network);
    if target.0 > limit.0 {
        return Err(BlockError::WrongDifficulty);
    }

    let hash = primitive_types::U256::from_big_endian(&block.hash().0);
    if hash > target.0 {
        return Err(BlockError::ProofOfWorkInvalid);
    }
    Ok(())
}

/// Checks the block has transactions, its merkle root commits to them, it
/// fits the size limit, exactly the first transaction is a coinbase, and
/// every transaction individually validates — returning the block's total
/// collected fees (excluding the subsidy the coinbase claims).
pub fn body_is_valid<V: UtxoView>(
    block: &Block,
    utxos: &V,
    height: u32,
    coinbase_maturity: u32,
) -> Result<Amount<NonNegative>, BlockError> {
    if block.transactions.is_empty() {
        return Err(BlockError::NoTransactions);
    }
    if !block.merkle_root_matches() {
        return Err(BlockError::BadMerkleRoot);
    }
    let size = block.serialized_len();
    if size as u64 > MAX_BLOCK_SIZE {
        return Err(BlockError::OversizeBlock(size, MAX_BLOCK_SIZE));
    }

    // The coinbase's subsidy cap depends on the fees every other
    // transaction pays, so the non-coinbase transactions are validated
    // first and the coinbase last, even though it sits at index 0 on the
    // wire.
    let mut total_fees = Amount::<NonNegative>::zero();
    for tx in block.transactions.iter().skip(1) {
        let fee = validate_transaction(tx, utxos, height, false, Amount::zero(), coinbase_maturity)?;
        total_fees = (total_fees + fee).map_err(|_| BlockError::Transaction(crate::error::ValidationError::AmountOverflow))?;
    }

    validate_transaction(&block.transactions[0], utxos, height, true, total_fees, coinbase_maturity)?;

    Ok(total_fees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use thunderbolt_chain::block::Header;
    use thunderbolt_chain::transaction;
    use thunderbolt_chain::transparent::{Input, LockingParameters, OutPoint, Output, UnlockingParameters, Utxo};

    struct EmptyUtxoView;
    impl UtxoView for EmptyUtxoView {
        fn get_utxo(&self, _tx_id: &transaction::Hash, _index: u32) -> Result<Option<Utxo>, crate::error::ValidationError> {
            Ok(None)
        }
    }

    fn coinbase() -> thunderbolt_chain::transaction::Transaction {
        thunderbolt_chain::transaction::Transaction {
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

    fn template_header() -> Header {
        Header {
            version: 1,
            parent_hash: thunderbolt_chain::block::Hash::from_bytes([0; 32]),
            merkle_root: [0; 32],
            timestamp: 1_700_000_000,
            target_difficulty: CompactDifficulty(0x207f_ffff),
            nonce: 0,
        }
    }

    #[test]
    fn a_well_formed_genesis_block_passes_body_validation() {
        let block = Block::new(template_header(), vec![coinbase()]);
        let view = EmptyUtxoView;
        let fees = body_is_valid(&block, &view, 0, 100).unwrap();
        assert_eq!(fees.value(), 0);
    }

    #[test]
    fn a_block_with_no_transactions_is_rejected() {
        let mut header = template_header();
        header.merkle_root = thunderbolt_chain::block::merkle::merkle_root(&[]);
        let block = Block { header, transactions: vec![] };
        let view = EmptyUtxoView;
        assert!(matches!(body_is_valid(&block, &view, 0, 100), Err(BlockError::NoTransactions)));
    }

    #[test]
    fn a_tampered_merkle_root_is_rejected() {
        let mut block = Block::new(template_header(), vec![coinbase()]);
        block.header.merkle_root = [0xff; 32];
        let view = EmptyUtxoView;
        assert!(matches!(body_is_valid(&block, &view, 0, 100), Err(BlockError::BadMerkleRoot)));
    }

    #[test]
    fn a_second_coinbase_is_rejected() {
        let block = Block::new(template_header(), vec![coinbase(), coinbase()]);
        let view = EmptyUtxoView;
        assert!(matches!(
            body_is_valid(&block, &view, 0, 100),
            Err(BlockError::Transaction(crate::error::ValidationError::UnexpectedCoinbase))
        ));
    }
}
