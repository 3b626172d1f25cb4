//! Blocks: a header plus the ordered transaction list it commits to via its
//! merkle root.

pub mod header;
pub mod merkle;

pub use header::{Hash, Header, HEADER_LEN};

use crate::{
    codec::{self, CodecError, Decode, Encode},
    transaction::Transaction,
};

/// A full block: a header and the transactions it contains.
///
/// The header's `merkle_root` is a commitment to `transactions`, not a
/// field `Block` derives on the fly — `Block::new` computes and fills it in,
/// so a `Block` value in memory is always internally consistent, but
/// `Decode` trusts the wire bytes and leaves commitment checking to
/// consensus validation (a malformed root is a validation failure, not a
/// parse failure).
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Builds a block from a header template and its transactions, filling
    /// in the header's merkle root from the transaction list.
    pub fn new(mut header: Header, transactions: Vec<Transaction>) -> Block {
        header.merkle_root = merkle::merkle_root(&transactions);
        Block { header, transactions }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Whether the header's merkle root actually commits to this block's
    /// transactions.
    pub fn merkle_root_matches(&self) -> bool {
        self.header.merkle_root == merkle::merkle_root(&self.transactions)
    }

    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first()
    }

    pub fn serialized_len(&self) -> usize {
        self.encode_to_vec().len()
    }
}

impl Encode for Block {
    fn encode<W: std::io::Write>(&self, mut writer: W) -> std::io::Result<()> {
        self.header.encode(&mut writer)?;
        codec::write_list(&mut writer, &self.transactions)
    }
}

impl Decode for Block {
    fn decode<R: std::io::Read>(mut reader: R) -> Result<Self, CodecError> {
        let header = Header::decode(&mut reader)?;
        let transactions = codec::read_list(&mut reader)?;
        Ok(Block { header, transactions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::{Amount, NonNegative};
    use crate::transparent::{Input, LockingParameters, OutPoint, Output, UnlockingParameters};
    use crate::work::difficulty::CompactDifficulty;
    use std::convert::TryFrom;

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

    fn template_header() -> Header {
        Header {
            version: 1,
            parent_hash: Hash::from_bytes([0; 32]),
            merkle_root: [0; 32],
            timestamp: 1_700_000_000,
            target_difficulty: CompactDifficulty(0x207f_ffff),
            nonce: 0,
        }
    }

    #[test]
    fn new_fills_in_a_matching_merkle_root() {
        let block = Block::new(template_header(), vec![coinbase()]);
        assert!(block.merkle_root_matches());
    }

    #[test]
    fn round_trips() {
        let block = Block::new(template_header(), vec![coinbase()]);
        let bytes = block.encode_to_vec();
        assert_eq!(Block::decode(&bytes[..]).unwrap(), block);
    }

    #[test]
    fn tampered_transactions_break_the_merkle_commitment() {
        let mut block = Block::new(template_header(), vec![coinbase()]);
        block.transactions.push(coinbase());
        assert!(!block.merkle_root_matches());
    }
}
