//! Transactions: ordered lists of inputs and outputs, identified by the
//! SHA-256 of their serialization.

use crate::{
    codec::{self, CodecError, Decode, Encode},
    transparent::{Input, Output},
};

crate::define_hash!(Hash, "A transaction's identifier: the SHA-256 of its serialization.");

/// A Thunderbolt transaction.
///
/// `inputs` is empty only for the coinbase transaction's... no — a coinbase
/// transaction still carries exactly one input (the coinbase sentinel
/// `OutPoint`), so `inputs` is never empty for a structurally valid
/// transaction; `Transaction::is_coinbase` checks that single-input shape.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub lock_time: u32,
}

impl Transaction {
    /// A coinbase transaction has exactly one input, and that input spends
    /// the coinbase sentinel outpoint.
    pub fn is_coinbase(&self) -> bool {
        matches!(self.inputs.as_slice(), [single] if single.is_coinbase())
    }

    /// This transaction's identifying hash: the SHA-256 of its canonical
    /// serialization.
    pub fn hash(&self) -> Hash {
        Hash::from_bytes(crate::crypto::sha256::digest(&self.encode_to_vec()))
    }

    /// The serialized size of this transaction, in bytes.
    pub fn serialized_len(&self) -> usize {
        self.encode_to_vec().len()
    }
}

impl Encode for Transaction {
    fn encode<W: std::io::Write>(&self, mut writer: W) -> std::io::Result<()> {
        self.version.encode(&mut writer)?;
        codec::write_list(&mut writer, &self.inputs)?;
        codec::write_list(&mut writer, &self.outputs)?;
        self.lock_time.encode(&mut writer)
    }
}

impl Decode for Transaction {
    fn decode<R: std::io::Read>(mut reader: R) -> Result<Self, CodecError> {
        let version = u32::decode(&mut reader)?;
        let inputs = codec::read_list(&mut reader)?;
        let outputs = codec::read_list(&mut reader)?;
        let lock_time = u32::decode(&mut reader)?;
        Ok(Transaction { version, inputs, outputs, lock_time })
    }
}
