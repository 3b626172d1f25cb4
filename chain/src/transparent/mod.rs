//! The transparent (non-shielded) value-transfer model: outpoints, inputs,
//! outputs, and the locking/unlocking parameter shapes that gate them.

pub mod address;

pub use address::Address;

use std::io::{self, Read, Write};

use crate::{
    amount::{Amount, NonNegative},
    codec::{self, CodecError, Decode, Encode},
    transaction,
};

/// A reference to one output of a previous transaction.
///
/// The coinbase sentinel is `prev_tx_id` all-zero with `output_index ==
/// u32::MAX`; `Input::is_coinbase` checks exactly this, rather than a
/// separate coinbase variant, so coinbase inputs serialize through the same
/// path as ordinary ones.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct OutPoint {
    pub prev_tx_id: transaction::Hash,
    pub output_index: u32,
}

impl OutPoint {
    /// The sentinel outpoint a coinbase input's `OutPoint` always carries.
    pub fn coinbase() -> OutPoint {
        OutPoint {
            prev_tx_id: transaction::Hash::from_bytes([0; 32]),
            output_index: u32::MAX,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        *self == OutPoint::coinbase()
    }
}

impl Encode for OutPoint {
    fn encode<W: Write>(&self, mut writer: W) -> io::Result<()> {
        self.prev_tx_id.encode(&mut writer)?;
        self.output_index.encode(&mut writer)
    }
}

impl Decode for OutPoint {
    fn decode<R: Read>(mut reader: R) -> Result<Self, CodecError> {
        Ok(OutPoint {
            prev_tx_id: transaction::Hash::decode(&mut reader)?,
            output_index: u32::decode(&mut reader)?,
        })
    }
}

/// What an output requires in order to be spent.
///
/// A tagged union rather than a derive-generated one: the derive macros in
/// `thunderbolt-serde-derive` only cover plain structs, so enum wire layouts
/// are hand-written, matching how the teacher handles its own `Address` and
/// `Script` variants.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub enum LockingParameters {
    /// Spendable by a single keypair, identified by its pubkey hash.
    SingleSig { pubkey_hash: [u8; 20] },
    /// Spendable by any `required`-of-`pubkeys.len()` threshold of signers.
    MultiSig { required: u8, pubkeys: Vec<[u8; 33]> },
}

const TAG_SINGLE_SIG: u8 = 0x00;
const TAG_MULTI_SIG: u8 = 0x01;

impl LockingParameters {
    pub fn single_sig(pubkey_hash: [u8; 20]) -> LockingParameters {
        LockingParameters::SingleSig { pubkey_hash }
    }

    /// Builds a multisig locking script, rejecting `required == 0`,
    /// `required` greater than the number of signers, or more than 255
    /// signers (the wire format's `total` field is one byte).
    pub fn multi_sig(required: u8, pubkeys: Vec<[u8; 33]>) -> Result<LockingParameters, CodecError> {
        if required == 0 || (required as usize) > pubkeys.len() {
            return Err(CodecError::Parse("multisig threshold out of range"));
        }
        if pubkeys.len() > u8::MAX as usize {
            return Err(CodecError::Parse("multisig has too many signers"));
        }
        Ok(LockingParameters::MultiSig { required, pubkeys })
    }
}

impl Encode for LockingParameters {
    fn encode<W: Write>(&self, mut writer: W) -> io::Result<()> {
        match self {
            LockingParameters::SingleSig { pubkey_hash } => {
                TAG_SINGLE_SIG.encode(&mut writer)?;
                pubkey_hash.encode(&mut writer)
            }
            LockingParameters::MultiSig { required, pubkeys } => {
                TAG_MULTI_SIG.encode(&mut writer)?;
                required.encode(&mut writer)?;
                (pubkeys.len() as u8).encode(&mut writer)?;
                for pubkey in pubkeys {
                    pubkey.encode(&mut writer)?;
                }
                Ok(())
            }
        }
    }
}

impl Decode for LockingParameters {
    fn decode<R: Read>(mut reader: R) -> Result<Self, CodecError> {
        match u8::decode(&mut reader)? {
            TAG_SINGLE_SIG => Ok(LockingParameters::SingleSig {
                pubkey_hash: <[u8; 20]>::decode(&mut reader)?,
            }),
            TAG_MULTI_SIG => {
                let required = u8::decode(&mut reader)?;
                let total = u8::decode(&mut reader)? as usize;
                let pubkeys = codec::read_exact_count(&mut reader, total)?;
                Ok(LockingParameters::MultiSig { required, pubkeys })
            }
            _ => Err(CodecError::Parse("unrecognized locking parameters tag")),
        }
    }
}

/// The proof an input supplies to satisfy an output's `LockingParameters`.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub enum UnlockingParameters {
    SingleSig {
        pubkey: [u8; 33],
        signature: Vec<u8>,
    },
    /// One DER signature per signer, tagged with that signer's index into
    /// the referenced output's `MultiSig::pubkeys`, in the sparse
    /// (index, signature) shape `crypto::ecdsa::verify_multi` expects.
    MultiSig(MultiSigUnlock),
}

/// The signature list a `MultiSig` unlock carries. Built up one signature at
/// a time via [`MultiSigUnlock::add_signature`] (or decoded whole from the
/// wire) — there is no constructor that takes a ready-made signature list,
/// since nothing would then enforce that each signature was actually placed
/// by a call to `add_signature`.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct MultiSigUnlock {
    signatures: Vec<(u8, Vec<u8>)>,
}

impl MultiSigUnlock {
    pub fn new() -> MultiSigUnlock {
        MultiSigUnlock::default()
    }

    /// Appends `signature`, made by the signer at `index` into the
    /// referenced output's `MultiSig::pubkeys`.
    pub fn add_signature(mut self, index: u8, signature: Vec<u8>) -> MultiSigUnlock {
        self.signatures.push((index, signature));
        self
    }

    pub fn signatures(&self) -> &[(u8, Vec<u8>)] {
        &self.signatures
    }
}

impl Encode for UnlockingParameters {
    fn encode<W: Write>(&self, mut writer: W) -> io::Result<()> {
        match self {
            UnlockingParameters::SingleSig { pubkey, signature } => {
                TAG_SINGLE_SIG.encode(&mut writer)?;
                pubkey.encode(&mut writer)?;
                codec::write_u8_prefixed(&mut writer, signature)
            }
            UnlockingParameters::MultiSig(unlock) => {
                TAG_MULTI_SIG.encode(&mut writer)?;
                writer.write_all(&(unlock.signatures.len() as u32).to_be_bytes())?;
                for (index, signature) in &unlock.signatures {
                    index.encode(&mut writer)?;
                    codec::write_u8_prefixed(&mut writer, signature)?;
                }
                Ok(())
            }
        }
    }
}

impl Decode for UnlockingParameters {
    fn decode<R: Read>(mut reader: R) -> Result<Self, CodecError> {
        match u8::decode(&mut reader)? {
            TAG_SINGLE_SIG => {
                let pubkey = <[u8; 33]>::decode(&mut reader)?;
                let signature = codec::read_u8_prefixed(&mut reader)?;
                if signature.len() > crate::crypto::ecdsa::MAX_SIGNATURE_LEN {
                    return Err(CodecError::TooLong(signature.len(), crate::crypto::ecdsa::MAX_SIGNATURE_LEN));
                }
                Ok(UnlockingParameters::SingleSig { pubkey, signature })
            }
            TAG_MULTI_SIG => {
                let mut count_bytes = [0u8; 4];
                reader.read_exact(&mut count_bytes)?;
                let count = u32::from_be_bytes(count_bytes) as usize;
                let mut signatures = Vec::with_capacity(std::cmp::min(count, 1 << 12));
                for _ in 0..count {
                    let index = u8::decode(&mut reader)?;
                    let signature = codec::read_u8_prefixed(&mut reader)?;
                    if signature.len() > crate::crypto::ecdsa::MAX_SIGNATURE_LEN {
                        return Err(CodecError::TooLong(signature.len(), crate::crypto::ecdsa::MAX_SIGNATURE_LEN));
                    }
                    signatures.push((index, signature));
                }
                Ok(UnlockingParameters::MultiSig(MultiSigUnlock { signatures }))
            }
            _ => Err(CodecError::Parse("unrecognized unlocking parameters tag")),
        }
    }
}

/// An input: a spend of a previous output, plus the proof that authorizes it.
#[derive(Clone, Eq, PartialEq, Debug, thunderbolt_serde_derive::Encode, thunderbolt_serde_derive::Decode)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct Input {
    pub outpoint: OutPoint,
    pub unlocking_parameters: UnlockingParameters,
    pub sequence: u32,
}

impl Input {
    pub fn is_coinbase(&self) -> bool {
        self.outpoint.is_coinbase()
    }
}

/// An output: a value and the conditions that must be met to spend it.
#[derive(Clone, Eq, PartialEq, Debug, thunderbolt_serde_derive::Encode, thunderbolt_serde_derive::Decode)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct Output {
    pub amount: Amount<NonNegative>,
    pub locking_parameters: LockingParameters,
}

/// An unspent transaction output, as tracked by the UTXO set: an
/// [`Output`] plus the chain context (which block created it, and whether
/// that block's first transaction was the coinbase) that coinbase-maturity
/// and spend-validation checks need.
///
/// Keyed externally by `(txId, index)` — this type does not carry its own
/// outpoint, matching how the teacher's finalized state keys its
/// `utxo_by_outpoint` tree by the outpoint rather than embedding it in the
/// stored value.
#[derive(Clone, Eq, PartialEq, Debug, thunderbolt_serde_derive::Encode, thunderbolt_serde_derive::Decode)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct Utxo {
    pub output: Output,
    pub height: u32,
    pub is_coinbase: bool,
}

impl Utxo {
    /// Whether this UTXO may be spent by a transaction confirming at
    /// `spend_height`, given `coinbase_maturity` (spec §4.6 rule 4).
    pub fn is_spendable_at(&self, spend_height: u32, coinbase_maturity: u32) -> bool {
        if !self.is_coinbase {
            return true;
        }
        spend_height.saturating_sub(self.height) >= coinbase_maturity
    }
}
