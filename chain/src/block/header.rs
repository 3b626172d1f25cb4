//! The fixed 80-byte block header.

use std::io::{self, Read, Write};

use crate::{
    codec::{CodecError, Decode, Encode},
    work::difficulty::CompactDifficulty,
};

crate::define_hash!(Hash, "A block's identifier: the SHA-256 of its 80-byte header.");

/// A block header.
///
/// `timestamp` is a `u64` in this struct so call sites never have to reason
/// about wraparound, but the wire format truncates it to `u32` seconds
/// (Bitcoin's convention, valid until the year 2106): 4 (version) + 32
/// (parent hash) + 32 (merkle root) + 4 (timestamp) + 4 (target) + 4 (nonce)
/// is exactly 80 bytes.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct Header {
    pub version: u32,
    pub parent_hash: Hash,
    pub merkle_root: [u8; 32],
    pub timestamp: u64,
    pub target_difficulty: CompactDifficulty,
    pub nonce: u32,
}

/// The serialized size of a header: the proof-of-work search operates on
/// exactly this many bytes.
pub const HEADER_LEN: usize = 80;

impl Header {
    /// This header's identifying hash: the SHA-256 of its 80-byte
    /// serialization.
    pub fn hash(&self) -> Hash {
        Hash::from_bytes(crate::crypto::sha256::digest(&self.encode_to_vec()))
    }

    /// The first 64-byte SHA-256 block of this header's serialization, used
    /// to compute a midstate a miner can reuse across nonce attempts.
    pub fn first_block(&self) -> [u8; 64] {
        let bytes = self.encode_to_vec();
        let mut block = [0u8; 64];
        block.copy_from_slice(&bytes[..64]);
        block
    }

    /// The trailing 16 bytes of this header's serialization (target
    /// difficulty and nonce), the only bytes a miner needs to vary per
    /// attempt once the midstate over `first_block` is cached.
    pub fn trailing_16_bytes(&self) -> [u8; 16] {
        let bytes = self.encode_to_vec();
        let mut trailing = [0u8; 16];
        trailing.copy_from_slice(&bytes[64..]);
        trailing
    }
}

impl Encode for Header {
    fn encode<W: Write>(&self, mut writer: W) -> io::Result<()> {
        self.version.encode(&mut writer)?;
        self.parent_hash.encode(&mut writer)?;
        self.merkle_root.encode(&mut writer)?;
        (self.timestamp as u32).encode(&mut writer)?;
        self.target_difficulty.encode(&mut writer)?;
        self.nonce.encode(&mut writer)
    }
}

impl Decode for Header {
    fn decode<R: Read>(mut reader: R) -> Result<Self, CodecError> {
        let version = u32::decode(&mut reader)?;
        let parent_hash = Hash::decode(&mut reader)?;
        let merkle_root = <[u8; 32]>::decode(&mut reader)?;
        let timestamp = u32::decode(&mut reader)? as u64;
        let target_difficulty = CompactDifficulty::decode(&mut reader)?;
        let nonce = u32::decode(&mut reader)?;
        Ok(Header {
            version,
            parent_hash,
            merkle_root,
            timestamp,
            target_difficulty,
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            version: 1,
            parent_hash: Hash::from_bytes([0; 32]),
            merkle_root: [1; 32],
            timestamp: 1_700_000_000,
            target_difficulty: CompactDifficulty(0x207f_ffff),
            nonce: 42,
        }
    }

    #[test]
    fn serializes_to_exactly_eighty_bytes() {
        assert_eq!(sample_header().encode_to_vec().len(), HEADER_LEN);
    }

    #[test]
    fn round_trips() {
        let header = sample_header();
        let bytes = header.encode_to_vec();
        assert_eq!(Header::decode(&bytes[..]).unwrap(), header);
    }

    #[test]
    fn midstate_split_matches_direct_hash() {
        let header = sample_header();
        let direct = crate::crypto::sha256::digest(&header.encode_to_vec());

        let midstate = crate::crypto::sha256::Midstate::from_first_block(&header.first_block());
        let tail = crate::crypto::sha256::header_tail_block(&header.trailing_16_bytes());
        let via_midstate = crate::crypto::sha256::finish_from_midstate(midstate, &tail);

        assert_eq!(direct, via_midstate);
    }
}
