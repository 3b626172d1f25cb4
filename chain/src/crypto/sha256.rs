//! SHA-256 with an exposed midstate, so that a miner can hash the first
//! 64-byte block of an 80-byte header once and then re-hash only the second
//! block for every candidate nonce.

use sha2::digest::generic_array::GenericArray;
use sha2::{compress256, Digest, Sha256};

/// The SHA-256 initial hash value (FIPS 180-4 §5.3.3).
const IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// Plain, one-shot SHA-256.
pub fn digest(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Double SHA-256, used wherever the spec calls for a "double-SHA256" (the
/// address checksum and the transaction signature-hash message). Block and
/// transaction identifiers use a single [`digest`] instead.
pub fn digest_twice(bytes: &[u8]) -> [u8; 32] {
    digest(&digest(bytes))
}

/// The compression-function state after processing one 64-byte block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Midstate([u32; 8]);

impl Midstate {
    /// Feeds exactly one 64-byte block into a fresh SHA-256 state and
    /// returns the resulting midstate.
    pub fn from_first_block(block: &[u8; 64]) -> Midstate {
        let mut state = IV;
        let block = GenericArray::clone_from_slice(block);
        compress256(&mut state, &[block]);
        Midstate(state)
    }

    pub fn words(&self) -> [u32; 8] {
        self.0
    }
}

/// Finishes a SHA-256 hash given a cached [`Midstate`] and the remaining
/// bytes. `tail` together with SHA-256 padding must form whole 64-byte
/// blocks; for an 80-byte header this is the final 16 bytes plus the
/// standard padding, pre-assembled by the caller into one 64-byte block.
pub fn finish_from_midstate(midstate: Midstate, final_block: &[u8; 64]) -> [u8; 32] {
    let mut state = midstate.words();
    let block = GenericArray::clone_from_slice(final_block);
    compress256(&mut state, &[block]);
    let mut out = [0u8; 32];
    for (chunk, word) in out.chunks_exact_mut(4).zip(state.iter()) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    out
}

/// Builds the second (and final) SHA-256 block for an 80-byte header: the
/// trailing 16 header bytes, the `0x80` padding byte, zero fill, and the
/// 64-bit big-endian bit length (80 bytes = 640 bits), exactly as SHA-256
/// padding requires.
pub fn header_tail_block(trailing_16_bytes: &[u8; 16]) -> [u8; 64] {
    let mut block = [0u8; 64];
    block[..16].copy_from_slice(trailing_16_bytes);
    block[16] = 0x80;
    // 80 bytes = 640 bits, encoded as a big-endian u64 in the last 8 bytes.
    block[56..64].copy_from_slice(&640u64.to_be_bytes());
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_one_shot_and_midstate_path() {
        let mut header = [0u8; 80];
        for (i, byte) in header.iter_mut().enumerate() {
            *byte = i as u8;
        }

        let direct = digest(&header);

        let mut first_block = [0u8; 64];
        first_block.copy_from_slice(&header[..64]);
        let mut trailing = [0u8; 16];
        trailing.copy_from_slice(&header[64..]);

        let midstate = Midstate::from_first_block(&first_block);
        let tail = header_tail_block(&trailing);
        let via_midstate = finish_from_midstate(midstate, &tail);

        assert_eq!(direct, via_midstate);
    }

    #[test]
    fn double_sha256_is_sha256_of_sha256() {
        let input = b"thunderbolt";
        assert_eq!(digest_twice(input), digest(&digest(input)));
    }
}
