//! Block difficulty: the compact on-wire encoding, the expanded 256-bit
//! target it unpacks to, and the cumulative-work measure used to pick the
//! chain head.

use crate::codec::{CodecError, Decode, Encode};
use crate::parameters::Network;
use primitive_types::U256;

/// The on-wire `targetDifficulty` field: a Bitcoin-style compact ("nBits")
/// encoding of a 256-bit target. The high byte is an exponent in bytes, the
/// low three bytes are the mantissa.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompactDifficulty(pub u32);

impl Encode for CompactDifficulty {
    fn encode<W: std::io::Write>(&self, writer: W) -> std::io::Result<()> {
        self.0.encode(writer)
    }
}

impl Decode for CompactDifficulty {
    fn decode<R: std::io::Read>(reader: R) -> Result<Self, CodecError> {
        Ok(CompactDifficulty(u32::decode(reader)?))
    }
}

/// A fully expanded 256-bit target: a header's SHA-256 digest must be
/// numerically less than or equal to this value to be valid proof of work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExpandedDifficulty(pub U256);

impl CompactDifficulty {
    /// Unpacks the compact encoding into a 256-bit target. Returns `None` for
    /// encodings that would overflow or underflow a u256 (the negative-bit
    /// and zero-mantissa cases Bitcoin also treats as invalid).
    pub fn to_expanded(self) -> Option<ExpandedDifficulty> {
        let bits = self.0;
        let exponent = (bits >> 24) as u32;
        let mantissa = bits & 0x007f_ffff;
        let is_negative = bits & 0x0080_0000 != 0;

        if mantissa == 0 || is_negative {
            return None;
        }

        let target = if exponent <= 3 {
            U256::from(mantissa) >> (8 * (3 - exponent))
        } else {
            if exponent > 32 {
                return None;
            }
            U256::from(mantissa) << (8 * (exponent - 3))
        };

        Some(ExpandedDifficulty(target))
    }

    /// Packs a 256-bit target into its canonical compact encoding.
    pub fn from_expanded(target: ExpandedDifficulty) -> CompactDifficulty {
        let mut bytes = [0u8; 32];
        target.0.to_big_endian(&mut bytes);

        let first_nonzero = bytes.iter().position(|&b| b != 0);
        let first_nonzero = match first_nonzero {
            Some(index) => index,
            None => return CompactDifficulty(0),
        };

        let significant = &bytes[first_nonzero..];
        let mut exponent = (32 - first_nonzero) as u32;
        let mut mantissa_bytes = [0u8; 3];

        if significant[0] & 0x80 != 0 {
            // The mantissa's high bit would be mistaken for the sign bit;
            // shift right by a byte and compensate the exponent.
            mantissa_bytes[1..3].copy_from_slice(&significant[..2.min(significant.len())]);
            exponent += 1;
        } else {
            let take = significant.len().min(3);
            mantissa_bytes[..take].copy_from_slice(&significant[..take]);
        }

        let mantissa = u32::from_be_bytes([0, mantissa_bytes[0], mantissa_bytes[1], mantissa_bytes[2]]);
        CompactDifficulty((exponent << 24) | mantissa)
    }
}

impl ExpandedDifficulty {
    /// The loosest target any block may have: the network's proof-of-work
    /// limit.
    pub fn target_difficulty_limit(network: Network) -> ExpandedDifficulty {
        match network {
            Network::Mainnet => ExpandedDifficulty(U256::MAX >> 32),
            Network::Testnet => ExpandedDifficulty(U256::MAX >> 16),
        }
    }

    /// The amount of work represented by a block with this target:
    /// `floor(2^256 / (target + 1))`. Smaller targets (harder blocks)
    /// produce larger work values.
    pub fn work(self) -> U256 {
        let target_plus_one = self.0.saturating_add(U256::one());
        if target_plus_one.is_zero() {
            return U256::MAX;
        }
        // U256 has no native 2^256, so derive floor(2^256 / d) from
        // floor((2^256 - 1) / d): writing max = q*d + r, 2^256 = max + 1, so
        // (max + 1) / d is q unless r == d - 1, in which case the extra 1
        // carries the quotient up by one.
        let max = U256::MAX;
        let quotient = max / target_plus_one;
        let remainder = max % target_plus_one;
        if remainder == target_plus_one - U256::one() {
            quotient.saturating_add(U256::one())
        } else {
            quotient
        }
    }
}

/// How many blocks make up one retargeting window.
pub const RETARGET_INTERVAL: u32 = 2016;

/// The target spacing the retarget window aims to maintain, in seconds
/// (10 minutes per block, the Bitcoin convention).
pub const TARGET_SPACING_SECONDS: u64 = 600;

/// The ideal duration of one retarget window.
pub const TARGET_TIMESPAN_SECONDS: u64 = RETARGET_INTERVAL as u64 * TARGET_SPACING_SECONDS;

/// Recomputes the target for the block that follows `window_start_time` and
/// `window_end_time` (the timestamps of the first and last blocks of the
/// just-completed 2016-block window), clamped to a quarter or quadruple of
/// the previous target.
pub fn retarget(
    previous: ExpandedDifficulty,
    window_start_time: u64,
    window_end_time: u64,
    network: Network,
) -> ExpandedDifficulty {
    let actual_timespan = window_end_time.saturating_sub(window_start_time);
    let clamped_timespan = actual_timespan
        .max(TARGET_TIMESPAN_SECONDS / 4)
        .min(TARGET_TIMESPAN_SECONDS * 4);

    let new_target = (previous.0 / U256::from(TARGET_TIMESPAN_SECONDS))
        .saturating_mul(U256::from(clamped_timespan));

    let limit = ExpandedDifficulty::target_difficulty_limit(network);
    ExpandedDifficulty(new_target.min(limit.0))
}
