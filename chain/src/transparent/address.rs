//! Pay-to-public-key-hash style addresses.
//!
//! `version byte ‖ RIPEMD160(SHA256(pubkey)) ‖ 4-byte checksum`, Base58Check
//! encoded. Thunderbolt has only one locking shape per address (no P2SH
//! redeem-script indirection — see `transparent::LockingParameters`), so
//! unlike Bitcoin there is a single address variant, distinguished only by
//! which network it targets.

use std::{fmt, str::FromStr};

use crate::{codec::CodecError, parameters::Network};

mod magic {
    pub const MAINNET: u8 = 0x00;
    pub const TESTNET: u8 = 0x6f;
}

/// A Thunderbolt address: a network tag plus a 20-byte public-key hash.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct Address {
    pub network: Network,
    pub pubkey_hash: [u8; 20],
}

impl Address {
    /// Derives the address that locks to `pubkey` (a 33-byte compressed
    /// secp256k1 public key), on `network`.
    pub fn from_pubkey(pubkey: &[u8; 33], network: Network) -> Address {
        let sha = crate::crypto::sha256::digest(&pubkey[..]);
        let pubkey_hash = crate::crypto::ripemd160::digest(&sha);
        Address { network, pubkey_hash }
    }

    fn version_byte(&self) -> u8 {
        match self.network {
            Network::Mainnet => magic::MAINNET,
            Network::Testnet => magic::TESTNET,
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Address")
            .field("network", &self.network)
            .field("pubkey_hash", &hex::encode(self.pubkey_hash))
            .finish()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut payload = Vec::with_capacity(21);
        payload.push(self.version_byte());
        payload.extend_from_slice(&self.pubkey_hash);
        f.write_str(&bs58::encode(payload).with_check().into_string())
    }
}

impl FromStr for Address {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|_| CodecError::Parse("invalid base58check address"))?;

        if bytes.len() != 21 {
            return Err(CodecError::Parse("address payload has the wrong length"));
        }

        let network = match bytes[0] {
            magic::MAINNET => Network::Mainnet,
            magic::TESTNET => Network::Testnet,
            _ => return Err(CodecError::Parse("unrecognized address version byte")),
        };

        let mut pubkey_hash = [0u8; 20];
        pubkey_hash.copy_from_slice(&bytes[1..]);
        Ok(Address { network, pubkey_hash })
    }
}
