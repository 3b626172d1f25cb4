//! Hashing and signing primitives (spec §4.2).

pub mod ecdsa;
pub mod ripemd160;
pub mod sha256;

pub use ecdsa::{verify_multi, verify_single, CryptoError};
