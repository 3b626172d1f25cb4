//! Data model, wire codec, and cryptographic primitives for Thunderbolt: the
//! types every other crate in the workspace builds on, with no dependency
//! on storage, validation, or networking.

// Lets `thunderbolt_serde_derive`'s generated impls name this crate the same
// way a downstream crate would, so the same derive output compiles whether
// it is invoked here or in `thunderbolt-storage`.
extern crate self as thunderbolt_chain;

#[macro_use]
mod hash;

pub mod amount;
pub mod block;
pub mod codec;
pub mod crypto;
pub mod parameters;
pub mod transaction;
pub mod transparent;
pub mod work;
