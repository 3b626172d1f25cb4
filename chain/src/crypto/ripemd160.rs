//! RIPEMD-160, used only for the SHA256(pubkey)-then-RIPEMD160 address hash.

use ripemd160::{Digest, Ripemd160};

pub fn digest(bytes: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(bytes);
    hasher.finalize().into()
}
