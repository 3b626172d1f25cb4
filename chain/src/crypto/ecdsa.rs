//! ECDSA over secp256k1, DER-encoded signatures no longer than 72 bytes.

use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, Signature};
use std::collections::HashSet;

use super::sha256;

/// The largest DER-encoded ECDSA signature this codec will accept.
pub const MAX_SIGNATURE_LEN: usize = 72;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// malformed public key
    #[error("malformed public key")]
    BadPublicKey,
    /// malformed or oversize signature
    #[error("malformed or oversize signature")]
    BadSignature,
}

/// Signs the double-SHA256 of `msg` with `secret_key`. Used by tests to
/// construct spendable transactions; production signing lives in the wallet,
/// outside this crate's scope.
pub fn sign(secret_key: &SecretKey, msg: &[u8]) -> Signature {
    let secp = Secp256k1::signing_only();
    let digest = sha256::digest_twice(msg);
    let message = Message::from_slice(&digest).expect("32-byte digest is a valid message");
    secp.sign(&message, secret_key)
}

/// Verifies a single-signature unlock: exactly one public key, one signature.
pub fn verify_single(pubkey_bytes: &[u8; 33], msg: &[u8], sig_bytes: &[u8]) -> bool {
    if sig_bytes.len() > MAX_SIGNATURE_LEN {
        return false;
    }
    let pubkey = match PublicKey::from_slice(pubkey_bytes) {
        Ok(pk) => pk,
        Err(_) => return false,
    };
    let signature = match Signature::from_der(sig_bytes) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    verify_with_key(&pubkey, msg, &signature)
}

fn verify_with_key(pubkey: &PublicKey, msg: &[u8], sig: &Signature) -> bool {
    let secp = Secp256k1::verification_only();
    let digest = sha256::digest_twice(msg);
    let message = match Message::from_slice(&digest) {
        Ok(m) => m,
        Err(_) => return false,
    };
    secp.verify(&message, sig, pubkey).is_ok()
}

/// Verifies a multi-signature unlock: accepts iff at least `required`
/// signatures in `signatures` validate, each against a distinct public key
/// at an index `< pubkeys.len()`, and no two accepted signatures are
/// credited to the same public key.
///
/// `signatures` is a sparse map from pubkey index to a DER signature, as
/// produced by [`crate::transparent::MultiSigUnlock`].
pub fn verify_multi(
    required: u8,
    pubkeys: &[[u8; 33]],
    signatures: &[(u8, Vec<u8>)],
    msg: &[u8],
) -> bool {
    let mut satisfied_indices: HashSet<u8> = HashSet::new();

    for (index, sig_bytes) in signatures {
        let index = *index;
        if satisfied_indices.contains(&index) {
            continue;
        }
        let pubkey_bytes = match pubkeys.get(index as usize) {
            Some(bytes) => bytes,
            None => continue,
        };
        if verify_single(pubkey_bytes, msg, sig_bytes) {
            satisfied_indices.insert(index);
        }
    }

    satisfied_indices.len() >= required as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::rand::rngs::OsRng;

    fn keypair() -> (SecretKey, [u8; 33]) {
        let secp = Secp256k1::new();
        let mut rng = OsRng::new().expect("OS rng available");
        let (secret_key, public_key) = secp.generate_keypair(&mut rng);
        (secret_key, public_key.serialize())
    }

    #[test]
    fn single_sig_round_trip() {
        let (secret_key, pubkey_bytes) = keypair();
        let msg = b"pay alice 5 bolts";
        let sig = sign(&secret_key, msg);
        assert!(verify_single(&pubkey_bytes, msg, &sig.serialize_der()));
    }

    #[test]
    fn single_sig_rejects_wrong_message() {
        let (secret_key, pubkey_bytes) = keypair();
        let sig = sign(&secret_key, b"pay alice 5 bolts");
        assert!(!verify_single(&pubkey_bytes, b"pay mallory 500 bolts", &sig.serialize_der()));
    }

    #[test]
    fn multi_sig_requires_threshold_distinct_signers() {
        let (sk1, pk1) = keypair();
        let (sk2, pk2) = keypair();
        let (_sk3, pk3) = keypair();
        let msg = b"2-of-3 payout";

        let sig1 = sign(&sk1, msg).serialize_der().to_vec();
        let sig2 = sign(&sk2, msg).serialize_der().to_vec();

        let pubkeys = [pk1, pk2, pk3];
        assert!(verify_multi(2, &pubkeys, &[(0, sig1.clone())], msg) == false);
        assert!(verify_multi(2, &pubkeys, &[(0, sig1), (1, sig2)], msg));
    }

    #[test]
    fn multi_sig_ignores_duplicate_index() {
        let (sk1, pk1) = keypair();
        let (_sk2, pk2) = keypair();
        let msg = b"2-of-2";
        let sig1 = sign(&sk1, msg).serialize_der().to_vec();

        let pubkeys = [pk1, pk2];
        // Same signature submitted twice under the same index never reaches threshold 2.
        assert!(!verify_multi(2, &pubkeys, &[(0, sig1.clone()), (0, sig1)], msg));
    }
}
