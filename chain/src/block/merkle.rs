//! The transaction merkle tree: pairwise double-SHA256, duplicating the last
//! element of an odd-sized level (the same convention Bitcoin uses).

use crate::{codec::Encode, transaction};

/// Computes the merkle root over `transactions`, in order.
///
/// An empty transaction list has no meaningful root; this is a structural
/// precondition the caller (block validation) is expected to reject before
/// ever calling this function, so it panics rather than returning an
/// `Option` every caller would have to unwrap anyway.
pub fn merkle_root(transactions: &[transaction::Transaction]) -> [u8; 32] {
    assert!(!transactions.is_empty(), "a block always carries at least the coinbase transaction");

    let mut level: Vec<[u8; 32]> = transactions
        .iter()
        .map(|tx| *tx.hash().as_bytes())
        .collect();

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().unwrap());
        }
        level = level
            .chunks_exact(2)
            .map(|pair| {
                let mut buf = Vec::with_capacity(64);
                pair[0].encode(&mut buf).expect("writing to a Vec is infallible");
                pair[1].encode(&mut buf).expect("writing to a Vec is infallible");
                crate::crypto::sha256::digest_twice(&buf)
            })
            .collect();
    }

    level[0]
}
