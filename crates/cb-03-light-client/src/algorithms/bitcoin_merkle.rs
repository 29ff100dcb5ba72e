//! # Bitcoin Merkle Proof Verification
//!
//! SPV inclusion proof against a header's merkle root.
//!
//! # Algorithm
//!
//! 0. The leaf bytes must decode as a transaction
//! 1. Start with the txid: `double_sha256(tx_bytes)`
//! 2. For each sibling, leaf level first:
//!    - index even: hash = double_sha256(current || sibling)
//!    - index odd: hash = double_sha256(sibling || current)
//!    - index = index / 2
//! 3. The final hash must equal the merkle root
//!
//! # Time Complexity: O(log n)

use shared_types::Hash;

use super::bitcoin_tx::decode_bitcoin_tx;
use super::headers::double_sha256;

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left);
    buf[32..].copy_from_slice(right);
    double_sha256(&buf)
}

/// Fold a sibling path from `leaf` at `index` up to a root.
pub fn fold_merkle_path(leaf: &Hash, path: &[Hash], index: u64) -> Hash {
    let mut current = *leaf;
    let mut index = index;
    for sibling in path {
        current = if index % 2 == 0 {
            hash_pair(&current, sibling)
        } else {
            hash_pair(sibling, &current)
        };
        index /= 2;
    }
    current
}

/// Verify that `tx_bytes` sits at `index` under `merkle_root`.
///
/// An index with bits left over after the path is consumed points outside
/// the tree and fails, as do leaf bytes that are not a transaction.
pub fn verify_bitcoin_proof(merkle_root: &Hash, tx_bytes: &[u8], path: &[Hash], index: u64) -> bool {
    if path.len() < 64 && index >> path.len() != 0 {
        return false;
    }
    if decode_bitcoin_tx(tx_bytes).is_err() {
        return false;
    }
    fold_merkle_path(&double_sha256(tx_bytes), path, index) == *merkle_root
}

/// Merkle root over txids (last node duplicated on odd levels).
pub fn compute_merkle_root(txids: &[Hash]) -> Hash {
    if txids.is_empty() {
        return [0u8; 32];
    }

    let mut level: Vec<Hash> = txids.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|chunk| hash_pair(&chunk[0], chunk.get(1).unwrap_or(&chunk[0])))
            .collect();
    }
    level[0]
}

/// Sibling path for the txid at `index`, or `None` if out of range.
pub fn build_merkle_path(txids: &[Hash], index: usize) -> Option<Vec<Hash>> {
    if index >= txids.len() {
        return None;
    }

    let mut path = Vec::new();
    let mut level: Vec<Hash> = txids.to_vec();
    let mut index = index;
    while level.len() > 1 {
        let sibling = if index % 2 == 0 {
            *level.get(index + 1).unwrap_or(&level[index])
        } else {
            level[index - 1]
        };
        path.push(sibling);
        level = level
            .chunks(2)
            .map(|chunk| hash_pair(&chunk[0], chunk.get(1).unwrap_or(&chunk[0])))
            .collect();
        index /= 2;
    }
    Some(path)
}
