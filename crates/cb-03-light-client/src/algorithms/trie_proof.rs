//! # Merkle-Patricia Proof Verification
//!
//! Walks an Ethereum trie proof from a known root to the value stored
//! under a key. Proof nodes are looked up by their keccak-256 hash; nodes
//! shorter than 32 bytes are embedded in their parent.
//!
//! Node shapes (RLP):
//! - empty string: empty node
//! - 2-item list: leaf or extension, path in compact (hex-prefix) encoding
//! - 17-item list: branch, 16 children plus a value slot

use std::collections::HashMap;

use rlp::{Prototype, Rlp};
use shared_types::Hash;

use super::headers::keccak256;

const HASHED_LENGTH: usize = 32;
const BRANCH_VALUE_SLOT: usize = 16;

/// Why a proof could not be walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrieProofError {
    /// A referenced node is not in the proof.
    MissingNode(Hash),
    /// A node is not valid RLP or has an unknown shape.
    InvalidNode(String),
}

impl std::fmt::Display for TrieProofError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrieProofError::MissingNode(hash) => write!(f, "missing trie node {}", hex::encode(hash)),
            TrieProofError::InvalidNode(reason) => write!(f, "invalid trie node: {reason}"),
        }
    }
}

impl From<rlp::DecoderError> for TrieProofError {
    fn from(err: rlp::DecoderError) -> Self {
        TrieProofError::InvalidNode(err.to_string())
    }
}

enum NodeRef {
    Hash(Hash),
    Inline(Vec<u8>),
}

/// Split bytes into nibbles, high nibble first.
pub fn key_nibbles(key: &[u8]) -> Vec<u8> {
    key.iter().flat_map(|b| [b >> 4, b & 0x0f]).collect()
}

/// Decode a compact (hex-prefix) path. Returns the nibbles and whether the
/// node is a leaf.
pub fn from_compact(compact: &[u8]) -> Result<(Vec<u8>, bool), TrieProofError> {
    let first = *compact
        .first()
        .ok_or_else(|| TrieProofError::InvalidNode("empty compact path".to_string()))?;
    let flag = first >> 4;
    if flag > 3 {
        return Err(TrieProofError::InvalidNode(format!("compact flag {flag}")));
    }

    let is_leaf = flag & 2 != 0;
    let mut nibbles = Vec::with_capacity(compact.len() * 2);
    if flag & 1 != 0 {
        nibbles.push(first & 0x0f);
    }
    nibbles.extend(key_nibbles(&compact[1..]));
    Ok((nibbles, is_leaf))
}

fn child_ref(item: &Rlp<'_>) -> Result<Option<NodeRef>, TrieProofError> {
    if item.is_list() {
        return Ok(Some(NodeRef::Inline(item.as_raw().to_vec())));
    }
    let data = item.data()?;
    match data.len() {
        0 => Ok(None),
        HASHED_LENGTH => {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(data);
            Ok(Some(NodeRef::Hash(hash)))
        }
        n => Err(TrieProofError::InvalidNode(format!("child reference of {n} bytes"))),
    }
}

/// Look up `key` in the trie rooted at `root` using only the proof nodes.
///
/// Returns `Ok(None)` when the proof shows the key is absent or diverges
/// from the key's path.
pub fn verify_trie_proof(
    root: &Hash,
    key: &[u8],
    proof: &[Vec<u8>],
) -> Result<Option<Vec<u8>>, TrieProofError> {
    let nodes: HashMap<Hash, &[u8]> = proof
        .iter()
        .map(|node| (keccak256(node), node.as_slice()))
        .collect();

    let path = key_nibbles(key);
    let mut position = 0;
    let mut next = NodeRef::Hash(*root);

    loop {
        let raw = match next {
            NodeRef::Hash(hash) => nodes
                .get(&hash)
                .ok_or(TrieProofError::MissingNode(hash))?
                .to_vec(),
            NodeRef::Inline(raw) => raw,
        };
        let node = Rlp::new(&raw);
        let remaining = &path[position..];

        match node.prototype()? {
            Prototype::Data(0) => return Ok(None),
            Prototype::List(2) => {
                let (segment, is_leaf) = from_compact(node.at(0)?.data()?)?;
                if is_leaf {
                    if remaining == segment.as_slice() {
                        return Ok(Some(node.at(1)?.data()?.to_vec()));
                    }
                    return Ok(None);
                }
                if !remaining.starts_with(&segment) {
                    return Ok(None);
                }
                position += segment.len();
                match child_ref(&node.at(1)?)? {
                    Some(child) => next = child,
                    None => return Ok(None),
                }
            }
            Prototype::List(17) => {
                let Some(&nibble) = remaining.first() else {
                    let value = node.at(BRANCH_VALUE_SLOT)?;
                    if value.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(value.data()?.to_vec()));
                };
                position += 1;
                match child_ref(&node.at(usize::from(nibble))?)? {
                    Some(child) => next = child,
                    None => return Ok(None),
                }
            }
            _ => {
                return Err(TrieProofError::InvalidNode("unexpected node shape".to_string()));
            }
        }
    }
}
