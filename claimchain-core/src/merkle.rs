//! Merkle tree construction over entry chain hashes.
//!
//! The canonical construction, shared by checkpoint generation and
//! verification:
//!
//! 1. Zero leaves is an error (`EmptyRange`).
//! 2. A single leaf is its own root, unhashed.
//! 3. Otherwise reduce level by level: hash consecutive pairs; when a level
//!    has odd length the last node is duplicated (paired with itself).
//!
//! Duplication, not promotion, is the odd-node rule. Both sides of every
//! verification must agree on it, which is why the rule lives here and
//! nowhere else.

use crate::crypto::{hash_pair, Hash};
use crate::error::{Error, Result};
use crate::proof::{ProofNode, Side};

/// Compute the Merkle root over a leaf sequence.
pub fn compute_root(leaves: &[Hash]) -> Result<Hash> {
    if leaves.is_empty() {
        return Err(Error::EmptyRange);
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = reduce(&level);
    }
    Ok(level[0])
}

/// Compute every level of the tree: `levels[0]` is the leaves, the last
/// level is `[root]`.
pub fn levels(leaves: &[Hash]) -> Result<Vec<Vec<Hash>>> {
    if leaves.is_empty() {
        return Err(Error::EmptyRange);
    }

    let mut all = vec![leaves.to_vec()];
    while all.last().expect("at least one level").len() > 1 {
        let next = reduce(all.last().expect("at least one level"));
        all.push(next);
    }
    Ok(all)
}

/// Build the sibling path for the leaf at `index`, leaf level first.
///
/// When the leaf (or an ancestor) is the duplicated last node of an odd
/// level, its recorded sibling is itself, sitting on the right.
pub fn proof_path(leaves: &[Hash], index: usize) -> Result<Vec<ProofNode>> {
    if index >= leaves.len() {
        return Err(Error::invalid_input(format!(
            "leaf index {index} out of range for {} leaves",
            leaves.len()
        )));
    }

    let mut path = Vec::new();
    let mut level = leaves.to_vec();
    let mut idx = index;

    while level.len() > 1 {
        if idx % 2 == 0 {
            let sibling = if idx + 1 < level.len() {
                level[idx + 1]
            } else {
                level[idx]
            };
            path.push(ProofNode::new(sibling, Side::Right));
        } else {
            path.push(ProofNode::new(level[idx - 1], Side::Left));
        }

        level = reduce(&level);
        idx /= 2;
    }

    Ok(path)
}

/// Replay a sibling path from a leaf and compare against a root.
pub fn verify_path(leaf: Hash, path: &[ProofNode], root: Hash) -> bool {
    let mut current = leaf;
    for node in path {
        current = node.apply(current);
    }
    current == root
}

fn reduce(level: &[Hash]) -> Vec<Hash> {
    let mut next = Vec::with_capacity(level.len().div_ceil(2));
    for pair in level.chunks(2) {
        match pair {
            [left, right] => next.push(hash_pair(*left, *right)),
            [last] => next.push(hash_pair(*last, *last)),
            _ => unreachable!("chunks(2) yields one or two items"),
        }
    }
    next
}
