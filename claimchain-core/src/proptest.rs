//! Property-based tests for core types.
//!
//! Uses proptest to verify invariants hold for arbitrary inputs.

use proptest::prelude::*;
use serde_json::Value;

use crate::canonical::canonical_json;
use crate::crypto::{hash_pair, Hash};
use crate::merkle::{compute_root, levels, proof_path, verify_path};

// ============================================================================
// Arbitrary Implementations
// ============================================================================

/// Generate arbitrary 32-byte arrays.
fn arb_bytes32() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

/// Generate arbitrary Hash values.
fn arb_hash() -> impl Strategy<Value = Hash> {
    arb_bytes32().prop_map(Hash::from_bytes)
}

/// Generate non-empty leaf sequences.
fn arb_leaves() -> impl Strategy<Value = Vec<Hash>> {
    prop::collection::vec(arb_hash(), 1..64)
}

/// Generate arbitrary JSON values with bounded depth and width.
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[a-zA-Z0-9 _.-]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Two independent builds over the same leaves yield identical roots.
    #[test]
    fn merkle_root_deterministic(leaves in arb_leaves()) {
        let a = compute_root(&leaves).unwrap();
        let b = compute_root(&leaves).unwrap();
        prop_assert_eq!(a, b);
    }

    /// The last level of `levels` is exactly `[root]` and the first is the
    /// leaf sequence.
    #[test]
    fn merkle_levels_agree_with_root(leaves in arb_leaves()) {
        let lv = levels(&leaves).unwrap();
        let root = compute_root(&leaves).unwrap();
        prop_assert_eq!(lv.first().unwrap().as_slice(), leaves.as_slice());
        prop_assert_eq!(lv.last().unwrap().as_slice(), &[root][..]);
    }

    /// Every leaf's proof path replays to the root.
    #[test]
    fn merkle_proofs_sound(leaves in arb_leaves(), seed in any::<prop::sample::Index>()) {
        let idx = seed.index(leaves.len());
        let root = compute_root(&leaves).unwrap();
        let path = proof_path(&leaves, idx).unwrap();
        prop_assert!(verify_path(leaves[idx], &path, root));
    }

    /// A proof for one leaf does not verify a different leaf, unless the two
    /// leaves happen to be equal.
    #[test]
    fn merkle_proofs_bind_their_leaf(
        leaves in prop::collection::vec(arb_hash(), 2..32),
        seed in any::<prop::sample::Index>(),
    ) {
        let idx = seed.index(leaves.len());
        let other = (idx + 1) % leaves.len();
        prop_assume!(leaves[idx] != leaves[other]);

        let root = compute_root(&leaves).unwrap();
        let path = proof_path(&leaves, idx).unwrap();
        prop_assert!(!verify_path(leaves[other], &path, root));
    }

    /// Flipping the order of a pair flips the parent hash.
    #[test]
    fn hash_pair_not_commutative(a in arb_hash(), b in arb_hash()) {
        prop_assume!(a != b);
        prop_assert_ne!(hash_pair(a, b), hash_pair(b, a));
    }

    /// Canonicalization is idempotent: re-parsing the canonical form and
    /// canonicalizing again is a fixed point.
    #[test]
    fn canonical_json_idempotent(value in arb_json()) {
        let once = canonical_json(&value);
        let reparsed: Value = serde_json::from_str(&once).unwrap();
        prop_assert_eq!(canonical_json(&reparsed), once);
    }
}
