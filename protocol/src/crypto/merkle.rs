//! # Merkle Tree
//!
//! Binary SHA-256 Merkle tree over any sequence of [`Hashable`] items. Blocks
//! commit to their transaction list through the root of this tree.
//!
//! ## Construction
//!
//! ```text
//!             root
//!           /      \
//!       H(ab)       c        <- unpaired node promoted unchanged
//!       /   \       |
//!      a     b      c
//! ```
//!
//! Leaves are the item hashes in order. Adjacent nodes are paired left to
//! right and the parent is `SHA256(left ++ right)`. A trailing node without a
//! partner moves up a level untouched; it is never duplicated. A single leaf
//! is its own root.
//!
//! Nodes live in one flat arena and refer to their children by index, so the
//! tree is plain data with no shared ownership.

use super::hash::{sha256_pair, Hash32};

/// Anything that can be committed to by a Merkle tree.
pub trait Hashable {
    fn hash(&self) -> Hash32;
}

impl Hashable for Hash32 {
    fn hash(&self) -> Hash32 {
        *self
    }
}

#[derive(Debug, Clone)]
struct Node {
    hash: Hash32,
    left: Option<usize>,
    right: Option<usize>,
    /// Index into `items` for leaves.
    item: Option<usize>,
}

/// A Merkle tree that retains the items it was built from.
#[derive(Debug, Clone)]
pub struct MerkleTree<T> {
    items: Vec<T>,
    nodes: Vec<Node>,
    root: usize,
}

impl<T: Hashable> MerkleTree<T> {
    /// Build a tree over `items`. Returns `None` for an empty sequence, which
    /// has no meaningful root.
    pub fn new(items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }

        let mut nodes: Vec<Node> = items
            .iter()
            .enumerate()
            .map(|(i, item)| Node {
                hash: item.hash(),
                left: None,
                right: None,
                item: Some(i),
            })
            .collect();

        let mut level: Vec<usize> = (0..nodes.len()).collect();
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                match *pair {
                    [l, r] => {
                        nodes.push(Node {
                            hash: sha256_pair(&nodes[l].hash, &nodes[r].hash),
                            left: Some(l),
                            right: Some(r),
                            item: None,
                        });
                        next.push(nodes.len() - 1);
                    }
                    [only] => next.push(only),
                    _ => unreachable!("chunks(2) yields one or two elements"),
                }
            }
            level = next;
        }

        let root = level[0];
        Some(Self { items, nodes, root })
    }

    /// The root hash.
    pub fn root(&self) -> Hash32 {
        self.nodes[self.root].hash
    }

    /// Recompute every node from the bottom up and compare with what is
    /// stored. A leaf is valid when its stored hash still matches the item it
    /// was built from; an internal node when it equals `SHA256(left ++ right)`
    /// and both children are valid.
    pub fn verify(&self) -> bool {
        self.verify_node(self.root)
    }

    fn verify_node(&self, idx: usize) -> bool {
        let node = &self.nodes[idx];
        match (node.left, node.right) {
            (Some(l), Some(r)) => {
                sha256_pair(&self.nodes[l].hash, &self.nodes[r].hash) == node.hash
                    && self.verify_node(l)
                    && self.verify_node(r)
            }
            _ => match node.item {
                Some(i) => self.items[i].hash() == node.hash,
                None => false,
            },
        }
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false: empty trees can't be built.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Root of the tree over `items`, or `None` when there are none.
pub fn merkle_root<T: Hashable + Clone>(items: &[T]) -> Option<Hash32> {
    MerkleTree::new(items.to_vec()).map(|tree| tree.root())
}
