//! A sparse, immutable, content-addressed binary Merkle tree of fixed height over a persistent
//! key-value fact storage. Trees are lightweight values sharing untouched subtrees by digest;
//! `update` returns a new tree and never mutates the old one.

use committee_storage::hash::Digest;
use committee_storage::{HashError, StorageError};

pub mod merkle_tree;

pub use merkle_tree::{calc_root, verify_path, MerkleNodeFact, MerkleTree};

/// Trees taller than this would overflow the 64-bit leaf and DFS index space.
pub const MAX_HEIGHT: usize = 63;

#[derive(thiserror::Error, Debug)]
pub enum MerkleError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error("Missing Merkle node {0} in storage.")]
    MissingNode(Digest),
    #[error("Missing leaf {0} in storage.")]
    MissingLeaf(Digest),
    #[error("Tree height {0} exceeds the maximum supported height of 63.")]
    HeightOutOfRange(usize),
    #[error("Leaf index {index} is out of range for a tree of height {height}.")]
    IndexOutOfRange { index: u64, height: usize },
}

pub type MerkleResult<T> = Result<T, MerkleError>;
