use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_recursion::async_recursion;
use async_stream::try_stream;
use async_trait::async_trait;
use committee_storage::db_object::{DBObject, Fact};
use committee_storage::hash::{Digest, HashFunction, HASH_BYTES};
use committee_storage::storage_trait::{DbKeyPrefix, DbValue, Storage};
use committee_storage::{HashError, StorageError, StorageResult};
use futures::stream::Stream;
use futures::try_join;

use crate::{MerkleError, MerkleResult, MAX_HEIGHT};

#[cfg(test)]
#[path = "merkle_tree_test.rs"]
mod merkle_tree_test;

/// An internal tree node: the concatenated digests of its two children, keyed by their hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleNodeFact {
    pub left_node: Digest,
    pub right_node: Digest,
}

impl DBObject for MerkleNodeFact {
    fn serialize(&self) -> DbValue {
        DbValue([self.left_node.0, self.right_node.0].concat())
    }

    fn deserialize(value: &DbValue) -> StorageResult<Self> {
        if value.0.len() != 2 * HASH_BYTES {
            return Err(StorageError::MalformedValue(format!(
                "a Merkle node holds exactly {} bytes, got {}",
                2 * HASH_BYTES,
                value.0.len()
            )));
        }
        let (left, right) = value.0.split_at(HASH_BYTES);
        Ok(Self {
            left_node: Digest(left.try_into().expect("Length was checked above")),
            right_node: Digest(right.try_into().expect("Length was checked above")),
        })
    }

    fn prefix() -> DbKeyPrefix {
        DbKeyPrefix("merkle_node")
    }
}

#[async_trait]
impl Fact for MerkleNodeFact {
    async fn hash(&self, hasher: &dyn HashFunction) -> StorageResult<Digest> {
        Ok(hasher.hash(&self.left_node, &self.right_node).await?)
    }
}

/// An immutable Merkle tree backed by an immutable fact storage.
///
/// A tree is just `(root, height)` plus handles to the storage and hash function: cloning is
/// cheap, and distinct trees over the same storage share every common subtree by digest.
#[derive(Clone)]
pub struct MerkleTree {
    root: Digest,
    height: usize,
    storage: Arc<dyn Storage>,
    hasher: Arc<dyn HashFunction>,
}

impl std::fmt::Debug for MerkleTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MerkleTree")
            .field("root", &self.root)
            .field("height", &self.height)
            .finish()
    }
}

impl MerkleTree {
    pub fn new(
        root: Digest,
        height: usize,
        storage: Arc<dyn Storage>,
        hasher: Arc<dyn HashFunction>,
    ) -> MerkleResult<Self> {
        if height > MAX_HEIGHT {
            return Err(MerkleError::HeightOutOfRange(height));
        }
        Ok(Self { root, height, storage, hasher })
    }

    pub fn root(&self) -> Digest {
        self.root
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Builds the tree of the given height whose every leaf is `empty_leaf`, writing the leaf
    /// and the node of each level to the storage.
    pub async fn empty_tree(
        height: usize,
        storage: Arc<dyn Storage>,
        hasher: Arc<dyn HashFunction>,
        empty_leaf: &impl Fact,
    ) -> MerkleResult<Self> {
        if height > MAX_HEIGHT {
            return Err(MerkleError::HeightOutOfRange(height));
        }
        let root = empty_leaf.set_fact(storage.as_ref(), hasher.as_ref()).await?;
        let mut tree = Self { root, height: 0, storage, hasher };
        for _ in 0..height {
            tree = Self::combine(&tree, &tree).await?;
        }
        Ok(tree)
    }

    /// Writes the node combining the two subtrees and returns the tree rooted at it.
    pub async fn combine(left: &MerkleTree, right: &MerkleTree) -> MerkleResult<MerkleTree> {
        debug_assert_eq!(left.height, right.height);
        let node = MerkleNodeFact { left_node: left.root, right_node: right.root };
        let root = node.set_fact(left.storage.as_ref(), left.hasher.as_ref()).await?;
        Ok(MerkleTree {
            root,
            height: left.height + 1,
            storage: left.storage.clone(),
            hasher: left.hasher.clone(),
        })
    }

    /// The roots of the all-empty trees of heights `0..=max_height`. Pure: nothing is written.
    pub async fn empty_tree_roots(
        max_height: usize,
        empty_leaf: &impl Fact,
        hasher: &dyn HashFunction,
    ) -> MerkleResult<Vec<Digest>> {
        let mut roots = vec![empty_leaf.hash(hasher).await?];
        for _ in 0..max_height {
            let top = roots.last().expect("The list starts non-empty");
            roots.push(hasher.hash(top, top).await?);
        }
        Ok(roots)
    }

    /// The two subtrees of this tree. Must not be called on a leaf.
    pub async fn get_children(&self) -> MerkleResult<(MerkleTree, MerkleTree)> {
        debug_assert!(self.height > 0, "A leaf has no children");
        let node = MerkleNodeFact::get_fact(self.storage.as_ref(), &self.root)
            .await?
            .ok_or(MerkleError::MissingNode(self.root))?;
        let subtree = |root| MerkleTree {
            root,
            height: self.height - 1,
            storage: self.storage.clone(),
            hasher: self.hasher.clone(),
        };
        Ok((subtree(node.left_node), subtree(node.right_node)))
    }

    /// Applies the modifications, writes all new facts, and returns the tree rooted at the new
    /// root. Repeated indices resolve last-wins; the old tree remains valid and untouched
    /// subtrees keep their digests.
    pub async fn update<L: Fact + 'static>(
        &self,
        modifications: Vec<(u64, L)>,
    ) -> MerkleResult<MerkleTree> {
        self.check_indices(modifications.iter().map(|(index, _)| *index))?;
        self.update_inner(modifications).await
    }

    #[async_recursion]
    async fn update_inner<L: Fact + 'static>(
        &self,
        modifications: Vec<(u64, L)>,
    ) -> MerkleResult<MerkleTree> {
        if modifications.is_empty() {
            return Ok(self.clone());
        }
        if self.height == 0 {
            let (_, leaf) = modifications.into_iter().last().expect("Checked non-empty above");
            let root = leaf.set_fact(self.storage.as_ref(), self.hasher.as_ref()).await?;
            return Ok(MerkleTree {
                root,
                height: 0,
                storage: self.storage.clone(),
                hasher: self.hasher.clone(),
            });
        }

        let (left, right) = self.get_children().await?;
        let (left_modifications, right_modifications) = split_by_subtree(modifications, self.height);
        let (new_left, new_right) = if left_modifications.is_empty() {
            (left, right.update_inner(right_modifications).await?)
        } else if right_modifications.is_empty() {
            (left.update_inner(left_modifications).await?, right)
        } else {
            try_join!(
                left.update_inner(left_modifications),
                right.update_inner(right_modifications)
            )?
        };
        Self::combine(&new_left, &new_right).await
    }

    /// The leaves at the given indices, read along the necessary paths only.
    pub async fn get_leaves<L: Fact + 'static>(
        &self,
        indices: &[u64],
    ) -> MerkleResult<HashMap<u64, L>> {
        self.check_indices(indices.iter().copied())?;
        self.get_leaves_inner(indices.to_vec()).await
    }

    #[async_recursion]
    async fn get_leaves_inner<L: Fact + 'static>(
        &self,
        indices: Vec<u64>,
    ) -> MerkleResult<HashMap<u64, L>> {
        if indices.is_empty() {
            return Ok(HashMap::new());
        }
        if self.height == 0 {
            let leaf = L::get_fact(self.storage.as_ref(), &self.root)
                .await?
                .ok_or(MerkleError::MissingLeaf(self.root))?;
            return Ok(HashMap::from([(0, leaf)]));
        }

        let (left, right) = self.get_children().await?;
        let mid = 1_u64 << (self.height - 1);
        let left_indices: Vec<u64> = indices.iter().copied().filter(|index| *index < mid).collect();
        let right_indices: Vec<u64> =
            indices.iter().copied().filter(|index| *index >= mid).map(|index| index - mid).collect();

        let (left_leaves, mut right_leaves) = try_join!(
            left.get_leaves_inner(left_indices),
            right.get_leaves_inner(right_indices)
        )?;
        let mut leaves = left_leaves;
        leaves.extend(right_leaves.drain().map(|(index, leaf)| (index + mid, leaf)));
        Ok(leaves)
    }

    /// The sibling digests along the path from the given leaf to the root, ordered from the
    /// leaf's sibling up to the root's child sibling.
    pub async fn get_authentication_path(&self, index: u64) -> MerkleResult<Vec<Digest>> {
        self.check_indices(std::iter::once(index))?;
        self.authentication_path_inner(index).await
    }

    #[async_recursion]
    async fn authentication_path_inner(&self, index: u64) -> MerkleResult<Vec<Digest>> {
        if self.height == 0 {
            return Ok(vec![]);
        }
        let (left, right) = self.get_children().await?;
        let mid = 1_u64 << (self.height - 1);
        let (descend_into, index, sibling) =
            if index >= mid { (right, index - mid, left.root) } else { (left, index, right.root) };
        let mut path = descend_into.authentication_path_inner(index).await?;
        path.push(sibling);
        Ok(path)
    }

    /// Iterates the tree in DFS preorder, yielding `(index, subtree)` with 1-based
    /// binary-tree-in-array indices (children of `n` are `2n` and `2n + 1`). A subtree whose
    /// root is in `exclude_set` is yielded but not descended, which short-circuits the shared
    /// empty subtrees.
    pub fn dfs(
        &self,
        exclude_set: HashSet<Digest>,
    ) -> impl Stream<Item = MerkleResult<(u64, MerkleTree)>> {
        let tree = self.clone();
        try_stream! {
            let mut stack = vec![(1_u64, tree)];
            while let Some((index, subtree)) = stack.pop() {
                if subtree.height > 0 && !exclude_set.contains(&subtree.root) {
                    let (left, right) = subtree.get_children().await?;
                    stack.push((2 * index + 1, right));
                    stack.push((2 * index, left));
                }
                yield (index, subtree);
            }
        }
    }

    fn check_indices(&self, indices: impl Iterator<Item = u64>) -> MerkleResult<()> {
        let num_leaves = 1_u128 << self.height;
        for index in indices {
            if u128::from(index) >= num_leaves {
                return Err(MerkleError::IndexOutOfRange { index, height: self.height });
            }
        }
        Ok(())
    }
}

/// Partitions modifications by the top-level bit of their index, rebasing the right half.
/// Relative order is preserved so last-wins survives the split.
fn split_by_subtree<L>(modifications: Vec<(u64, L)>, height: usize) -> (Vec<(u64, L)>, Vec<(u64, L)>) {
    let mid = 1_u64 << (height - 1);
    let mut left = Vec::new();
    let mut right = Vec::new();
    for (index, leaf) in modifications {
        if index < mid {
            left.push((index, leaf));
        } else {
            right.push((index - mid, leaf));
        }
    }
    (left, right)
}

/// The root implied by a leaf value at the given index and its authentication path.
#[async_recursion]
pub async fn calc_root(
    index: u64,
    value: Digest,
    path: &[Digest],
    hasher: &dyn HashFunction,
) -> Result<Digest, HashError> {
    let Some((sibling, rest)) = path.split_last() else {
        return Ok(value);
    };
    let mid = 1_u64 << (path.len() - 1);
    if index >= mid {
        hasher.hash(sibling, &calc_root(index - mid, value, rest, hasher).await?).await
    } else {
        hasher.hash(&calc_root(index, value, rest, hasher).await?, sibling).await
    }
}

/// Verifies that `value` resides at leaf `index` of the tree rooted at `root`.
pub async fn verify_path(
    root: Digest,
    index: u64,
    value: Digest,
    path: &[Digest],
    hasher: &dyn HashFunction,
) -> Result<bool, HashError> {
    Ok(root == calc_root(index, value, path, hasher).await?)
}
