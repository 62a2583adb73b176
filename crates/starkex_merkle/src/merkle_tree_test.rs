use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use committee_storage::db_object::{DBObject, Fact};
use committee_storage::deferred_storage::DeferredStorage;
use committee_storage::hash::{Digest, HashFunction};
use committee_storage::map_storage::MapStorage;
use committee_storage::storage_trait::{DbKeyPrefix, DbValue, Storage};
use committee_storage::test_utils::Sha256HashFunction;
use committee_storage::{StorageError, StorageResult};
use futures::TryStreamExt;
use pretty_assertions::assert_eq;

use super::{calc_root, verify_path, MerkleTree};
use crate::MerkleError;

#[derive(Clone, Debug, PartialEq, Eq)]
struct DummyLeaf {
    value: u64,
}

impl DummyLeaf {
    fn new(value: u64) -> Self {
        Self { value }
    }

    fn value_digest(&self) -> Digest {
        let mut bytes = [0_u8; 32];
        bytes[24..].copy_from_slice(&self.value.to_be_bytes());
        Digest(bytes)
    }
}

impl DBObject for DummyLeaf {
    fn serialize(&self) -> DbValue {
        DbValue(self.value_digest().0.to_vec())
    }

    fn deserialize(value: &DbValue) -> StorageResult<Self> {
        let bytes: [u8; 8] = value.0[24..]
            .try_into()
            .map_err(|_| StorageError::MalformedValue("expected 32 bytes".to_owned()))?;
        Ok(Self::new(u64::from_be_bytes(bytes)))
    }

    fn prefix() -> DbKeyPrefix {
        DbKeyPrefix("dummy")
    }
}

#[async_trait]
impl Fact for DummyLeaf {
    async fn hash(&self, hasher: &dyn HashFunction) -> StorageResult<Digest> {
        Ok(hasher.hash(&self.value_digest(), &Digest::default()).await?)
    }
}

fn setup() -> (Arc<dyn Storage>, Arc<dyn HashFunction>) {
    (Arc::new(MapStorage::new()), Arc::new(Sha256HashFunction))
}

fn modifications(entries: &[(u64, u64)]) -> Vec<(u64, DummyLeaf)> {
    entries.iter().map(|(index, value)| (*index, DummyLeaf::new(*value))).collect()
}

async fn all_leaves(tree: &MerkleTree) -> HashMap<u64, DummyLeaf> {
    let indices: Vec<u64> = (0..1_u64 << tree.height()).collect();
    tree.get_leaves(&indices).await.unwrap()
}

#[tokio::test]
async fn empty_tree_roots_match_materialized_empty_trees() {
    let (storage, hasher) = setup();
    let height = 5;
    let empty_leaf = DummyLeaf::new(0);

    let roots = MerkleTree::empty_tree_roots(height, &empty_leaf, hasher.as_ref()).await.unwrap();
    assert_eq!(roots.len(), height + 1);

    let empty_leaf_hash = empty_leaf.hash(hasher.as_ref()).await.unwrap();
    assert_eq!(roots[0], empty_leaf_hash);
    assert_eq!(roots[1], hasher.hash(&empty_leaf_hash, &empty_leaf_hash).await.unwrap());

    let tree =
        MerkleTree::empty_tree(height, storage, hasher.clone(), &empty_leaf).await.unwrap();
    assert_eq!(roots[height], tree.root());

    // No storage is needed to compute the pure root list.
    let leaves = all_leaves(&tree).await;
    assert!(leaves.values().all(|leaf| *leaf == empty_leaf));
}

#[tokio::test]
async fn update_changes_exactly_the_modified_leaves() {
    let (storage, hasher) = setup();
    let height = 5;
    let tree = MerkleTree::empty_tree(height, storage, hasher, &DummyLeaf::new(0)).await.unwrap();

    let mods = modifications(&[(25, 2), (8, 4), (9, 1)]);
    let updated = tree.update(mods.clone()).await.unwrap();
    assert_ne!(updated.root(), tree.root());

    let mut expected: HashMap<u64, DummyLeaf> =
        (0..1 << height).map(|index| (index, DummyLeaf::new(0))).collect();
    for (index, leaf) in mods {
        expected.insert(index, leaf);
    }
    assert_eq!(all_leaves(&updated).await, expected);
    // The original tree is immutable and still fully readable.
    assert!(all_leaves(&tree).await.values().all(|leaf| *leaf == DummyLeaf::new(0)));
}

#[tokio::test]
async fn update_is_order_independent_and_last_wins() {
    let (storage, hasher) = setup();
    let tree = MerkleTree::empty_tree(5, storage, hasher, &DummyLeaf::new(0)).await.unwrap();

    let forward = tree.update(modifications(&[(25, 2), (8, 4), (9, 1)])).await.unwrap();
    let shuffled = tree.update(modifications(&[(9, 1), (25, 2), (8, 4)])).await.unwrap();
    assert_eq!(forward.root(), shuffled.root());

    let duplicated = tree.update(modifications(&[(5, 7), (25, 2), (8, 4), (9, 1), (5, 9)])).await.unwrap();
    let deduplicated = tree.update(modifications(&[(25, 2), (8, 4), (9, 1), (5, 9)])).await.unwrap();
    assert_eq!(duplicated.root(), deduplicated.root());

    let unchanged = tree.update(modifications(&[])).await.unwrap();
    assert_eq!(unchanged.root(), tree.root());
}

#[tokio::test]
async fn authentication_path_round_trip() {
    let (storage, hasher) = setup();
    let tree = MerkleTree::empty_tree(5, storage, hasher.clone(), &DummyLeaf::new(0)).await.unwrap();
    let updated = tree.update(modifications(&[(25, 2), (8, 4), (9, 1)])).await.unwrap();

    let index = 25;
    let leaf = DummyLeaf::new(2);
    let leaf_hash = leaf.hash(hasher.as_ref()).await.unwrap();
    let path = updated.get_authentication_path(index).await.unwrap();
    assert_eq!(path.len(), 5);

    assert!(verify_path(updated.root(), index, leaf_hash, &path, hasher.as_ref()).await.unwrap());

    // Wrong value, wrong index, and a stale root are all rejected.
    let wrong_hash = DummyLeaf::new(3).hash(hasher.as_ref()).await.unwrap();
    assert!(!verify_path(updated.root(), index, wrong_hash, &path, hasher.as_ref()).await.unwrap());
    assert!(!verify_path(updated.root(), index + 1, leaf_hash, &path, hasher.as_ref()).await.unwrap());
    assert!(!verify_path(tree.root(), index, leaf_hash, &path, hasher.as_ref()).await.unwrap());
}

#[tokio::test]
async fn dfs_skips_excluded_subtrees() {
    let (storage, hasher) = setup();
    let empty_leaf = DummyLeaf::new(0);
    let tree =
        MerkleTree::empty_tree(2, storage, hasher.clone(), &empty_leaf).await.unwrap();
    let updated = tree.update(modifications(&[(3, 4)])).await.unwrap();

    let empty_roots =
        MerkleTree::empty_tree_roots(updated.height(), &empty_leaf, hasher.as_ref()).await.unwrap();
    let visited: Vec<(u64, Digest)> = updated
        .dfs(empty_roots.iter().copied().collect())
        .map_ok(|(index, subtree)| (index, subtree.root()))
        .try_collect()
        .await
        .unwrap();

    let empty_leaf_hash = empty_leaf.hash(hasher.as_ref()).await.unwrap();
    let modified_leaf_hash = DummyLeaf::new(4).hash(hasher.as_ref()).await.unwrap();
    let right_node = hasher.hash(&empty_leaf_hash, &modified_leaf_hash).await.unwrap();
    let expected = vec![
        (1, updated.root()),
        (2, empty_roots[1]),
        (3, right_node),
        (6, empty_leaf_hash),
        (7, modified_leaf_hash),
    ];
    assert_eq!(visited, expected);
}

#[tokio::test]
async fn structural_sharing_across_batches() {
    let (storage, hasher) = setup();
    let height = 5;
    let genesis =
        MerkleTree::empty_tree(height, storage, hasher, &DummyLeaf::new(0)).await.unwrap();

    let batch_0 = genesis.update(modifications(&[(25, 2), (8, 4), (9, 1)])).await.unwrap();
    let batch_1 = batch_0.update(modifications(&[(8, 9), (15, 7), (23, 5)])).await.unwrap();
    let _batch_2 = batch_1.update(modifications(&[(4, 6), (16, 4), (6, 8)])).await.unwrap();
    // Fork from batch 0 again, discarding batches 1 and 2.
    let batch_3 = batch_0.update(modifications(&[(20, 3), (11, 1), (5, 8)])).await.unwrap();

    let mut expected: HashMap<u64, DummyLeaf> =
        (0..1 << height).map(|index| (index, DummyLeaf::new(0))).collect();
    for (index, value) in [(25, 2), (8, 4), (9, 1), (20, 3), (11, 1), (5, 8)] {
        expected.insert(index, DummyLeaf::new(value));
    }
    assert_eq!(all_leaves(&batch_3).await, expected);

    // The fork did not disturb the discarded chain.
    let leaves_of_1 = all_leaves(&batch_1).await;
    assert_eq!(leaves_of_1[&8], DummyLeaf::new(9));
    assert_eq!(leaves_of_1[&23], DummyLeaf::new(5));
}

#[tokio::test]
async fn update_through_a_deferred_cache() {
    let backing = Arc::new(MapStorage::new());
    let hasher: Arc<dyn HashFunction> = Arc::new(Sha256HashFunction);

    // Base tree persisted directly.
    let genesis = MerkleTree::empty_tree(3, backing.clone(), hasher.clone(), &DummyLeaf::new(0))
        .await
        .unwrap();
    let facts_before = backing.len();

    // An aborted derivation leaves no orphaned nodes behind.
    let discarded_root = {
        let deferred = Arc::new(DeferredStorage::new(backing.clone()));
        let tree = MerkleTree::new(genesis.root(), 3, deferred, hasher.clone()).unwrap();
        tree.update(modifications(&[(2, 7)])).await.unwrap().root()
    };
    assert_eq!(backing.len(), facts_before);

    // The same derivation committed is deterministic and durable.
    let deferred = Arc::new(DeferredStorage::new(backing.clone()));
    let tree =
        MerkleTree::new(genesis.root(), 3, deferred.clone(), hasher.clone()).unwrap();
    let updated = tree.update(modifications(&[(2, 7)])).await.unwrap();
    assert_eq!(updated.root(), discarded_root);
    deferred.commit().await.unwrap();
    assert!(backing.len() > facts_before);

    let durable = MerkleTree::new(updated.root(), 3, backing, hasher).unwrap();
    assert_eq!(all_leaves(&durable).await[&2], DummyLeaf::new(7));
}

#[tokio::test]
async fn out_of_range_index_is_rejected() {
    let (storage, hasher) = setup();
    let tree = MerkleTree::empty_tree(3, storage, hasher, &DummyLeaf::new(0)).await.unwrap();
    assert_matches!(
        tree.update(modifications(&[(8, 1)])).await,
        Err(MerkleError::IndexOutOfRange { index: 8, height: 3 })
    );
    assert_matches!(
        tree.get_authentication_path(8).await,
        Err(MerkleError::IndexOutOfRange { index: 8, height: 3 })
    );
}

#[tokio::test]
async fn missing_node_is_reported() {
    let (storage, hasher) = setup();
    let dangling = MerkleTree::new(Digest([7; 32]), 2, storage, hasher).unwrap();
    assert_matches!(
        dangling.get_leaves::<DummyLeaf>(&[0]).await,
        Err(MerkleError::MissingNode(_))
    );
}

#[tokio::test]
async fn calc_root_of_an_empty_path_is_the_value() {
    let (_, hasher) = setup();
    let value = Digest([1; 32]);
    assert_eq!(calc_root(0, value, &[], hasher.as_ref()).await.unwrap(), value);
}

#[tokio::test]
async fn excessive_height_is_rejected() {
    let (storage, hasher) = setup();
    assert_matches!(
        MerkleTree::empty_tree(64, storage, hasher, &DummyLeaf::new(0)).await,
        Err(MerkleError::HeightOutOfRange(64))
    );
}
