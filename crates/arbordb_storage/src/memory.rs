//! In-memory store manager for testing.

use crate::backend::{StoreFeatures, StoreManager, StoreTransaction, StoreTxConfig};
use crate::error::{StorageError, StorageResult};
use crate::mutation::{KeyValue, Mutation};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

type StoreMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// Pending writes of one store: `None` marks a deletion.
type PendingMap = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

#[derive(Debug, Default)]
struct Shared {
    stores: RwLock<HashMap<String, StoreMap>>,
    closed: AtomicBool,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

/// An in-memory, transactional store manager.
///
/// This backend keeps every store in a sorted map and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral graphs that don't need persistence
///
/// Cloning the manager shares the underlying data, which makes it possible
/// to reopen a graph over the same contents.
///
/// # Example
///
/// ```rust
/// use arbordb_storage::{InMemoryStoreManager, Mutation, StoreManager, StoreTxConfig};
///
/// let manager = InMemoryStoreManager::new();
/// let mut tx = manager.begin_transaction(&StoreTxConfig::default()).unwrap();
/// tx.mutate("s", Mutation::put(b"a".to_vec(), b"1".to_vec())).unwrap();
/// tx.commit().unwrap();
/// assert_eq!(manager.key_count("s"), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStoreManager {
    shared: Arc<Shared>,
}

impl InMemoryStoreManager {
    /// Creates a new empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of committed keys in `store`.
    #[must_use]
    pub fn key_count(&self, store: &str) -> usize {
        self.shared
            .stores
            .read()
            .get(store)
            .map_or(0, BTreeMap::len)
    }

    /// Returns a copy of all committed entries of `store`.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn dump(&self, store: &str) -> Vec<KeyValue> {
        self.shared
            .stores
            .read()
            .get(store)
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Returns the number of committed backend transactions.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.shared.commits.load(Ordering::Relaxed)
    }

    /// Returns the number of rolled back backend transactions.
    #[must_use]
    pub fn rollback_count(&self) -> u64 {
        self.shared.rollbacks.load(Ordering::Relaxed)
    }
}

impl StoreManager for InMemoryStoreManager {
    fn begin_transaction(
        &self,
        config: &StoreTxConfig,
    ) -> StorageResult<Box<dyn StoreTransaction>> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        trace!(group = ?config.group_name, "begin in-memory backend transaction");
        Ok(Box::new(InMemoryTransaction {
            shared: Arc::clone(&self.shared),
            pending: HashMap::new(),
            finished: false,
        }))
    }

    fn features(&self) -> StoreFeatures {
        StoreFeatures {
            transactional: true,
            persistent: false,
            ordered_scan: true,
        }
    }

    fn name(&self) -> &str {
        "inmemory"
    }

    fn close(&self) -> StorageResult<()> {
        self.shared.closed.store(true, Ordering::Release);
        Ok(())
    }
}

struct InMemoryTransaction {
    shared: Arc<Shared>,
    pending: HashMap<String, PendingMap>,
    finished: bool,
}

impl InMemoryTransaction {
    fn ensure_active(&self) -> StorageResult<()> {
        if self.finished {
            return Err(StorageError::TransactionFinished);
        }
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl StoreTransaction for InMemoryTransaction {
    fn get(&mut self, store: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.ensure_active()?;

        if let Some(entry) = self.pending.get(store).and_then(|p| p.get(key)) {
            return Ok(entry.clone());
        }

        let stores = self.shared.stores.read();
        Ok(stores.get(store).and_then(|map| map.get(key).cloned()))
    }

    fn scan_prefix(&mut self, store: &str, prefix: &[u8]) -> StorageResult<Vec<KeyValue>> {
        self.ensure_active()?;

        let mut merged: StoreMap = {
            let stores = self.shared.stores.read();
            match stores.get(store) {
                Some(map) => map
                    .range(prefix.to_vec()..)
                    .take_while(|(k, _)| k.starts_with(prefix))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                None => BTreeMap::new(),
            }
        };

        // Overlay our own buffered writes
        if let Some(pending) = self.pending.get(store) {
            for (key, entry) in pending
                .range(prefix.to_vec()..)
                .take_while(|(k, _)| k.starts_with(prefix))
            {
                match entry {
                    Some(value) => {
                        merged.insert(key.clone(), value.clone());
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
        }

        Ok(merged.into_iter().collect())
    }

    fn mutate(&mut self, store: &str, mutation: Mutation) -> StorageResult<()> {
        self.ensure_active()?;

        let pending = self.pending.entry(store.to_string()).or_default();
        let (additions, deletions) = mutation.into_parts();
        for key in deletions {
            pending.insert(key, None);
        }
        for (key, value) in additions {
            pending.insert(key, Some(value));
        }
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.ensure_active()?;

        let pending = std::mem::take(&mut self.pending);
        {
            let mut stores = self.shared.stores.write();
            for (name, writes) in pending {
                let map = stores.entry(name).or_default();
                for (key, entry) in writes {
                    match entry {
                        Some(value) => {
                            map.insert(key, value);
                        }
                        None => {
                            map.remove(&key);
                        }
                    }
                }
            }
        }

        self.finished = true;
        self.shared.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        if self.finished {
            return Err(StorageError::TransactionFinished);
        }
        self.pending.clear();
        self.finished = true;
        self.shared.rollbacks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn begin(manager: &InMemoryStoreManager) -> Box<dyn StoreTransaction> {
        manager.begin_transaction(&StoreTxConfig::default()).unwrap()
    }

    #[test]
    fn reads_own_writes() {
        let manager = InMemoryStoreManager::new();
        let mut tx = begin(&manager);

        tx.mutate("s", Mutation::put(b"k".to_vec(), b"v".to_vec()))
            .unwrap();

        assert_eq!(tx.get("s", b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(manager.key_count("s"), 0);
    }

    #[test]
    fn commit_applies_writes() {
        let manager = InMemoryStoreManager::new();
        let mut tx = begin(&manager);
        tx.mutate("s", Mutation::put(b"k".to_vec(), b"v".to_vec()))
            .unwrap();
        tx.commit().unwrap();

        let mut reader = begin(&manager);
        assert_eq!(reader.get("s", b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(manager.commit_count(), 1);
    }

    #[test]
    fn rollback_discards_writes() {
        let manager = InMemoryStoreManager::new();
        let mut tx = begin(&manager);
        tx.mutate("s", Mutation::put(b"k".to_vec(), b"v".to_vec()))
            .unwrap();
        tx.rollback().unwrap();

        assert_eq!(manager.key_count("s"), 0);
        assert_eq!(manager.rollback_count(), 1);
    }

    #[test]
    fn finished_transaction_rejects_calls() {
        let manager = InMemoryStoreManager::new();
        let mut tx = begin(&manager);
        tx.commit().unwrap();

        assert_eq!(tx.get("s", b"k"), Err(StorageError::TransactionFinished));
        assert_eq!(tx.commit(), Err(StorageError::TransactionFinished));
        assert_eq!(tx.rollback(), Err(StorageError::TransactionFinished));
    }

    #[test]
    fn delete_then_add_keeps_addition() {
        let manager = InMemoryStoreManager::new();
        let mut tx = begin(&manager);
        let mut m = Mutation::delete(b"k".to_vec());
        m.add(b"k".to_vec(), b"new".to_vec());
        tx.mutate("s", m).unwrap();

        assert_eq!(tx.get("s", b"k").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn scan_prefix_merges_pending() {
        let manager = InMemoryStoreManager::new();
        {
            let mut tx = begin(&manager);
            let mut m = Mutation::new();
            m.add(b"a1".to_vec(), b"1".to_vec());
            m.add(b"a2".to_vec(), b"2".to_vec());
            m.add(b"b1".to_vec(), b"3".to_vec());
            tx.mutate("s", m).unwrap();
            tx.commit().unwrap();
        }

        let mut tx = begin(&manager);
        let mut m = Mutation::delete(b"a1".to_vec());
        m.add(b"a3".to_vec(), b"4".to_vec());
        tx.mutate("s", m).unwrap();

        let keys: Vec<_> = tx
            .scan_prefix("s", b"a")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"a2".to_vec(), b"a3".to_vec()]);
    }

    #[test]
    fn empty_prefix_scans_everything() {
        let manager = InMemoryStoreManager::new();
        let mut tx = begin(&manager);
        let mut m = Mutation::new();
        m.add(vec![0], vec![]);
        m.add(vec![255], vec![]);
        tx.mutate("s", m).unwrap();
        assert_eq!(tx.scan_prefix("s", &[]).unwrap().len(), 2);
    }

    #[test]
    fn closed_manager_refuses_transactions() {
        let manager = InMemoryStoreManager::new();
        manager.close().unwrap();
        assert!(matches!(
            manager.begin_transaction(&StoreTxConfig::default()),
            Err(StorageError::Closed)
        ));
    }

    #[test]
    fn clones_share_data() {
        let manager = InMemoryStoreManager::new();
        let other = manager.clone();
        let mut tx = begin(&manager);
        tx.mutate("s", Mutation::put(b"k".to_vec(), vec![])).unwrap();
        tx.commit().unwrap();
        assert_eq!(other.key_count("s"), 1);
    }

    proptest::proptest! {
        #[test]
        fn scan_prefix_returns_exactly_matching_keys(
            keys in proptest::collection::btree_set(proptest::collection::vec(0u8..4, 0..4), 0..32),
            prefix in proptest::collection::vec(0u8..4, 0..3),
        ) {
            let manager = InMemoryStoreManager::new();
            let mut tx = begin(&manager);
            for key in &keys {
                tx.mutate("s", Mutation::put(key.clone(), vec![])).unwrap();
            }
            tx.commit().unwrap();

            let mut tx = begin(&manager);
            let found: Vec<Vec<u8>> = tx
                .scan_prefix("s", &prefix)
                .unwrap()
                .into_iter()
                .map(|(key, _)| key)
                .collect();
            let expected: Vec<Vec<u8>> = keys
                .iter()
                .filter(|key| key.starts_with(&prefix))
                .cloned()
                .collect();
            proptest::prop_assert_eq!(found, expected);
        }
    }
}
