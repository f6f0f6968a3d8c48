//! Per-transaction cache of index lookups.

use crate::types::VertexId;
use lru::LruCache;
use std::sync::Arc;

/// Weighted LRU cache from index entry prefixes to the vertices they hold.
///
/// Each entry weighs one plus its number of vertices. Least recently used
/// entries are dropped until the total weight fits the budget.
pub(crate) struct IndexCache {
    entries: LruCache<Vec<u8>, Arc<Vec<VertexId>>>,
    weight: usize,
    max_weight: usize,
}

impl IndexCache {
    pub(crate) fn new(max_weight: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            weight: 0,
            max_weight,
        }
    }

    pub(crate) fn get(&mut self, key: &[u8]) -> Option<Arc<Vec<VertexId>>> {
        self.entries.get(key).cloned()
    }

    pub(crate) fn insert(&mut self, key: Vec<u8>, vertices: Arc<Vec<VertexId>>) {
        let weight = Self::weigh(&vertices);
        if weight > self.max_weight {
            return;
        }
        if let Some(old) = self.entries.put(key, vertices) {
            self.weight -= Self::weigh(&old);
        }
        self.weight += weight;
        while self.weight > self.max_weight {
            match self.entries.pop_lru() {
                Some((_, evicted)) => self.weight -= Self::weigh(&evicted),
                None => break,
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn weight(&self) -> usize {
        self.weight
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn weigh(vertices: &[VertexId]) -> usize {
        vertices.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u64) -> Arc<Vec<VertexId>> {
        Arc::new((0..n).map(VertexId::new).collect())
    }

    #[test]
    fn caches_lookups() {
        let mut cache = IndexCache::new(100);
        cache.insert(b"a".to_vec(), ids(3));
        assert_eq!(cache.get(b"a").unwrap().len(), 3);
        assert_eq!(cache.weight(), 4);
    }

    #[test]
    fn evicts_least_recently_used_over_budget() {
        let mut cache = IndexCache::new(10);
        cache.insert(b"a".to_vec(), ids(4));
        cache.insert(b"b".to_vec(), ids(4));
        cache.get(b"a");
        cache.insert(b"c".to_vec(), ids(4));

        assert!(cache.get(b"a").is_some());
        assert!(cache.get(b"b").is_none());
        assert!(cache.weight() <= 10);
    }

    #[test]
    fn oversized_entries_are_not_cached() {
        let mut cache = IndexCache::new(3);
        cache.insert(b"big".to_vec(), ids(5));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.weight(), 0);
    }

    #[test]
    fn replacing_an_entry_updates_weight() {
        let mut cache = IndexCache::new(100);
        cache.insert(b"a".to_vec(), ids(5));
        cache.insert(b"a".to_vec(), ids(1));
        assert_eq!(cache.weight(), 2);
        assert_eq!(cache.len(), 1);
    }
}
