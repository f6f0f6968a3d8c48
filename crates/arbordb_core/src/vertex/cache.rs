//! Per-transaction vertex cache.

use super::InternalVertex;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};

/// Maps vertex ids to the transaction's single instance of each vertex.
///
/// Three layers:
/// - `volatile` pins new and modified vertices; they are never evicted
/// - `clean` holds loaded vertices up to the configured capacity
/// - `identity` weakly tracks every handed-out instance, so a vertex evicted
///   from `clean` but still held by a caller is found again
pub(crate) struct VertexCache {
    clean: LruCache<u64, Arc<InternalVertex>>,
    volatile: HashMap<u64, Arc<InternalVertex>>,
    identity: HashMap<u64, Weak<InternalVertex>>,
    prune_at: usize,
}

impl VertexCache {
    pub(crate) fn new(capacity: usize, dirty_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            clean: LruCache::new(capacity),
            volatile: HashMap::with_capacity(dirty_capacity),
            identity: HashMap::new(),
            prune_at: capacity.get().saturating_mul(2).max(64),
        }
    }

    /// Returns the live instance for `id`, if any.
    pub(crate) fn get(&mut self, id: u64) -> Option<Arc<InternalVertex>> {
        if let Some(vertex) = self.volatile.get(&id) {
            return Some(Arc::clone(vertex));
        }
        if let Some(vertex) = self.clean.get(&id) {
            return Some(Arc::clone(vertex));
        }
        let vertex = self.identity.get(&id)?.upgrade()?;
        self.clean.put(id, Arc::clone(&vertex));
        Some(vertex)
    }

    pub(crate) fn contains(&self, id: u64) -> bool {
        self.volatile.contains_key(&id)
            || self.clean.contains(&id)
            || self
                .identity
                .get(&id)
                .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Caches a vertex loaded from the backend.
    ///
    /// Returns the existing instance if another one was cached first.
    pub(crate) fn insert_loaded(&mut self, vertex: Arc<InternalVertex>) -> Arc<InternalVertex> {
        let id = vertex.id().as_u64();
        if let Some(existing) = self.get(id) {
            return existing;
        }
        self.track(id, &vertex);
        self.clean.put(id, Arc::clone(&vertex));
        vertex
    }

    /// Pins a new or modified vertex.
    pub(crate) fn insert_volatile(&mut self, vertex: Arc<InternalVertex>) {
        let id = vertex.id().as_u64();
        self.clean.pop(&id);
        self.track(id, &vertex);
        self.volatile.insert(id, vertex);
    }

    /// Moves a cached vertex to the pinned layer.
    pub(crate) fn pin(&mut self, vertex: &Arc<InternalVertex>) {
        let id = vertex.id().as_u64();
        if !self.volatile.contains_key(&id) {
            self.insert_volatile(Arc::clone(vertex));
        }
    }

    /// Moves the entry under `from` to `to` after an id assignment.
    pub(crate) fn rekey(&mut self, from: u64, to: u64) {
        if let Some(vertex) = self.volatile.remove(&from) {
            self.volatile.insert(to, vertex);
        }
        if let Some(vertex) = self.clean.pop(&from) {
            self.clean.put(to, vertex);
        }
        if let Some(weak) = self.identity.remove(&from) {
            self.identity.insert(to, weak);
        }
    }

    /// Returns all pinned vertices.
    pub(crate) fn volatile(&self) -> impl Iterator<Item = &Arc<InternalVertex>> {
        self.volatile.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.volatile.len() + self.clean.len()
    }

    fn track(&mut self, id: u64, vertex: &Arc<InternalVertex>) {
        self.identity.insert(id, Arc::downgrade(vertex));
        if self.identity.len() > self.prune_at {
            self.identity.retain(|_, weak| weak.strong_count() > 0);
            self.prune_at = self.identity.len().saturating_mul(2).max(self.prune_at);
        }
    }
}
