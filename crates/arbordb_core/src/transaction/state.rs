//! State owned by an open transaction.

use crate::config::TransactionConfig;
use crate::id::TemporaryIds;
use crate::index::IndexCache;
use crate::relation::{Relation, RelationCache};
use crate::schema::{SchemaCache, VertexLabel, DEFAULT_VERTEX_LABEL};
use crate::types::{RelationId, SchemaId};
use crate::vertex::{InternalVertex, VertexCache};
use arbordb_storage::{KeyValue, StoreTransaction};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Everything a transaction releases when it closes.
///
/// Dropping the state drops the backend handle and every cache, which is
/// why lookups on a closed transaction find nothing.
pub(crate) struct OpenState {
    pub(crate) backend: Box<dyn StoreTransaction>,
    pub(crate) schema: SchemaCache,
    pub(crate) vertices: VertexCache,
    pub(crate) index_cache: IndexCache,
    /// Adjacency rows per loaded vertex id.
    pub(crate) rows: LruCache<u64, Arc<Vec<KeyValue>>>,
    /// Loaded properties and edges by relation id.
    pub(crate) relations: RelationCache,
    pub(crate) temporary_ids: TemporaryIds,
    pub(crate) default_label: Arc<VertexLabel>,
    /// Vertices created here and not removed again.
    pub(crate) new_vertices: Vec<Arc<InternalVertex>>,
    /// Loaded vertices removed here.
    pub(crate) removed_vertices: Vec<Arc<InternalVertex>>,
    /// Relations created here, in creation order.
    pub(crate) added: Vec<Relation>,
    /// Loaded relations removed here.
    pub(crate) deleted: HashMap<RelationId, Relation>,
}

impl OpenState {
    pub(crate) fn new(backend: Box<dyn StoreTransaction>, config: &TransactionConfig) -> Self {
        let rows = NonZeroUsize::new(config.vertex_cache_size()).unwrap_or(NonZeroUsize::MIN);
        Self {
            backend,
            schema: SchemaCache::new(),
            vertices: VertexCache::new(config.vertex_cache_size(), config.dirty_vertex_size()),
            index_cache: IndexCache::new(config.index_cache_weight()),
            rows: LruCache::new(rows),
            relations: RelationCache::new(),
            temporary_ids: TemporaryIds::new(),
            default_label: Arc::new(VertexLabel {
                id: SchemaId::new(0),
                name: DEFAULT_VERTEX_LABEL.to_string(),
            }),
            new_vertices: Vec::new(),
            removed_vertices: Vec::new(),
            added: Vec::new(),
            deleted: HashMap::new(),
        }
    }

    /// Returns true if commit has anything to write.
    pub(crate) fn has_modifications(&self) -> bool {
        !self.new_vertices.is_empty()
            || !self.removed_vertices.is_empty()
            || !self.added.is_empty()
            || !self.deleted.is_empty()
            || !self.schema.created_types().is_empty()
            || !self.schema.created_labels().is_empty()
    }

    /// Relations created here that touch `vertex`.
    pub(crate) fn added_incident(&self, vertex: &Arc<InternalVertex>) -> Vec<Relation> {
        self.added
            .iter()
            .filter(|relation| relation.is_incident(vertex))
            .cloned()
            .collect()
    }
}
