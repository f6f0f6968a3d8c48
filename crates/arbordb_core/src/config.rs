//! Graph and transaction configuration.

use crate::id::DEFAULT_ID_BLOCK_SIZE;
use crate::index::DEFAULT_INDEX_SELECTION_THRESHOLD;
use crate::schema::{DefaultSchemaMaker, SchemaMaker};
use crate::time::TimestampProvider;
use std::sync::Arc;

/// Configuration for opening a graph.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Whether clients must supply vertex ids.
    pub allow_custom_vertex_id: bool,

    /// Resolution of transaction timestamps.
    pub timestamp_provider: TimestampProvider,

    /// Policy for schema elements referenced before they are defined.
    pub auto_schema_maker: Arc<dyn SchemaMaker>,

    /// Number of clean vertices each transaction caches.
    pub vertex_cache_size: usize,

    /// Initial capacity for new and modified vertices per transaction.
    pub dirty_vertex_size: usize,

    /// Total weight of cached index lookups per transaction.
    pub index_cache_weight: usize,

    /// Candidate count up to which index selection is exhaustive.
    pub index_selection_threshold: usize,

    /// Number of ids reserved from the backend at a time.
    pub id_block_size: u64,

    /// Whether every transaction is read-only.
    pub read_only: bool,

    /// Identifier of this graph instance; generated when absent.
    pub unique_instance_id: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            allow_custom_vertex_id: false,
            timestamp_provider: TimestampProvider::Micro,
            auto_schema_maker: Arc::new(DefaultSchemaMaker::new()),
            vertex_cache_size: 20_000,
            dirty_vertex_size: 32,
            index_cache_weight: 500,
            index_selection_threshold: DEFAULT_INDEX_SELECTION_THRESHOLD,
            id_block_size: DEFAULT_ID_BLOCK_SIZE,
            read_only: false,
            unique_instance_id: None,
        }
    }
}

impl GraphConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether clients must supply vertex ids.
    #[must_use]
    pub const fn allow_custom_vertex_id(mut self, value: bool) -> Self {
        self.allow_custom_vertex_id = value;
        self
    }

    /// Sets the timestamp provider.
    #[must_use]
    pub const fn timestamp_provider(mut self, provider: TimestampProvider) -> Self {
        self.timestamp_provider = provider;
        self
    }

    /// Sets the schema maker.
    #[must_use]
    pub fn auto_schema_maker(mut self, maker: impl SchemaMaker + 'static) -> Self {
        self.auto_schema_maker = Arc::new(maker);
        self
    }

    /// Sets a shared schema maker.
    #[must_use]
    pub fn shared_schema_maker(mut self, maker: Arc<dyn SchemaMaker>) -> Self {
        self.auto_schema_maker = maker;
        self
    }

    /// Sets the vertex cache size.
    #[must_use]
    pub const fn vertex_cache_size(mut self, size: usize) -> Self {
        self.vertex_cache_size = size;
        self
    }

    /// Sets the dirty vertex capacity.
    #[must_use]
    pub const fn dirty_vertex_size(mut self, size: usize) -> Self {
        self.dirty_vertex_size = size;
        self
    }

    /// Sets the index cache weight.
    #[must_use]
    pub const fn index_cache_weight(mut self, weight: usize) -> Self {
        self.index_cache_weight = weight;
        self
    }

    /// Sets the index selection threshold. Values above
    /// [`MAX_INDEX_SELECTION_THRESHOLD`](crate::MAX_INDEX_SELECTION_THRESHOLD)
    /// are clamped.
    #[must_use]
    pub const fn index_selection_threshold(mut self, threshold: usize) -> Self {
        self.index_selection_threshold = threshold;
        self
    }

    /// Sets the id block size.
    #[must_use]
    pub const fn id_block_size(mut self, size: u64) -> Self {
        self.id_block_size = size;
        self
    }

    /// Sets whether the graph is read-only.
    #[must_use]
    pub const fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    /// Sets the instance identifier.
    #[must_use]
    pub fn unique_instance_id(mut self, id: impl Into<String>) -> Self {
        self.unique_instance_id = Some(id.into());
        self
    }
}

/// Settings of one transaction, fixed when it opens.
#[derive(Debug, Clone)]
pub struct TransactionConfig {
    pub(crate) read_only: bool,
    pub(crate) single_threaded: bool,
    pub(crate) vertex_cache_size: usize,
    pub(crate) dirty_vertex_size: usize,
    pub(crate) index_cache_weight: usize,
    pub(crate) preloaded_data: bool,
    pub(crate) lazy_load_relations: bool,
    pub(crate) verify_external_vertex_existence: bool,
    pub(crate) verify_internal_vertex_existence: bool,
    pub(crate) assign_ids_immediately: bool,
    pub(crate) allow_custom_vertex_id: bool,
    pub(crate) timestamp_provider: TimestampProvider,
    pub(crate) group_name: Option<String>,
    pub(crate) commit_time: Option<u64>,
    pub(crate) auto_schema_maker: Arc<dyn SchemaMaker>,
}

impl TransactionConfig {
    /// Derives the default transaction settings of a graph.
    #[must_use]
    pub fn from_graph(graph: &GraphConfig) -> Self {
        Self {
            read_only: graph.read_only,
            single_threaded: false,
            vertex_cache_size: graph.vertex_cache_size,
            dirty_vertex_size: graph.dirty_vertex_size,
            index_cache_weight: graph.index_cache_weight,
            preloaded_data: false,
            lazy_load_relations: true,
            verify_external_vertex_existence: true,
            verify_internal_vertex_existence: false,
            assign_ids_immediately: false,
            allow_custom_vertex_id: graph.allow_custom_vertex_id,
            timestamp_provider: graph.timestamp_provider,
            group_name: None,
            commit_time: None,
            auto_schema_maker: Arc::clone(&graph.auto_schema_maker),
        }
    }

    /// Whether mutations are rejected.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether the transaction is confined to the thread that opened it.
    #[must_use]
    pub const fn is_single_threaded(&self) -> bool {
        self.single_threaded
    }

    /// Number of clean vertices cached.
    #[must_use]
    pub const fn vertex_cache_size(&self) -> usize {
        self.vertex_cache_size
    }

    /// Initial capacity for new and modified vertices.
    #[must_use]
    pub const fn dirty_vertex_size(&self) -> usize {
        self.dirty_vertex_size
    }

    /// Total weight of cached index lookups.
    #[must_use]
    pub const fn index_cache_weight(&self) -> usize {
        self.index_cache_weight
    }

    /// Whether vertex existence checks are skipped because data was
    /// preloaded.
    #[must_use]
    pub const fn has_preloaded_data(&self) -> bool {
        self.preloaded_data
    }

    /// Whether relations are read on first access rather than when the
    /// vertex is loaded.
    #[must_use]
    pub const fn lazy_load_relations(&self) -> bool {
        self.lazy_load_relations
    }

    /// Whether `get_vertex` checks the backend before returning a vertex.
    #[must_use]
    pub const fn verify_external_vertex_existence(&self) -> bool {
        self.verify_external_vertex_existence && !self.preloaded_data
    }

    /// Whether internal lookups check the backend before returning a vertex.
    #[must_use]
    pub const fn verify_internal_vertex_existence(&self) -> bool {
        self.verify_internal_vertex_existence && !self.preloaded_data
    }

    /// Whether new elements get permanent ids when created.
    #[must_use]
    pub const fn assign_ids_immediately(&self) -> bool {
        self.assign_ids_immediately
    }

    /// Whether clients must supply vertex ids.
    #[must_use]
    pub const fn allow_custom_vertex_id(&self) -> bool {
        self.allow_custom_vertex_id
    }

    /// Resolution of transaction timestamps.
    #[must_use]
    pub const fn timestamp_provider(&self) -> TimestampProvider {
        self.timestamp_provider
    }

    /// Backend diagnostics group.
    #[must_use]
    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }

    /// Fixed commit time, if any.
    #[must_use]
    pub const fn commit_time(&self) -> Option<u64> {
        self.commit_time
    }

    /// Schema maker used by this transaction.
    #[must_use]
    pub fn auto_schema_maker(&self) -> &Arc<dyn SchemaMaker> {
        &self.auto_schema_maker
    }
}
