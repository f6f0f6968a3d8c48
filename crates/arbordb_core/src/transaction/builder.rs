//! Per-transaction settings.

use super::handle::GraphTransaction;
use crate::config::TransactionConfig;
use crate::error::CoreResult;
use crate::graph::GraphContext;
use crate::schema::{RelationTypeResolver, SchemaMaker};
use std::fmt;
use std::sync::Arc;

/// Configures and opens a [`GraphTransaction`].
///
/// Starts from the graph's defaults. Every setting is fixed once the
/// transaction opens.
///
/// ```rust
/// use arbordb_core::Graph;
///
/// let graph = Graph::open_in_memory().unwrap();
/// let tx = graph
///     .build_transaction()
///     .read_only(true)
///     .vertex_cache_size(100)
///     .start()
///     .unwrap();
/// assert!(tx.is_read_only());
/// tx.rollback().unwrap();
/// ```
pub struct TransactionBuilder {
    graph: Arc<dyn GraphContext>,
    config: TransactionConfig,
    resolver: Option<Arc<dyn RelationTypeResolver>>,
}

impl TransactionBuilder {
    /// Creates a builder with the defaults of `graph`.
    #[must_use]
    pub fn new(graph: Arc<dyn GraphContext>) -> Self {
        let config = TransactionConfig::from_graph(graph.configuration());
        Self {
            graph,
            config,
            resolver: None,
        }
    }

    /// Rejects mutations. A read-only graph forces this on.
    #[must_use]
    pub fn read_only(mut self, value: bool) -> Self {
        self.config.read_only = value || self.graph.configuration().read_only;
        self
    }

    /// Confines the transaction to the opening thread.
    #[must_use]
    pub fn single_threaded(mut self, value: bool) -> Self {
        self.config.single_threaded = value;
        self
    }

    /// Sets the number of clean vertices cached.
    #[must_use]
    pub fn vertex_cache_size(mut self, size: usize) -> Self {
        self.config.vertex_cache_size = size;
        self
    }

    /// Sets the initial capacity for new and modified vertices.
    #[must_use]
    pub fn dirty_vertex_size(mut self, size: usize) -> Self {
        self.config.dirty_vertex_size = size;
        self
    }

    /// Sets the total weight of cached index lookups.
    #[must_use]
    pub fn index_cache_weight(mut self, weight: usize) -> Self {
        self.config.index_cache_weight = weight;
        self
    }

    /// Declares that the data was bulk loaded, which disables vertex
    /// existence checks.
    #[must_use]
    pub fn preloaded_data(mut self, value: bool) -> Self {
        self.config.preloaded_data = value;
        self
    }

    /// Reads relations on first access instead of on vertex load.
    #[must_use]
    pub fn lazy_load_relations(mut self, value: bool) -> Self {
        self.config.lazy_load_relations = value;
        self
    }

    /// Whether `get_vertex` checks that the vertex exists.
    #[must_use]
    pub fn check_external_vertex_existence(mut self, value: bool) -> Self {
        self.config.verify_external_vertex_existence = value;
        self
    }

    /// Whether internal vertex lookups check that the vertex exists.
    #[must_use]
    pub fn check_internal_vertex_existence(mut self, value: bool) -> Self {
        self.config.verify_internal_vertex_existence = value;
        self
    }

    /// Assigns permanent ids on creation instead of at commit.
    #[must_use]
    pub fn assign_ids_immediately(mut self, value: bool) -> Self {
        self.config.assign_ids_immediately = value;
        self
    }

    /// Tags the backend transaction for diagnostics.
    #[must_use]
    pub fn group_name(mut self, name: impl Into<String>) -> Self {
        self.config.group_name = Some(name.into());
        self
    }

    /// Fixes the commit time handed to the backend.
    #[must_use]
    pub fn commit_time(mut self, time: u64) -> Self {
        self.config.commit_time = Some(time);
        self
    }

    /// Overrides the graph's schema maker.
    #[must_use]
    pub fn schema_maker(mut self, maker: Arc<dyn SchemaMaker>) -> Self {
        self.config.auto_schema_maker = maker;
        self
    }

    /// Resolves relation types through `resolver` instead of the graph's
    /// committed schema.
    #[must_use]
    pub fn relation_type_resolver(mut self, resolver: Arc<dyn RelationTypeResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// The settings built so far.
    #[must_use]
    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Opens the transaction.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::CoreError::GraphClosed`] if the graph is closed,
    /// or with the backend's error if it cannot begin a transaction.
    pub fn start(self) -> CoreResult<GraphTransaction> {
        GraphTransaction::open(self.graph, self.config, self.resolver)
    }
}

impl fmt::Debug for TransactionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionBuilder")
            .field("config", &self.config)
            .field("custom_resolver", &self.resolver.is_some())
            .finish()
    }
}
