//! The graph: shared services and the open-transaction registry.

mod admin;
mod context;
mod registry;

pub use context::{GraphContext, OpenTransaction};

use crate::config::GraphConfig;
use crate::error::{CoreError, CoreResult};
use crate::id::IdManager;
use crate::index::{IndexDefinition, IndexSelectionStrategy, ThresholdBasedIndexSelectionStrategy};
use crate::schema::{RelationType, SchemaRegistry, VertexLabel};
use crate::serialize::{
    DataSerializer, EdgeSerializer, IndexSerializer, SchemaRecordKind, SCHEMA_STORE,
};
use crate::stats::GraphStats;
use crate::transaction::{GraphTransaction, TransactionBuilder};
use crate::types::TransactionId;
use arbordb_storage::{InMemoryStoreManager, StoreManager, StoreTransaction, StoreTxConfig};
use registry::TransactionRegistry;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// State shared by a graph handle and all of its transactions.
pub(crate) struct GraphShared {
    config: GraphConfig,
    instance_id: String,
    store: Arc<dyn StoreManager>,
    data_serializer: DataSerializer,
    edge_serializer: EdgeSerializer,
    index_serializer: IndexSerializer,
    id_manager: IdManager,
    index_selector: Arc<dyn IndexSelectionStrategy>,
    schema: SchemaRegistry,
    stats: GraphStats,
    open: AtomicBool,
    next_transaction_id: AtomicU64,
    transactions: TransactionRegistry,
}

impl GraphContext for GraphShared {
    fn configuration(&self) -> &GraphConfig {
        &self.config
    }

    fn data_serializer(&self) -> &DataSerializer {
        &self.data_serializer
    }

    fn edge_serializer(&self) -> &EdgeSerializer {
        &self.edge_serializer
    }

    fn index_serializer(&self) -> &IndexSerializer {
        &self.index_serializer
    }

    fn id_manager(&self) -> &IdManager {
        &self.id_manager
    }

    fn index_selector(&self) -> &dyn IndexSelectionStrategy {
        self.index_selector.as_ref()
    }

    fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    fn stats(&self) -> &GraphStats {
        &self.stats
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn begin_backend_transaction(
        &self,
        config: &StoreTxConfig,
    ) -> CoreResult<Box<dyn StoreTransaction>> {
        if !self.is_open() {
            return Err(CoreError::GraphClosed);
        }
        Ok(self.store.begin_transaction(config)?)
    }

    fn next_transaction_id(&self) -> TransactionId {
        TransactionId::new(self.next_transaction_id.fetch_add(1, Ordering::SeqCst))
    }

    fn register_transaction(
        &self,
        id: TransactionId,
        transaction: Weak<dyn OpenTransaction>,
    ) -> CoreResult<()> {
        if !self.is_open() {
            return Err(CoreError::GraphClosed);
        }
        self.transactions.register(id, transaction);
        Ok(())
    }

    fn close_transaction(&self, id: TransactionId) {
        if !self.transactions.deregister(id) {
            warn!(transaction = %id, "closed transaction was not registered");
        }
    }
}

/// A property graph over a pluggable backend.
///
/// Cloning a `Graph` creates another handle to the same graph.
///
/// # Example
///
/// ```rust
/// use arbordb_core::Graph;
///
/// let graph = Graph::open_in_memory().unwrap();
/// graph
///     .transaction(|tx| {
///         let marko = tx.add_vertex(Some("person"))?;
///         tx.add_property(&marko, "name", "marko")?;
///         Ok(())
///     })
///     .unwrap();
/// graph.close().unwrap();
/// ```
#[derive(Clone)]
pub struct Graph {
    shared: Arc<GraphShared>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("instance_id", &self.shared.instance_id)
            .field("backend", &self.shared.store.name())
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Graph {
    /// Opens a graph over `store`, loading its persisted schema.
    pub fn open(config: GraphConfig, store: Arc<dyn StoreManager>) -> CoreResult<Self> {
        let selector = Arc::new(ThresholdBasedIndexSelectionStrategy::new(
            config.index_selection_threshold,
        ));
        Self::open_with_selector(config, store, selector)
    }

    /// Opens a graph with a custom index selection strategy.
    pub fn open_with_selector(
        config: GraphConfig,
        store: Arc<dyn StoreManager>,
        index_selector: Arc<dyn IndexSelectionStrategy>,
    ) -> CoreResult<Self> {
        let data_serializer = DataSerializer::new();
        let schema = load_schema(store.as_ref(), &data_serializer)?;
        let instance_id = config
            .unique_instance_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

        info!(
            instance = %instance_id,
            backend = store.name(),
            relation_types = schema.relation_types().len(),
            indexes = schema.indexes().len(),
            "opened graph"
        );

        let id_manager = IdManager::new(Arc::clone(&store), config.id_block_size);
        Ok(Self {
            shared: Arc::new(GraphShared {
                config,
                instance_id,
                store,
                data_serializer,
                edge_serializer: EdgeSerializer::new(),
                index_serializer: IndexSerializer::new(),
                id_manager,
                index_selector,
                schema,
                stats: GraphStats::new(),
                open: AtomicBool::new(true),
                next_transaction_id: AtomicU64::new(1),
                transactions: TransactionRegistry::new(),
            }),
        })
    }

    /// Opens an empty graph over a fresh in-memory backend.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open(GraphConfig::default(), Arc::new(InMemoryStoreManager::new()))
    }

    /// Opens a transaction with the graph's default settings.
    pub fn new_transaction(&self) -> CoreResult<GraphTransaction> {
        self.build_transaction().start()
    }

    /// Returns a builder for a transaction with custom settings.
    #[must_use]
    pub fn build_transaction(&self) -> TransactionBuilder {
        TransactionBuilder::new(self.context())
    }

    /// Runs `f` in a new transaction.
    ///
    /// Commits if `f` returns `Ok`, rolls back if it returns `Err`. A failed
    /// rollback is logged and the error from `f` is returned.
    pub fn transaction<T, F>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&GraphTransaction) -> CoreResult<T>,
    {
        let tx = self.new_transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "rollback after failed transaction body failed");
                }
                Err(err)
            }
        }
    }

    /// Returns the number of open transactions.
    #[must_use]
    pub fn open_transaction_count(&self) -> usize {
        self.shared.transactions.len()
    }

    /// Returns handles to all open transactions.
    #[must_use]
    pub fn open_transactions(&self) -> Vec<Arc<dyn OpenTransaction>> {
        self.shared.transactions.snapshot()
    }

    /// Returns true until [`Graph::close`] is called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }

    /// Closes the graph.
    ///
    /// Rolls back every open transaction, then closes the backend. New
    /// transactions fail with [`CoreError::GraphClosed`]. Closing twice is
    /// a no-op.
    pub fn close(&self) -> CoreResult<()> {
        if self
            .shared
            .open
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let open = self.shared.transactions.snapshot();
        if !open.is_empty() {
            warn!(count = open.len(), "rolling back open transactions on close");
        }
        for tx in open {
            if let Err(err) = tx.rollback_on_shutdown() {
                warn!(transaction = %tx.id(), error = %err, "rollback on shutdown failed");
            }
        }

        self.shared.store.close()?;
        info!(instance = %self.shared.instance_id, "closed graph");
        Ok(())
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GraphConfig {
        &self.shared.config
    }

    /// Returns the instance identifier.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.shared.instance_id
    }

    /// Returns the committed schema.
    #[must_use]
    pub fn schema(&self) -> &SchemaRegistry {
        &self.shared.schema
    }

    /// Returns the statistics counters.
    #[must_use]
    pub fn stats(&self) -> &GraphStats {
        &self.shared.stats
    }

    /// Returns the graph as the interface its transactions consume.
    #[must_use]
    pub fn context(&self) -> Arc<dyn GraphContext> {
        Arc::clone(&self.shared) as Arc<dyn GraphContext>
    }

    fn ensure_writable(&self) -> CoreResult<()> {
        if !self.is_open() {
            return Err(CoreError::GraphClosed);
        }
        if self.shared.config.read_only {
            return Err(CoreError::ReadOnly);
        }
        Ok(())
    }

    /// Delivers a schema change to every open transaction.
    ///
    /// Runs without holding the registry lock.
    fn broadcast_expiry(&self, id: crate::types::SchemaId) {
        let open = self.shared.transactions.snapshot();
        debug!(schema_id = %id, transactions = open.len(), "expiring schema element");
        for tx in open {
            tx.expire_schema_element(id);
            self.shared.stats.record_schema_expiration();
        }
    }
}

fn load_schema(store: &dyn StoreManager, data: &DataSerializer) -> CoreResult<SchemaRegistry> {
    let mut tx = store.begin_transaction(&StoreTxConfig::default())?;

    let result = (|| -> CoreResult<SchemaRegistry> {
        let relation_types = tx
            .scan_prefix(SCHEMA_STORE, &SchemaRecordKind::RelationType.prefix())?
            .iter()
            .map(|(_, value)| data.decode::<RelationType>(value))
            .collect::<CoreResult<Vec<_>>>()?;
        let vertex_labels = tx
            .scan_prefix(SCHEMA_STORE, &SchemaRecordKind::VertexLabel.prefix())?
            .iter()
            .map(|(_, value)| data.decode::<VertexLabel>(value))
            .collect::<CoreResult<Vec<_>>>()?;
        let indexes = tx
            .scan_prefix(SCHEMA_STORE, &SchemaRecordKind::Index.prefix())?
            .iter()
            .map(|(_, value)| data.decode::<IndexDefinition>(value))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(SchemaRegistry::from_parts(
            relation_types,
            vertex_labels,
            indexes,
        ))
    })();

    if let Err(err) = tx.rollback() {
        warn!(error = %err, "rollback of schema load failed");
    }
    result
}
