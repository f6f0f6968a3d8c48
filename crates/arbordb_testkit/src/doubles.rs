//! Test doubles for the seams of the transaction engine.
//!
//! Each double wraps or replaces one collaborator a transaction consumes:
//! the schema maker, the relation type resolver, the graph context and the
//! backend. They record what they see so tests can assert on calls instead
//! of on side effects.

use arbordb_core::{
    CoreResult, DataSerializer, EdgeLabelMaker, EdgeSerializer, Graph, GraphConfig, GraphContext,
    GraphStats, IdManager, IndexSelectionStrategy, IndexSerializer, OpenTransaction,
    PropertyKeyMaker, PropertyValue, RelationType, RelationTypeResolver, SchemaId, SchemaMaker,
    SchemaRegistry, TransactionBuilder, TransactionId, VertexLabelMaker, SYSTEM_STORE,
};
use arbordb_storage::{
    InMemoryStoreManager, KeyValue, Mutation, StorageError, StorageResult, StoreFeatures,
    StoreManager, StoreTransaction, StoreTxConfig,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// A schema maker that counts calls and delegates to another maker.
#[derive(Debug)]
pub struct CountingSchemaMaker<M> {
    inner: M,
    property_keys: AtomicUsize,
    edge_labels: AtomicUsize,
    vertex_labels: AtomicUsize,
}

impl<M: SchemaMaker> CountingSchemaMaker<M> {
    /// Wraps `inner`.
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            property_keys: AtomicUsize::new(0),
            edge_labels: AtomicUsize::new(0),
            vertex_labels: AtomicUsize::new(0),
        }
    }

    /// Calls to `make_property_key`.
    pub fn property_key_calls(&self) -> usize {
        self.property_keys.load(Ordering::SeqCst)
    }

    /// Calls to `make_edge_label`.
    pub fn edge_label_calls(&self) -> usize {
        self.edge_labels.load(Ordering::SeqCst)
    }

    /// Calls to `make_vertex_label`.
    pub fn vertex_label_calls(&self) -> usize {
        self.vertex_labels.load(Ordering::SeqCst)
    }

    /// All calls.
    pub fn total_calls(&self) -> usize {
        self.property_key_calls() + self.edge_label_calls() + self.vertex_label_calls()
    }
}

impl<M: SchemaMaker> SchemaMaker for CountingSchemaMaker<M> {
    fn make_property_key(
        &self,
        maker: PropertyKeyMaker,
        value: Option<&PropertyValue>,
    ) -> CoreResult<PropertyKeyMaker> {
        self.property_keys.fetch_add(1, Ordering::SeqCst);
        self.inner.make_property_key(maker, value)
    }

    fn make_edge_label(&self, maker: EdgeLabelMaker) -> CoreResult<EdgeLabelMaker> {
        self.edge_labels.fetch_add(1, Ordering::SeqCst);
        self.inner.make_edge_label(maker)
    }

    fn make_vertex_label(&self, maker: VertexLabelMaker) -> CoreResult<VertexLabelMaker> {
        self.vertex_labels.fetch_add(1, Ordering::SeqCst);
        self.inner.make_vertex_label(maker)
    }

    fn ignore_undefined_queries(&self) -> bool {
        self.inner.ignore_undefined_queries()
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// A resolver over a fixed set of relation types.
///
/// Stands in for the graph-wide schema index without a backend.
#[derive(Debug, Default)]
pub struct StubResolver {
    by_name: Mutex<HashMap<String, Arc<RelationType>>>,
    lookups: AtomicUsize,
}

impl StubResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `relation_type` resolvable.
    pub fn with(self, relation_type: RelationType) -> Self {
        self.by_name
            .lock()
            .insert(relation_type.name().to_string(), Arc::new(relation_type));
        self
    }

    /// Number of lookups by name.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl RelationTypeResolver for StubResolver {
    fn resolve_relation_type(&self, name: &str) -> CoreResult<Option<Arc<RelationType>>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.by_name.lock().get(name).cloned())
    }

    fn relation_type_by_id(&self, id: SchemaId) -> CoreResult<Option<Arc<RelationType>>> {
        Ok(self
            .by_name
            .lock()
            .values()
            .find(|relation_type| relation_type.id() == id)
            .cloned())
    }
}

/// A graph context that records every deregistration.
///
/// Delegates everything else to a real graph, so transactions opened
/// through it behave normally.
pub struct RecordingGraph {
    inner: Arc<dyn GraphContext>,
    closed: Mutex<Vec<TransactionId>>,
}

impl RecordingGraph {
    /// Wraps `graph`.
    pub fn new(graph: &Graph) -> Arc<Self> {
        Arc::new(Self {
            inner: graph.context(),
            closed: Mutex::new(Vec::new()),
        })
    }

    /// A transaction builder that opens transactions against this context.
    pub fn build_transaction(self: &Arc<Self>) -> TransactionBuilder {
        TransactionBuilder::new(Arc::clone(self) as Arc<dyn GraphContext>)
    }

    /// Every `close_transaction` call, in order.
    pub fn closed(&self) -> Vec<TransactionId> {
        self.closed.lock().clone()
    }

    /// Number of `close_transaction` calls for `id`.
    pub fn close_count(&self, id: TransactionId) -> usize {
        self.closed.lock().iter().filter(|closed| **closed == id).count()
    }
}

impl fmt::Debug for RecordingGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingGraph")
            .field("closed", &self.closed.lock().len())
            .finish_non_exhaustive()
    }
}

impl GraphContext for RecordingGraph {
    fn configuration(&self) -> &GraphConfig {
        self.inner.configuration()
    }

    fn data_serializer(&self) -> &DataSerializer {
        self.inner.data_serializer()
    }

    fn edge_serializer(&self) -> &EdgeSerializer {
        self.inner.edge_serializer()
    }

    fn index_serializer(&self) -> &IndexSerializer {
        self.inner.index_serializer()
    }

    fn id_manager(&self) -> &IdManager {
        self.inner.id_manager()
    }

    fn index_selector(&self) -> &dyn IndexSelectionStrategy {
        self.inner.index_selector()
    }

    fn schema(&self) -> &SchemaRegistry {
        self.inner.schema()
    }

    fn stats(&self) -> &GraphStats {
        self.inner.stats()
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn begin_backend_transaction(
        &self,
        config: &StoreTxConfig,
    ) -> CoreResult<Box<dyn StoreTransaction>> {
        self.inner.begin_backend_transaction(config)
    }

    fn next_transaction_id(&self) -> TransactionId {
        self.inner.next_transaction_id()
    }

    fn register_transaction(
        &self,
        id: TransactionId,
        transaction: Weak<dyn OpenTransaction>,
    ) -> CoreResult<()> {
        self.inner.register_transaction(id, transaction)
    }

    fn close_transaction(&self, id: TransactionId) {
        self.closed.lock().push(id);
        self.inner.close_transaction(id);
    }
}

/// Switches shared by a [`FaultyStoreManager`] and its transactions.
#[derive(Debug, Default)]
struct Faults {
    fail_commits: AtomicBool,
    fail_rollbacks: AtomicBool,
    fail_reads: AtomicBool,
}

/// An in-memory backend that fails on demand.
///
/// Commit failures only hit transactions that wrote graph data, so id
/// block reservations keep working while graph commits fail.
#[derive(Debug, Clone, Default)]
pub struct FaultyStoreManager {
    inner: InMemoryStoreManager,
    faults: Arc<Faults>,
}

impl FaultyStoreManager {
    /// Creates an empty backend with every fault switched off.
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &InMemoryStoreManager {
        &self.inner
    }

    /// Makes data commits fail.
    pub fn fail_commits(&self, value: bool) {
        self.faults.fail_commits.store(value, Ordering::SeqCst);
    }

    /// Makes rollbacks fail.
    pub fn fail_rollbacks(&self, value: bool) {
        self.faults.fail_rollbacks.store(value, Ordering::SeqCst);
    }

    /// Makes reads fail.
    pub fn fail_reads(&self, value: bool) {
        self.faults.fail_reads.store(value, Ordering::SeqCst);
    }
}

impl StoreManager for FaultyStoreManager {
    fn begin_transaction(
        &self,
        config: &StoreTxConfig,
    ) -> StorageResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(FaultyTransaction {
            inner: self.inner.begin_transaction(config)?,
            faults: Arc::clone(&self.faults),
            wrote_data: false,
        }))
    }

    fn features(&self) -> StoreFeatures {
        self.inner.features()
    }

    fn name(&self) -> &str {
        "faulty-inmemory"
    }

    fn close(&self) -> StorageResult<()> {
        self.inner.close()
    }
}

struct FaultyTransaction {
    inner: Box<dyn StoreTransaction>,
    faults: Arc<Faults>,
    wrote_data: bool,
}

impl StoreTransaction for FaultyTransaction {
    fn get(&mut self, store: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        if self.faults.fail_reads.load(Ordering::SeqCst) && store != SYSTEM_STORE {
            return Err(StorageError::temporary("injected read failure"));
        }
        self.inner.get(store, key)
    }

    fn scan_prefix(&mut self, store: &str, prefix: &[u8]) -> StorageResult<Vec<KeyValue>> {
        if self.faults.fail_reads.load(Ordering::SeqCst) && store != SYSTEM_STORE {
            return Err(StorageError::temporary("injected read failure"));
        }
        self.inner.scan_prefix(store, prefix)
    }

    fn mutate(&mut self, store: &str, mutation: Mutation) -> StorageResult<()> {
        if store != SYSTEM_STORE {
            self.wrote_data = true;
        }
        self.inner.mutate(store, mutation)
    }

    fn commit(&mut self) -> StorageResult<()> {
        if self.wrote_data && self.faults.fail_commits.load(Ordering::SeqCst) {
            return Err(StorageError::permanent("injected commit failure"));
        }
        self.inner.commit()
    }

    fn rollback(&mut self) -> StorageResult<()> {
        if self.faults.fail_rollbacks.load(Ordering::SeqCst) {
            let _ = self.inner.rollback();
            return Err(StorageError::permanent("injected rollback failure"));
        }
        self.inner.rollback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbordb_core::{Cardinality, DataType, DefaultSchemaMaker, PropertyKey};

    #[test]
    fn counting_maker_delegates() {
        let maker = CountingSchemaMaker::new(DefaultSchemaMaker::new());
        let built = maker
            .make_property_key(PropertyKeyMaker::new("age"), Some(&PropertyValue::from(3)))
            .unwrap()
            .build(SchemaId::new(1));
        assert_eq!(built.data_type, DataType::Integer);
        assert_eq!(maker.property_key_calls(), 1);
        assert_eq!(maker.total_calls(), 1);
    }

    #[test]
    fn stub_resolver_finds_by_name_and_id() {
        let resolver = StubResolver::new().with(RelationType::PropertyKey(PropertyKey {
            id: SchemaId::new(7),
            name: "name".to_string(),
            data_type: DataType::String,
            cardinality: Cardinality::Single,
        }));
        assert!(resolver.resolve_relation_type("name").unwrap().is_some());
        assert!(resolver.resolve_relation_type("other").unwrap().is_none());
        assert!(resolver.relation_type_by_id(SchemaId::new(7)).unwrap().is_some());
        assert_eq!(resolver.lookups(), 2);
    }

    #[test]
    fn faulty_store_fails_data_commits_only() {
        let store = FaultyStoreManager::new();
        store.fail_commits(true);

        let mut system = store.begin_transaction(&StoreTxConfig::default()).unwrap();
        system
            .mutate(SYSTEM_STORE, Mutation::put(b"k".to_vec(), b"v".to_vec()))
            .unwrap();
        system.commit().unwrap();

        let mut data = store.begin_transaction(&StoreTxConfig::default()).unwrap();
        data.mutate("edgestore", Mutation::put(b"k".to_vec(), b"v".to_vec()))
            .unwrap();
        assert!(data.commit().is_err());
        data.rollback().unwrap();
        assert_eq!(store.inner().key_count("edgestore"), 0);
    }
}
