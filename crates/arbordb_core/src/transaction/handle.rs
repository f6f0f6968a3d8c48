//! The client-facing transaction handle.

use super::inner::TransactionInner;
use crate::config::TransactionConfig;
use crate::error::{CoreError, CoreResult};
use crate::graph::{GraphContext, OpenTransaction};
use crate::query::GraphQuery;
use crate::relation::{Edge, Relation, VertexProperty};
use crate::schema::{RelationCategory, RelationType, RelationTypeResolver, VertexLabel};
use crate::types::{Direction, SchemaId, TransactionId};
use crate::value::PropertyValue;
use crate::vertex::InternalVertex;
use arbordb_storage::StoreTxConfig;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// A unit of work against a graph.
///
/// A transaction is open from creation until the first successful call to
/// [`commit`](Self::commit) or [`rollback`](Self::rollback), or until a
/// commit fails. Closing releases every cache, after which lookups find
/// nothing and mutations fail with [`CoreError::TransactionClosed`].
///
/// Vertices returned by one transaction are the same instances for the
/// whole transaction: looking up an id twice yields `Arc`s that compare
/// equal with [`Arc::ptr_eq`].
///
/// Dropping an open transaction rolls it back.
///
/// ```rust
/// use arbordb_core::{Direction, Graph};
///
/// let graph = Graph::open_in_memory().unwrap();
/// let tx = graph.new_transaction().unwrap();
/// let marko = tx.add_vertex(Some("person")).unwrap();
/// let vadas = tx.add_vertex(Some("person")).unwrap();
/// tx.add_property(&marko, "name", "marko").unwrap();
/// tx.add_edge(&marko, &vadas, "knows").unwrap();
///
/// assert_eq!(tx.edges(&marko, Direction::Out, Some("knows")).unwrap().len(), 1);
/// tx.commit().unwrap();
/// assert!(!tx.is_open());
/// ```
pub struct GraphTransaction {
    inner: Arc<TransactionInner>,
}

impl GraphTransaction {
    /// Begins a backend transaction and registers with the graph.
    pub(crate) fn open(
        graph: Arc<dyn GraphContext>,
        config: TransactionConfig,
        resolver: Option<Arc<dyn RelationTypeResolver>>,
    ) -> CoreResult<Self> {
        if !graph.is_open() {
            return Err(CoreError::GraphClosed);
        }

        let mut backend_config = StoreTxConfig::default();
        if let Some(name) = config.group_name() {
            backend_config = backend_config.group_name(name);
        }
        if let Some(time) = config.commit_time() {
            backend_config = backend_config.commit_time(time);
        }
        let backend = graph.begin_backend_transaction(&backend_config)?;
        let id = graph.next_transaction_id();

        let inner = Arc::new(TransactionInner::new(
            id,
            Arc::clone(&graph),
            config,
            resolver,
            backend,
        ));
        let weak = Arc::downgrade(&inner);
        let registered: Weak<dyn OpenTransaction> = weak;
        if let Err(err) = graph.register_transaction(id, registered) {
            inner.abandon();
            return Err(err);
        }

        graph.stats().record_transaction_start();
        debug!(
            transaction = %id,
            read_only = inner.config.is_read_only(),
            single_threaded = inner.config.is_single_threaded(),
            "opened transaction"
        );
        Ok(Self { inner })
    }

    /// Returns the transaction id.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.inner.id()
    }

    /// Returns true until the transaction commits or rolls back.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    /// Returns true if mutations are rejected.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.inner.config.is_read_only()
    }

    /// Returns the settings the transaction was opened with.
    #[must_use]
    pub fn config(&self) -> &TransactionConfig {
        &self.inner.config
    }

    /// Start time, in the unit of the configured timestamp provider.
    #[must_use]
    pub fn start_time(&self) -> u64 {
        self.inner.start_time()
    }

    /// Returns the handle other subsystems use to reach this transaction.
    ///
    /// The handle stays valid after the transaction closes.
    #[must_use]
    pub fn handle(&self) -> Arc<dyn OpenTransaction> {
        Arc::clone(&self.inner) as Arc<dyn OpenTransaction>
    }

    /// Persists every change and closes the transaction.
    ///
    /// The transaction is closed afterwards even if the commit fails; the
    /// backend transaction is then rolled back.
    ///
    /// # Errors
    ///
    /// - [`CoreError::TransactionClosed`] if already closed
    /// - [`CoreError::UniquenessViolation`] if a unique index would hold a
    ///   value twice
    /// - [`CoreError::SchemaConflict`] if another transaction committed a
    ///   schema element of the same name first
    /// - [`CoreError::Storage`] if the backend fails
    pub fn commit(&self) -> CoreResult<()> {
        self.inner.commit()
    }

    /// Discards every change and closes the transaction.
    ///
    /// Callable from any thread.
    pub fn rollback(&self) -> CoreResult<()> {
        self.inner.rollback()
    }

    // Schema

    /// Resolves `name` as a relation type of kind `category`, creating it
    /// through the schema maker if it is unknown.
    ///
    /// # Errors
    ///
    /// - [`CoreError::TypeKindMismatch`] if `name` is a relation type of the
    ///   other kind
    /// - [`CoreError::SchemaCreationDisallowed`] if the schema maker refuses
    pub fn get_or_create_relation_type(
        &self,
        name: &str,
        category: RelationCategory,
    ) -> CoreResult<Arc<RelationType>> {
        self.inner
            .read(|state| self.inner.get_or_create_relation_type(state, name, category, None))
    }

    /// Resolves or creates the property key `name`.
    ///
    /// `value` lets the schema maker infer the data type of a new key.
    pub fn get_or_create_property_key(
        &self,
        name: &str,
        value: Option<&PropertyValue>,
    ) -> CoreResult<Arc<RelationType>> {
        self.inner.read(|state| {
            self.inner
                .get_or_create_relation_type(state, name, RelationCategory::PropertyKey, value)
        })
    }

    /// Resolves or creates the edge label `name`.
    pub fn get_or_create_edge_label(&self, name: &str) -> CoreResult<Arc<RelationType>> {
        self.get_or_create_relation_type(name, RelationCategory::EdgeLabel)
    }

    /// Resolves or creates the vertex label `name`.
    pub fn get_or_create_vertex_label(&self, name: &str) -> CoreResult<Arc<VertexLabel>> {
        self.inner
            .read(|state| self.inner.get_or_create_vertex_label(state, name))
    }

    /// Resolves `name` without creating it.
    pub fn get_relation_type(&self, name: &str) -> CoreResult<Option<Arc<RelationType>>> {
        self.inner
            .read(|state| self.inner.lookup_relation_type(state, name))
    }

    /// Returns true if `name` resolves to a relation type.
    pub fn contains_relation_type(&self, name: &str) -> CoreResult<bool> {
        Ok(self.get_relation_type(name)?.is_some())
    }

    /// Resolves the vertex label `name` without creating it.
    pub fn get_vertex_label(&self, name: &str) -> CoreResult<Option<Arc<VertexLabel>>> {
        self.inner
            .read(|state| Ok(self.inner.lookup_vertex_label(state, name)))
    }

    /// Drops any cached copy of schema element `id`.
    ///
    /// A no-op once the transaction is closed.
    pub fn expire_schema_element(&self, id: SchemaId) {
        OpenTransaction::expire_schema_element(self.inner.as_ref(), id);
    }

    // Vertices

    /// Creates a vertex with `label`, or the default label.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::CustomIdRequired`] when the graph requires
    /// custom vertex ids.
    pub fn add_vertex(&self, label: Option<&str>) -> CoreResult<Arc<InternalVertex>> {
        self.inner
            .write(|state| self.inner.add_vertex(state, None, label))
    }

    /// Creates a vertex with a caller-supplied id.
    ///
    /// # Errors
    ///
    /// - [`CoreError::CustomIdNotAllowed`] unless the graph allows custom ids
    /// - [`CoreError::InvalidCustomId`] if `id` is out of range or taken
    pub fn add_vertex_with_id(
        &self,
        id: u64,
        label: Option<&str>,
    ) -> CoreResult<Arc<InternalVertex>> {
        self.inner
            .write(|state| self.inner.add_vertex(state, Some(id), label))
    }

    /// Looks up vertex `id`.
    ///
    /// Unless existence checks are disabled, ids without a stored vertex
    /// yield `None`. Vertices removed in this transaction yield `None`.
    pub fn get_vertex(&self, id: u64) -> CoreResult<Option<Arc<InternalVertex>>> {
        let verify = self.inner.config.verify_external_vertex_existence();
        let vertex = self.inner.read(|state| self.inner.vertex(state, id, verify))?;
        Ok(vertex.filter(|vertex| !vertex.is_removed()))
    }

    /// Internal lookup used by other subsystems.
    ///
    /// Never fails: returns `None` once the transaction is closed.
    #[must_use]
    pub fn get_internal_vertex(&self, id: u64) -> Option<Arc<InternalVertex>> {
        OpenTransaction::get_internal_vertex(self.inner.as_ref(), id)
    }

    /// Removes `vertex` together with all its properties and edges.
    pub fn remove_vertex(&self, vertex: &Arc<InternalVertex>) -> CoreResult<()> {
        self.inner
            .write(|state| self.inner.remove_vertex(state, vertex))
    }

    /// Returns the label of `vertex`.
    #[must_use]
    pub fn vertex_label(&self, vertex: &InternalVertex) -> Arc<VertexLabel> {
        Arc::clone(vertex.label_arc())
    }

    /// Number of vertices this transaction holds in memory.
    pub fn cached_vertex_count(&self) -> CoreResult<usize> {
        self.inner.read(|state| Ok(state.vertices.len()))
    }

    // Relations

    /// Sets property `key` of `vertex` according to the key's cardinality.
    ///
    /// A single-valued key replaces its previous value. A set-valued key
    /// returns the existing property when the value is already present.
    ///
    /// # Errors
    ///
    /// - [`CoreError::DataTypeMismatch`] if the key has another data type
    /// - [`CoreError::TypeKindMismatch`] if `key` is an edge label
    /// - [`CoreError::VertexNotFound`] if `vertex` was removed
    pub fn add_property(
        &self,
        vertex: &Arc<InternalVertex>,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> CoreResult<Arc<VertexProperty>> {
        let value = value.into();
        self.inner
            .write(|state| self.inner.add_property(state, vertex, key, value))
    }

    /// Connects `out_vertex` to `in_vertex` with an edge labeled `label`.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::MultiplicityViolation`] if the label's
    /// multiplicity forbids the edge.
    pub fn add_edge(
        &self,
        out_vertex: &Arc<InternalVertex>,
        in_vertex: &Arc<InternalVertex>,
        label: &str,
    ) -> CoreResult<Arc<Edge>> {
        self.inner
            .write(|state| self.inner.add_edge(state, out_vertex, in_vertex, label))
    }

    /// Removes a property. Removing it twice is a no-op.
    pub fn remove_property(&self, property: &Arc<VertexProperty>) -> CoreResult<()> {
        self.inner.write(|state| {
            self.ensure_owned(property.vertex())?;
            if !property.lifecycle().is_removed() {
                self.inner
                    .remove_relation(state, Relation::Property(Arc::clone(property)));
            }
            Ok(())
        })
    }

    /// Removes an edge. Removing it twice is a no-op.
    pub fn remove_edge(&self, edge: &Arc<Edge>) -> CoreResult<()> {
        self.inner.write(|state| {
            self.ensure_owned(edge.out_vertex())?;
            if !edge.lifecycle().is_removed() {
                self.inner
                    .remove_relation(state, Relation::Edge(Arc::clone(edge)));
            }
            Ok(())
        })
    }

    /// Properties of `vertex`, all of them or those of `key`.
    pub fn properties(
        &self,
        vertex: &Arc<InternalVertex>,
        key: Option<&str>,
    ) -> CoreResult<Vec<Arc<VertexProperty>>> {
        self.ensure_owned(vertex)?;
        self.inner
            .read(|state| self.inner.properties(state, vertex, key))
    }

    /// The first value of property `key` of `vertex`.
    pub fn property_value(
        &self,
        vertex: &Arc<InternalVertex>,
        key: &str,
    ) -> CoreResult<Option<PropertyValue>> {
        Ok(self
            .properties(vertex, Some(key))?
            .first()
            .map(|property| property.value().clone()))
    }

    /// Edges of `vertex` in `direction`, all of them or those of `label`.
    pub fn edges(
        &self,
        vertex: &Arc<InternalVertex>,
        direction: Direction,
        label: Option<&str>,
    ) -> CoreResult<Vec<Arc<Edge>>> {
        self.ensure_owned(vertex)?;
        self.inner
            .read(|state| self.inner.edges(state, vertex, direction, label))
    }

    // Queries

    /// Runs `query`, seeing this transaction's uncommitted changes.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::SchemaViolation`] on an undefined key when
    /// the schema maker does not ignore undefined queries.
    pub fn query(&self, query: &GraphQuery) -> CoreResult<Vec<Arc<InternalVertex>>> {
        self.inner.read(|state| self.inner.query(state, query))
    }

    fn ensure_owned(&self, vertex: &InternalVertex) -> CoreResult<()> {
        if vertex.transaction() == self.id() {
            Ok(())
        } else {
            Err(CoreError::invalid_operation(format!(
                "vertex {} belongs to transaction {}",
                vertex.id(),
                vertex.transaction()
            )))
        }
    }
}

impl fmt::Debug for GraphTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphTransaction")
            .field("id", &self.id())
            .field("open", &self.is_open())
            .field("read_only", &self.is_read_only())
            .finish_non_exhaustive()
    }
}

impl Drop for GraphTransaction {
    fn drop(&mut self) {
        if self.inner.is_open() {
            warn!(transaction = %self.id(), "transaction dropped while open, rolling back");
            if let Err(err) = self.inner.rollback() {
                debug!(transaction = %self.id(), error = %err, "rollback on drop failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::GraphConfig;
    use crate::error::CoreError;
    use crate::query::GraphQuery;
    use crate::schema::{
        Cardinality, DataType, DefaultSchemaMaker, DisabledSchemaMaker, EdgeLabelMaker,
        Multiplicity, PropertyKeyMaker, RelationCategory,
    };
    use crate::types::Direction;
    use crate::value::PropertyValue;
    use crate::vertex::ElementLifecycle;
    use crate::Graph;
    use arbordb_storage::InMemoryStoreManager;
    use std::sync::Arc;

    fn graph() -> Graph {
        Graph::open_in_memory().unwrap()
    }

    #[test]
    fn read_your_writes_returns_same_instance() {
        let graph = graph();
        let tx = graph.new_transaction().unwrap();
        let v = tx.add_vertex(None).unwrap();
        assert!(v.has_temporary_id());

        let found = tx.get_internal_vertex(v.id().as_u64()).unwrap();
        assert!(Arc::ptr_eq(&v, &found));
        let found = tx.get_vertex(v.id().as_u64()).unwrap().unwrap();
        assert!(Arc::ptr_eq(&v, &found));
        tx.rollback().unwrap();
    }

    #[test]
    fn closed_transaction_degrades_to_absence() {
        let graph = graph();
        let tx = graph.new_transaction().unwrap();
        let v = tx.add_vertex(None).unwrap();
        let key = tx.get_or_create_property_key("name", None).unwrap();
        tx.rollback().unwrap();

        assert!(tx.get_internal_vertex(v.id().as_u64()).is_none());
        tx.expire_schema_element(key.id());
        assert!(matches!(tx.add_vertex(None), Err(CoreError::TransactionClosed)));
        assert!(matches!(tx.rollback(), Err(CoreError::TransactionClosed)));
        assert!(matches!(tx.commit(), Err(CoreError::TransactionClosed)));
        assert_eq!(graph.open_transaction_count(), 0);
    }

    #[test]
    fn committed_data_is_visible_to_later_transactions() {
        let graph = graph();
        let tx = graph.new_transaction().unwrap();
        let marko = tx.add_vertex(Some("person")).unwrap();
        let vadas = tx.add_vertex(Some("person")).unwrap();
        tx.add_property(&marko, "name", "marko").unwrap();
        tx.add_property(&marko, "age", 29).unwrap();
        tx.add_edge(&marko, &vadas, "knows").unwrap();
        tx.commit().unwrap();

        assert!(!marko.has_temporary_id());
        let marko_id = marko.id().as_u64();
        let vadas_id = vadas.id().as_u64();

        let tx = graph.new_transaction().unwrap();
        let marko = tx.get_vertex(marko_id).unwrap().unwrap();
        assert_eq!(marko.label().name, "person");
        assert_eq!(
            tx.property_value(&marko, "name").unwrap(),
            Some(PropertyValue::from("marko"))
        );
        assert_eq!(tx.properties(&marko, None).unwrap().len(), 2);

        let knows = tx.edges(&marko, Direction::Out, Some("knows")).unwrap();
        assert_eq!(knows.len(), 1);
        assert_eq!(knows[0].in_vertex().id().as_u64(), vadas_id);
        let vadas = tx.get_vertex(vadas_id).unwrap().unwrap();
        assert!(Arc::ptr_eq(knows[0].in_vertex(), &vadas));
        assert_eq!(tx.edges(&vadas, Direction::In, None).unwrap().len(), 1);
        tx.rollback().unwrap();
    }

    #[test]
    fn single_cardinality_replaces_value() {
        let graph = graph();
        let tx = graph.new_transaction().unwrap();
        let v = tx.add_vertex(None).unwrap();
        tx.add_property(&v, "name", "a").unwrap();
        tx.add_property(&v, "name", "b").unwrap();
        let values = tx.properties(&v, Some("name")).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value(), &PropertyValue::from("b"));
        tx.rollback().unwrap();
    }

    #[test]
    fn set_and_list_cardinality() {
        let graph = graph();
        graph
            .define_property_key(PropertyKeyMaker::new("tag").cardinality(Cardinality::Set))
            .unwrap();
        graph
            .define_property_key(PropertyKeyMaker::new("visit").cardinality(Cardinality::List))
            .unwrap();

        let tx = graph.new_transaction().unwrap();
        let v = tx.add_vertex(None).unwrap();
        let first = tx.add_property(&v, "tag", "a").unwrap();
        let again = tx.add_property(&v, "tag", "a").unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        tx.add_property(&v, "visit", 1).unwrap();
        tx.add_property(&v, "visit", 1).unwrap();
        assert_eq!(tx.properties(&v, Some("tag")).unwrap().len(), 1);
        assert_eq!(tx.properties(&v, Some("visit")).unwrap().len(), 2);
        tx.rollback().unwrap();
    }

    #[test]
    fn data_type_is_enforced() {
        let graph = graph();
        let tx = graph.new_transaction().unwrap();
        let v = tx.add_vertex(None).unwrap();
        tx.add_property(&v, "age", 29).unwrap();
        let key = tx.get_relation_type("age").unwrap().unwrap();
        assert_eq!(key.as_property_key().unwrap().data_type, DataType::Integer);
        assert!(matches!(
            tx.add_property(&v, "age", "old"),
            Err(CoreError::DataTypeMismatch { .. })
        ));
        assert!(tx.is_open());
        tx.rollback().unwrap();
    }

    #[test]
    fn simple_multiplicity_rejects_parallel_edges() {
        let graph = graph();
        graph
            .define_edge_label(EdgeLabelMaker::new("friend").multiplicity(Multiplicity::Simple))
            .unwrap();
        let tx = graph.new_transaction().unwrap();
        let a = tx.add_vertex(None).unwrap();
        let b = tx.add_vertex(None).unwrap();
        tx.add_edge(&a, &b, "friend").unwrap();
        assert!(matches!(
            tx.add_edge(&a, &b, "friend"),
            Err(CoreError::MultiplicityViolation { .. })
        ));
        tx.add_edge(&b, &a, "friend").unwrap();
        tx.rollback().unwrap();
    }

    #[test]
    fn one_to_one_multiplicity() {
        let graph = graph();
        graph
            .define_edge_label(EdgeLabelMaker::new("spouse").multiplicity(Multiplicity::OneToOne))
            .unwrap();
        let tx = graph.new_transaction().unwrap();
        let a = tx.add_vertex(None).unwrap();
        let b = tx.add_vertex(None).unwrap();
        let c = tx.add_vertex(None).unwrap();
        tx.add_edge(&a, &b, "spouse").unwrap();
        assert!(tx.add_edge(&a, &c, "spouse").is_err());
        assert!(tx.add_edge(&c, &b, "spouse").is_err());
        tx.rollback().unwrap();
    }

    #[test]
    fn removal_is_persisted() {
        let graph = graph();
        let (a_id, b_id) = graph
            .transaction(|tx| {
                let a = tx.add_vertex(None)?;
                let b = tx.add_vertex(None)?;
                tx.add_property(&a, "name", "a")?;
                tx.add_edge(&a, &b, "knows")?;
                Ok((a, b))
            })
            .map(|(a, b)| (a.id().as_u64(), b.id().as_u64()))
            .unwrap();

        graph
            .transaction(|tx| {
                let a = tx.get_vertex(a_id)?.unwrap();
                tx.remove_vertex(&a)?;
                assert!(tx.get_vertex(a_id)?.is_none());
                Ok(())
            })
            .unwrap();

        let tx = graph.new_transaction().unwrap();
        assert!(tx.get_vertex(a_id).unwrap().is_none());
        let b = tx.get_vertex(b_id).unwrap().unwrap();
        assert!(tx.edges(&b, Direction::Both, None).unwrap().is_empty());
        tx.rollback().unwrap();
    }

    #[test]
    fn remove_property_and_edge() {
        let graph = graph();
        let tx = graph.new_transaction().unwrap();
        let a = tx.add_vertex(None).unwrap();
        let b = tx.add_vertex(None).unwrap();
        let name = tx.add_property(&a, "name", "a").unwrap();
        let edge = tx.add_edge(&a, &b, "knows").unwrap();

        tx.remove_property(&name).unwrap();
        tx.remove_property(&name).unwrap();
        tx.remove_edge(&edge).unwrap();
        assert!(tx.properties(&a, None).unwrap().is_empty());
        assert!(tx.edges(&a, Direction::Both, None).unwrap().is_empty());
        tx.rollback().unwrap();
    }

    #[test]
    fn self_loop_is_listed_once() {
        let graph = graph();
        let id = graph
            .transaction(|tx| {
                let v = tx.add_vertex(None)?;
                tx.add_edge(&v, &v, "self")?;
                Ok(v)
            })
            .map(|v| v.id().as_u64())
            .unwrap();

        let tx = graph.new_transaction().unwrap();
        let v = tx.get_vertex(id).unwrap().unwrap();
        assert_eq!(tx.edges(&v, Direction::Both, None).unwrap().len(), 1);
        assert_eq!(tx.edges(&v, Direction::Out, None).unwrap().len(), 1);
        assert_eq!(tx.edges(&v, Direction::In, None).unwrap().len(), 1);
        tx.rollback().unwrap();
    }

    #[test]
    fn loaded_relations_keep_their_identity() {
        let graph = graph();
        let (a_id, b_id) = graph
            .transaction(|tx| {
                let a = tx.add_vertex(None)?;
                let b = tx.add_vertex(None)?;
                tx.add_property(&a, "name", "a")?;
                tx.add_edge(&a, &b, "knows")?;
                Ok((a, b))
            })
            .map(|(a, b)| (a.id().as_u64(), b.id().as_u64()))
            .unwrap();

        let tx = graph.new_transaction().unwrap();
        let a = tx.get_vertex(a_id).unwrap().unwrap();
        let b = tx.get_vertex(b_id).unwrap().unwrap();
        let first = tx.edges(&a, Direction::Out, Some("knows")).unwrap();
        let second = tx.edges(&a, Direction::Out, Some("knows")).unwrap();
        let incoming = tx.edges(&b, Direction::In, Some("knows")).unwrap();
        assert!(Arc::ptr_eq(&first[0], &second[0]));
        assert!(Arc::ptr_eq(&first[0], &incoming[0]));

        let name = tx.properties(&a, Some("name")).unwrap();
        let again = tx.properties(&a, Some("name")).unwrap();
        assert!(Arc::ptr_eq(&name[0], &again[0]));

        tx.remove_edge(&first[0]).unwrap();
        assert_eq!(second[0].lifecycle(), ElementLifecycle::Removed);
        assert!(tx.edges(&a, Direction::Out, Some("knows")).unwrap().is_empty());
        tx.rollback().unwrap();
    }

    #[test]
    fn read_only_rejects_mutations() {
        let graph = graph();
        let tx = graph.build_transaction().read_only(true).start().unwrap();
        assert!(matches!(tx.add_vertex(None), Err(CoreError::ReadOnly)));
        assert!(matches!(
            tx.get_or_create_property_key("name", None),
            Err(CoreError::ReadOnly)
        ));
        assert!(tx.is_open());
        tx.commit().unwrap();
    }

    #[test]
    fn single_threaded_rejects_foreign_threads() {
        let graph = graph();
        let tx = graph.build_transaction().single_threaded(true).start().unwrap();
        let v = tx.add_vertex(None).unwrap();
        let id = v.id().as_u64();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                assert!(matches!(tx.add_vertex(None), Err(CoreError::ThreadConfinement)));
                assert!(tx.get_internal_vertex(id).is_some());
            });
        });
        tx.rollback().unwrap();
    }

    #[test]
    fn custom_vertex_ids() {
        let graph = Graph::open(
            GraphConfig::new().allow_custom_vertex_id(true),
            Arc::new(InMemoryStoreManager::new()),
        )
        .unwrap();
        let tx = graph.new_transaction().unwrap();
        assert!(matches!(tx.add_vertex(None), Err(CoreError::CustomIdRequired)));
        let v = tx.add_vertex_with_id(42, None).unwrap();
        assert_eq!(v.id().as_u64(), 42);
        assert!(matches!(
            tx.add_vertex_with_id(42, None),
            Err(CoreError::InvalidCustomId { .. })
        ));
        assert!(matches!(
            tx.add_vertex_with_id(0, None),
            Err(CoreError::InvalidCustomId { .. })
        ));
        tx.commit().unwrap();

        let default_graph = Graph::open_in_memory().unwrap();
        let tx = default_graph.new_transaction().unwrap();
        assert!(matches!(
            tx.add_vertex_with_id(42, None),
            Err(CoreError::CustomIdNotAllowed)
        ));
        tx.rollback().unwrap();
    }

    #[test]
    fn immediate_ids_are_permanent() {
        let graph = graph();
        let tx = graph.build_transaction().assign_ids_immediately(true).start().unwrap();
        let v = tx.add_vertex(None).unwrap();
        assert!(!v.has_temporary_id());
        let p = tx.add_property(&v, "name", "x").unwrap();
        assert!(p.id().as_u64() > 0);
        tx.commit().unwrap();
    }

    #[test]
    fn disabled_schema_maker_refuses_creation() {
        let graph = graph();
        let tx = graph
            .build_transaction()
            .schema_maker(Arc::new(DisabledSchemaMaker))
            .start()
            .unwrap();
        let v = tx.add_vertex(None).unwrap();
        assert!(matches!(
            tx.add_property(&v, "name", "x"),
            Err(CoreError::SchemaCreationDisallowed { .. })
        ));
        assert!(tx.is_open());
        tx.rollback().unwrap();
    }

    #[test]
    fn kind_mismatch_keeps_transaction_open() {
        let graph = graph();
        let tx = graph.new_transaction().unwrap();
        tx.get_or_create_edge_label("knows").unwrap();
        assert!(matches!(
            tx.get_or_create_relation_type("knows", RelationCategory::PropertyKey),
            Err(CoreError::TypeKindMismatch { .. })
        ));
        assert!(tx.contains_relation_type("knows").unwrap());
        tx.add_vertex(None).unwrap();
        tx.rollback().unwrap();
    }

    #[test]
    fn query_sees_uncommitted_changes() {
        let graph = graph();
        graph
            .transaction(|tx| {
                let v = tx.add_vertex(None)?;
                tx.add_property(&v, "name", "marko")?;
                Ok(())
            })
            .unwrap();

        let tx = graph.new_transaction().unwrap();
        let fresh = tx.add_vertex(None).unwrap();
        tx.add_property(&fresh, "name", "marko").unwrap();
        let found = tx.query(&GraphQuery::new().has("name", "marko")).unwrap();
        assert_eq!(found.len(), 2);

        tx.remove_vertex(&found[0]).unwrap();
        let found = tx.query(&GraphQuery::new().has("name", "marko")).unwrap();
        assert_eq!(found.len(), 1);
        assert!(tx.query(&GraphQuery::new().has("missing", 1)).unwrap().is_empty());
        tx.rollback().unwrap();
    }

    #[test]
    fn strict_queries_reject_undefined_keys() {
        let graph = Graph::open(
            GraphConfig::new()
                .auto_schema_maker(DefaultSchemaMaker::new().with_ignore_undefined_queries(false)),
            Arc::new(InMemoryStoreManager::new()),
        )
        .unwrap();
        let tx = graph.new_transaction().unwrap();
        assert!(matches!(
            tx.query(&GraphQuery::new().has("missing", 1)),
            Err(CoreError::SchemaViolation { .. })
        ));
        tx.rollback().unwrap();
    }

    #[test]
    fn unique_index_is_enforced_on_commit() {
        let graph = graph();
        graph
            .define_property_key(PropertyKeyMaker::new("email").data_type(DataType::String))
            .unwrap();
        graph.create_composite_index("byEmail", &["email"], true).unwrap();

        graph
            .transaction(|tx| {
                let v = tx.add_vertex(None)?;
                tx.add_property(&v, "email", "a@example.com")?;
                Ok(())
            })
            .unwrap();

        let tx = graph.new_transaction().unwrap();
        let v = tx.add_vertex(None).unwrap();
        tx.add_property(&v, "email", "a@example.com").unwrap();
        assert!(matches!(
            tx.commit(),
            Err(CoreError::UniquenessViolation { .. })
        ));
        assert!(!tx.is_open());
        assert_eq!(graph.open_transaction_count(), 0);
        assert_eq!(graph.stats().snapshot().commit_failures, 1);

        let tx = graph.new_transaction().unwrap();
        let found = tx
            .query(&GraphQuery::new().has("email", "a@example.com"))
            .unwrap();
        assert_eq!(found.len(), 1);
        tx.rollback().unwrap();
    }

    #[test]
    fn index_entries_follow_value_changes() {
        let graph = graph();
        graph
            .define_property_key(PropertyKeyMaker::new("name").data_type(DataType::String))
            .unwrap();
        graph.create_composite_index("byName", &["name"], true).unwrap();

        let id = graph
            .transaction(|tx| {
                let v = tx.add_vertex(None)?;
                tx.add_property(&v, "name", "old")?;
                Ok(v)
            })
            .map(|v| v.id().as_u64())
            .unwrap();
        graph
            .transaction(|tx| {
                let v = tx.get_vertex(id)?.unwrap();
                tx.add_property(&v, "name", "new")?;
                Ok(())
            })
            .unwrap();
        // The freed value can be claimed again
        graph
            .transaction(|tx| {
                let v = tx.add_vertex(None)?;
                tx.add_property(&v, "name", "old")?;
                Ok(())
            })
            .unwrap();

        let tx = graph.new_transaction().unwrap();
        let found = tx.query(&GraphQuery::new().has("name", "new")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id().as_u64(), id);
        tx.rollback().unwrap();
    }

    #[test]
    fn dropping_open_transaction_rolls_back() {
        let graph = graph();
        {
            let tx = graph.new_transaction().unwrap();
            tx.add_vertex(None).unwrap();
        }
        assert_eq!(graph.open_transaction_count(), 0);
        assert_eq!(graph.stats().snapshot().transactions_rolled_back, 1);
    }

    #[test]
    fn foreign_vertices_are_rejected() {
        let graph = graph();
        let first = graph.new_transaction().unwrap();
        let second = graph.new_transaction().unwrap();
        let v = first.add_vertex(None).unwrap();
        assert!(matches!(
            second.add_property(&v, "name", "x"),
            Err(CoreError::InvalidOperation { .. })
        ));
        assert!(second.properties(&v, None).is_err());
        first.rollback().unwrap();
        second.rollback().unwrap();
    }
}
