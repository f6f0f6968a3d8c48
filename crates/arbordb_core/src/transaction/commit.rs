//! The commit pipeline.
//!
//! Commit runs in a fixed order:
//!
//! 1. Temporary ids are replaced by permanent ones.
//! 2. Adjacency rows are built for new and removed elements.
//! 3. Composite index entries are updated and uniqueness is checked.
//! 4. Schema elements created by the transaction are serialized.
//! 5. All rows are handed to the backend, which then commits while the new
//!    schema is published in the registry.
//!
//! Any failure leaves the backend transaction rolled back and the
//! transaction closed.

use super::inner::TransactionInner;
use super::state::OpenState;
use crate::error::{CoreError, CoreResult};
use crate::index::{entry_values, IndexDefinition};
use crate::relation::Relation;
use crate::schema::SchemaBatch;
use crate::serialize::{
    DataSerializer, EdgeRow, EdgeSerializer, SchemaRecordKind, VertexRecord, EDGE_STORE,
    INDEX_STORE, SCHEMA_STORE,
};
use crate::types::{Direction, SchemaId, VertexId};
use crate::value::PropertyValue;
use crate::vertex::InternalVertex;
use arbordb_storage::{KeyValue, Mutation};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

type PropertyMap = HashMap<SchemaId, Vec<PropertyValue>>;

/// A new entry in a unique index, checked once all entries are known.
struct UniqueClaim {
    index: Arc<IndexDefinition>,
    prefix: Vec<u8>,
    vertex: VertexId,
}

impl TransactionInner {
    /// Persists the transaction and closes it.
    pub(super) fn commit(&self) -> CoreResult<()> {
        self.check_thread()?;
        let mut state = self.take_state()?;

        let result = if self.config.is_read_only() || !state.has_modifications() {
            state.backend.commit().map_err(CoreError::from)
        } else {
            self.persist(&mut state)
        };

        let stats = self.graph.stats();
        match &result {
            Ok(()) => {
                stats.record_commit();
                debug!(transaction = %self.id(), "committed transaction");
            }
            Err(err) => {
                warn!(transaction = %self.id(), error = %err, "commit failed, rolling back");
                stats.record_commit_failure();
                stats.record_rollback();
                if let Err(rollback) = state.backend.rollback() {
                    warn!(transaction = %self.id(), error = %rollback, "rollback after failed commit failed");
                }
            }
        }

        drop(state);
        self.deregister();
        result
    }

    fn persist(&self, state: &mut OpenState) -> CoreResult<()> {
        self.assign_ids(state)?;

        let edge_rows = self.edge_mutation(state)?;
        let indexes = self.graph.schema().indexes();
        let index_rows = if indexes.is_empty() {
            Mutation::new()
        } else {
            self.index_mutation(state, &indexes)?
        };
        let schema_rows = self.schema_mutation(state)?;

        debug!(
            transaction = %self.id(),
            vertices_added = state.new_vertices.len(),
            vertices_removed = state.removed_vertices.len(),
            relations_added = state.added.len(),
            relations_removed = state.deleted.len(),
            edge_rows = edge_rows.len(),
            index_rows = index_rows.len(),
            schema_rows = schema_rows.len(),
            "persisting transaction"
        );

        for (store, rows) in [
            (SCHEMA_STORE, schema_rows),
            (EDGE_STORE, edge_rows),
            (INDEX_STORE, index_rows),
        ] {
            if !rows.is_empty() {
                state.backend.mutate(store, rows)?;
            }
        }

        let batch = SchemaBatch {
            relation_types: state.schema.created_types().to_vec(),
            vertex_labels: state.schema.created_labels().to_vec(),
        };
        let backend = &mut state.backend;
        self.graph
            .schema()
            .publish_with(&batch, || backend.commit().map_err(CoreError::from))
    }

    /// Replaces temporary vertex and relation ids with permanent ones.
    fn assign_ids(&self, state: &mut OpenState) -> CoreResult<()> {
        let ids = self.graph.id_manager();
        for vertex in &state.new_vertices {
            if vertex.has_temporary_id() {
                let temporary = vertex.id().as_u64();
                let id = ids.next_vertex_id()?;
                vertex.assign_id(id);
                state.vertices.rekey(temporary, id.as_u64());
            }
        }
        for relation in &state.added {
            if relation.has_temporary_id() {
                relation.assign_id(ids.next_relation_id()?);
            }
        }
        Ok(())
    }

    fn edge_mutation(&self, state: &OpenState) -> CoreResult<Mutation> {
        let edges = *self.graph.edge_serializer();
        let data = *self.graph.data_serializer();
        let mut mutation = Mutation::new();

        for vertex in &state.new_vertices {
            let record = VertexRecord {
                label: vertex.label().id,
            };
            mutation.add(edges.existence_key(vertex.id()), data.encode(&record)?);
        }
        for relation in &state.added {
            for (key, value) in relation_rows(&edges, &data, relation)? {
                mutation.add(key, value);
            }
        }
        for relation in state.deleted.values() {
            for (key, _) in relation_rows(&edges, &data, relation)? {
                mutation.remove(key);
            }
        }
        for vertex in &state.removed_vertices {
            mutation.remove(edges.existence_key(vertex.id()));
        }
        Ok(mutation)
    }

    /// Index entries to add and remove for every vertex whose indexed
    /// values changed.
    fn index_mutation(
        &self,
        state: &mut OpenState,
        indexes: &[Arc<IndexDefinition>],
    ) -> CoreResult<Mutation> {
        let indexed = |key: SchemaId| indexes.iter().any(|index| index.indexes_key(key));

        let mut affected: BTreeMap<u64, Arc<InternalVertex>> = BTreeMap::new();
        for vertex in &state.removed_vertices {
            affected.insert(vertex.id().as_u64(), Arc::clone(vertex));
        }
        for relation in state.added.iter().chain(state.deleted.values()) {
            if let Relation::Property(property) = relation {
                if indexed(property.key().id) {
                    affected
                        .entry(property.vertex().id().as_u64())
                        .or_insert_with(|| Arc::clone(property.vertex()));
                }
            }
        }

        let serializer = *self.graph.index_serializer();
        let mut mutation = Mutation::new();
        let mut removed: HashSet<Vec<u8>> = HashSet::new();
        let mut claims = Vec::new();

        for vertex in affected.values() {
            let (before, after) = self.indexed_values(state, vertex, indexes)?;
            for index in indexes {
                let old = entry_values(index, &before);
                let new = entry_values(index, &after);
                for values in old.iter().filter(|values| !new.contains(values)) {
                    let key = serializer.entry_key(index.id, values, vertex.id())?;
                    removed.insert(key.clone());
                    mutation.remove(key);
                }
                for values in new.iter().filter(|values| !old.contains(values)) {
                    mutation.add(serializer.entry_key(index.id, values, vertex.id())?, Vec::new());
                    if index.unique {
                        claims.push(UniqueClaim {
                            index: Arc::clone(index),
                            prefix: serializer.entry_prefix(index.id, values)?,
                            vertex: vertex.id(),
                        });
                    }
                }
            }
        }

        let mut holders: HashMap<Vec<u8>, VertexId> = HashMap::new();
        for claim in claims {
            let violation = || CoreError::UniquenessViolation {
                index: claim.index.name.clone(),
            };
            if let Some(holder) = holders.insert(claim.prefix.clone(), claim.vertex) {
                if holder != claim.vertex {
                    return Err(violation());
                }
            }
            for (key, _) in state.backend.scan_prefix(INDEX_STORE, &claim.prefix)? {
                if removed.contains(&key) {
                    continue;
                }
                if serializer.vertex_of(&key)? != claim.vertex {
                    return Err(violation());
                }
            }
        }
        Ok(mutation)
    }

    /// Indexed property values of `vertex` before and after this commit.
    fn indexed_values(
        &self,
        state: &mut OpenState,
        vertex: &Arc<InternalVertex>,
        indexes: &[Arc<IndexDefinition>],
    ) -> CoreResult<(PropertyMap, PropertyMap)> {
        let indexed = |key: SchemaId| indexes.iter().any(|index| index.indexes_key(key));
        let mut before = PropertyMap::new();
        let mut after = PropertyMap::new();

        if !vertex.is_new() {
            let edges = *self.graph.edge_serializer();
            let data = *self.graph.data_serializer();
            let rows = self.load_rows(state, vertex.id())?;
            for (row_key, row_value) in rows.iter() {
                let (_, EdgeRow::Property { key, relation }) = edges.parse(row_key)? else {
                    continue;
                };
                if !indexed(key) {
                    continue;
                }
                let value: PropertyValue = data.decode(row_value)?;
                if !state.deleted.contains_key(&relation) {
                    after.entry(key).or_default().push(value.clone());
                }
                before.entry(key).or_default().push(value);
            }
        }
        if vertex.is_removed() {
            return Ok((before, PropertyMap::new()));
        }

        for relation in &state.added {
            if let Relation::Property(property) = relation {
                if Arc::ptr_eq(property.vertex(), vertex) && indexed(property.key().id) {
                    after
                        .entry(property.key().id)
                        .or_default()
                        .push(property.value().clone());
                }
            }
        }
        Ok((before, after))
    }

    fn schema_mutation(&self, state: &OpenState) -> CoreResult<Mutation> {
        let data = self.graph.data_serializer();
        let mut mutation = Mutation::new();
        for relation_type in state.schema.created_types() {
            mutation.add(
                SchemaRecordKind::RelationType.key(relation_type.id()),
                data.encode(relation_type.as_ref())?,
            );
        }
        for label in state.schema.created_labels() {
            mutation.add(
                SchemaRecordKind::VertexLabel.key(label.id),
                data.encode(label.as_ref())?,
            );
        }
        Ok(mutation)
    }
}

/// The adjacency rows that store `relation`: one for a property, one per
/// endpoint for an edge.
fn relation_rows(
    edges: &EdgeSerializer,
    data: &DataSerializer,
    relation: &Relation,
) -> CoreResult<Vec<KeyValue>> {
    match relation {
        Relation::Property(property) => Ok(vec![(
            edges.property_key(property.vertex().id(), property.key().id, property.id()),
            data.encode(property.value())?,
        )]),
        Relation::Edge(edge) => {
            let label = edge.label().id;
            let out_id = edge.out_vertex().id();
            let in_id = edge.in_vertex().id();
            Ok(vec![
                (
                    edges.edge_key(out_id, Direction::Out, label, edge.id())?,
                    edges.encode_vertex_ref(in_id),
                ),
                (
                    edges.edge_key(in_id, Direction::In, label, edge.id())?,
                    edges.encode_vertex_ref(out_id),
                ),
            ])
        }
    }
}
