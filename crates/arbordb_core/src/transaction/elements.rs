//! Vertex and relation operations.

use super::inner::TransactionInner;
use super::state::OpenState;
use crate::error::{CoreError, CoreResult};
use crate::id::IdManager;
use crate::relation::{Edge, Relation, VertexProperty};
use crate::schema::{Cardinality, Multiplicity, RelationCategory, DEFAULT_VERTEX_LABEL};
use crate::serialize::{EdgeRow, VertexRecord, EDGE_STORE};
use crate::types::{Direction, SchemaId, VertexId};
use crate::value::PropertyValue;
use crate::vertex::{ElementLifecycle, InternalVertex};
use arbordb_storage::KeyValue;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{trace, warn};

impl TransactionInner {
    /// Returns the transaction's instance of vertex `id`, loading it on a
    /// cache miss.
    ///
    /// With `verify` set, a vertex without an existence row is reported
    /// absent. Without it, the vertex is assumed to exist. Removed vertices
    /// are returned as they are.
    pub(super) fn vertex(
        &self,
        state: &mut OpenState,
        id: u64,
        verify: bool,
    ) -> CoreResult<Option<Arc<InternalVertex>>> {
        if let Some(vertex) = state.vertices.get(id) {
            self.graph.stats().record_vertex_cache(true);
            return Ok(Some(vertex));
        }
        if id == 0 || IdManager::is_temporary(id) {
            return Ok(None);
        }
        self.graph.stats().record_vertex_cache(false);

        let vertex_id = VertexId::new(id);
        let label = match self.read_existence(state, vertex_id)? {
            Some(record) => self.vertex_label_by_id(state, record.label)?,
            None if verify => return Ok(None),
            None => Arc::clone(&state.default_label),
        };
        let vertex = Arc::new(InternalVertex::new(
            id,
            label,
            ElementLifecycle::Loaded,
            self.id(),
        ));
        Ok(Some(state.vertices.insert_loaded(vertex)))
    }

    fn read_existence(
        &self,
        state: &mut OpenState,
        vertex: VertexId,
    ) -> CoreResult<Option<VertexRecord>> {
        let key = self.graph.edge_serializer().existence_key(vertex);
        let value = if self.config.lazy_load_relations() && !state.rows.contains(&vertex.as_u64()) {
            state.backend.get(EDGE_STORE, &key)?
        } else {
            let rows = self.load_rows(state, vertex)?;
            let found = rows
                .iter()
                .find(|(row_key, _)| *row_key == key)
                .map(|(_, value)| value.clone());
            found
        };
        value
            .map(|bytes| self.graph.data_serializer().decode(&bytes))
            .transpose()
    }

    /// Returns the committed adjacency rows of `vertex`.
    pub(super) fn load_rows(
        &self,
        state: &mut OpenState,
        vertex: VertexId,
    ) -> CoreResult<Arc<Vec<KeyValue>>> {
        if let Some(rows) = state.rows.get(&vertex.as_u64()) {
            return Ok(Arc::clone(rows));
        }
        let prefix = self.graph.edge_serializer().vertex_prefix(vertex);
        let rows = Arc::new(state.backend.scan_prefix(EDGE_STORE, &prefix)?);
        trace!(transaction = %self.id(), vertex = %vertex, rows = rows.len(), "loaded adjacency rows");
        state.rows.put(vertex.as_u64(), Arc::clone(&rows));
        Ok(rows)
    }

    /// Checks that `vertex` belongs to this transaction and is not removed.
    pub(super) fn ensure_member(&self, vertex: &InternalVertex) -> CoreResult<()> {
        if vertex.transaction() != self.id() {
            return Err(CoreError::invalid_operation(format!(
                "vertex {} belongs to transaction {}",
                vertex.id(),
                vertex.transaction()
            )));
        }
        if vertex.is_removed() {
            return Err(CoreError::VertexNotFound {
                id: vertex.id().as_u64(),
            });
        }
        Ok(())
    }

    pub(super) fn add_vertex(
        &self,
        state: &mut OpenState,
        custom_id: Option<u64>,
        label: Option<&str>,
    ) -> CoreResult<Arc<InternalVertex>> {
        let custom_id = match custom_id {
            Some(_) if !self.config.allow_custom_vertex_id() => {
                return Err(CoreError::CustomIdNotAllowed)
            }
            Some(id) => {
                let id = IdManager::validate_custom_vertex_id(id)?;
                let taken = state.vertices.contains(id.as_u64())
                    || (self.config.verify_external_vertex_existence()
                        && self.read_existence(state, id)?.is_some());
                if taken {
                    return Err(CoreError::invalid_custom_id(
                        id.as_u64(),
                        "a vertex with this id already exists",
                    ));
                }
                Some(id.as_u64())
            }
            None if self.config.allow_custom_vertex_id() => return Err(CoreError::CustomIdRequired),
            None => None,
        };

        let label = self.get_or_create_vertex_label(state, label.unwrap_or(DEFAULT_VERTEX_LABEL))?;
        let id = match custom_id {
            Some(id) => id,
            None if self.config.assign_ids_immediately() => {
                self.graph.id_manager().next_vertex_id()?.as_u64()
            }
            None => state.temporary_ids.next(),
        };

        let vertex = Arc::new(InternalVertex::new(id, label, ElementLifecycle::New, self.id()));
        state.vertices.insert_volatile(Arc::clone(&vertex));
        state.new_vertices.push(Arc::clone(&vertex));
        trace!(transaction = %self.id(), vertex = %vertex, "added vertex");
        Ok(vertex)
    }

    fn next_relation_id(&self, state: &mut OpenState) -> CoreResult<u64> {
        if self.config.assign_ids_immediately() {
            Ok(self.graph.id_manager().next_relation_id()?.as_u64())
        } else {
            Ok(state.temporary_ids.next())
        }
    }

    /// Every live relation of `vertex`: committed rows minus removals, plus
    /// relations created here.
    pub(super) fn relations(
        &self,
        state: &mut OpenState,
        vertex: &Arc<InternalVertex>,
    ) -> CoreResult<Vec<Relation>> {
        let mut relations = Vec::new();
        if !vertex.is_new() && !vertex.has_temporary_id() {
            let edges = *self.graph.edge_serializer();
            let data = *self.graph.data_serializer();
            let rows = self.load_rows(state, vertex.id())?;
            let mut seen = HashSet::new();

            for (key, value) in rows.iter() {
                match edges.parse(key)?.1 {
                    EdgeRow::Existence => {}
                    EdgeRow::Property { key, relation } => {
                        if state.deleted.contains_key(&relation) {
                            continue;
                        }
                        if let Some(property) = state.relations.property(relation) {
                            relations.push(Relation::Property(property));
                            continue;
                        }
                        let relation_type = self.relation_type_by_id(state, key)?;
                        let definition = relation_type.as_property_key().cloned().ok_or_else(|| {
                            CoreError::codec(format!("property row {relation} uses edge label {key}"))
                        })?;
                        let property = state.relations.insert_property(VertexProperty::new(
                            relation.as_u64(),
                            Arc::clone(vertex),
                            (relation_type, definition),
                            data.decode(value)?,
                            ElementLifecycle::Loaded,
                        ));
                        relations.push(Relation::Property(property));
                    }
                    EdgeRow::Edge {
                        direction,
                        label,
                        relation,
                    } => {
                        // Self-loops have an out row and an in row
                        if state.deleted.contains_key(&relation) || !seen.insert(relation) {
                            continue;
                        }
                        if let Some(edge) = state.relations.edge(relation) {
                            relations.push(Relation::Edge(edge));
                            continue;
                        }
                        let other_id = edges.decode_vertex_ref(value)?;
                        let verify = self.config.verify_internal_vertex_existence();
                        let Some(other) = self.vertex(state, other_id.as_u64(), verify)? else {
                            warn!(
                                transaction = %self.id(),
                                vertex = %vertex.id(),
                                other = %other_id,
                                "skipping edge to missing vertex"
                            );
                            continue;
                        };
                        let relation_type = self.relation_type_by_id(state, label)?;
                        let definition = relation_type.as_edge_label().cloned().ok_or_else(|| {
                            CoreError::codec(format!("edge row {relation} uses property key {label}"))
                        })?;
                        let (out_vertex, in_vertex) = match direction {
                            Direction::In => (other, Arc::clone(vertex)),
                            Direction::Out | Direction::Both => (Arc::clone(vertex), other),
                        };
                        let edge = state.relations.insert_edge(Edge::new(
                            relation.as_u64(),
                            (relation_type, definition),
                            out_vertex,
                            in_vertex,
                            ElementLifecycle::Loaded,
                        ));
                        relations.push(Relation::Edge(edge));
                    }
                }
            }
        }
        relations.extend(state.added_incident(vertex));
        Ok(relations)
    }

    pub(super) fn properties(
        &self,
        state: &mut OpenState,
        vertex: &Arc<InternalVertex>,
        key: Option<&str>,
    ) -> CoreResult<Vec<Arc<VertexProperty>>> {
        let key = match key {
            Some(name) => match self.lookup_relation_type(state, name)? {
                Some(relation_type) if relation_type.is_property_key() => Some(relation_type.id()),
                Some(relation_type) => {
                    return Err(CoreError::type_kind_mismatch(
                        name,
                        RelationCategory::PropertyKey,
                        relation_type.category(),
                    ))
                }
                None => return Ok(Vec::new()),
            },
            None => None,
        };
        self.properties_with_key(state, vertex, key)
    }

    pub(super) fn properties_with_key(
        &self,
        state: &mut OpenState,
        vertex: &Arc<InternalVertex>,
        key: Option<SchemaId>,
    ) -> CoreResult<Vec<Arc<VertexProperty>>> {
        Ok(self
            .relations(state, vertex)?
            .into_iter()
            .filter_map(|relation| match relation {
                Relation::Property(property)
                    if key.map_or(true, |key| property.key().id == key) =>
                {
                    Some(property)
                }
                _ => None,
            })
            .collect())
    }

    pub(super) fn edges(
        &self,
        state: &mut OpenState,
        vertex: &Arc<InternalVertex>,
        direction: Direction,
        label: Option<&str>,
    ) -> CoreResult<Vec<Arc<Edge>>> {
        let label = match label {
            Some(name) => match self.lookup_relation_type(state, name)? {
                Some(relation_type) if relation_type.is_edge_label() => Some(relation_type.id()),
                Some(relation_type) => {
                    return Err(CoreError::type_kind_mismatch(
                        name,
                        RelationCategory::EdgeLabel,
                        relation_type.category(),
                    ))
                }
                None => return Ok(Vec::new()),
            },
            None => None,
        };
        self.edges_with_label(state, vertex, direction, label)
    }

    fn edges_with_label(
        &self,
        state: &mut OpenState,
        vertex: &Arc<InternalVertex>,
        direction: Direction,
        label: Option<SchemaId>,
    ) -> CoreResult<Vec<Arc<Edge>>> {
        Ok(self
            .relations(state, vertex)?
            .into_iter()
            .filter_map(|relation| match relation {
                Relation::Edge(edge)
                    if edge.is_incident(vertex, direction)
                        && label.map_or(true, |label| edge.label().id == label) =>
                {
                    Some(edge)
                }
                _ => None,
            })
            .collect())
    }

    pub(super) fn add_property(
        &self,
        state: &mut OpenState,
        vertex: &Arc<InternalVertex>,
        key: &str,
        value: PropertyValue,
    ) -> CoreResult<Arc<VertexProperty>> {
        self.ensure_member(vertex)?;
        let relation_type =
            self.get_or_create_relation_type(state, key, RelationCategory::PropertyKey, Some(&value))?;
        let definition = relation_type.as_property_key().cloned().ok_or_else(|| {
            CoreError::type_kind_mismatch(key, RelationCategory::PropertyKey, relation_type.category())
        })?;
        if !definition.data_type.accepts(&value) {
            return Err(CoreError::DataTypeMismatch {
                key: key.to_string(),
                expected: definition.data_type,
                actual: value.data_type(),
            });
        }

        let existing = self.properties_with_key(state, vertex, Some(definition.id))?;
        match definition.cardinality {
            Cardinality::Single => {
                for property in existing {
                    self.remove_relation(state, Relation::Property(property));
                }
            }
            Cardinality::Set => {
                if let Some(property) = existing.into_iter().find(|p| p.value() == &value) {
                    return Ok(property);
                }
            }
            Cardinality::List => {}
        }

        let id = self.next_relation_id(state)?;
        let property = Arc::new(VertexProperty::new(
            id,
            Arc::clone(vertex),
            (relation_type, definition),
            value,
            ElementLifecycle::New,
        ));
        state.added.push(Relation::Property(Arc::clone(&property)));
        self.touch(state, vertex);
        Ok(property)
    }

    pub(super) fn add_edge(
        &self,
        state: &mut OpenState,
        out_vertex: &Arc<InternalVertex>,
        in_vertex: &Arc<InternalVertex>,
        label: &str,
    ) -> CoreResult<Arc<Edge>> {
        self.ensure_member(out_vertex)?;
        self.ensure_member(in_vertex)?;
        let relation_type =
            self.get_or_create_relation_type(state, label, RelationCategory::EdgeLabel, None)?;
        let definition = relation_type.as_edge_label().cloned().ok_or_else(|| {
            CoreError::type_kind_mismatch(label, RelationCategory::EdgeLabel, relation_type.category())
        })?;

        let multiplicity = definition.multiplicity;
        if multiplicity != Multiplicity::Multi {
            let outgoing = self.edges_with_label(state, out_vertex, Direction::Out, Some(definition.id))?;
            if multiplicity == Multiplicity::Simple
                && outgoing.iter().any(|edge| Arc::ptr_eq(edge.in_vertex(), in_vertex))
            {
                return Err(CoreError::multiplicity_violation(
                    label,
                    format!("{out_vertex} and {in_vertex} are already connected"),
                ));
            }
            if multiplicity.is_unique(Direction::Out) && !outgoing.is_empty() {
                return Err(CoreError::multiplicity_violation(
                    label,
                    format!("{out_vertex} already has an outgoing edge"),
                ));
            }
            if multiplicity.is_unique(Direction::In)
                && !self
                    .edges_with_label(state, in_vertex, Direction::In, Some(definition.id))?
                    .is_empty()
            {
                return Err(CoreError::multiplicity_violation(
                    label,
                    format!("{in_vertex} already has an incoming edge"),
                ));
            }
        }

        let id = self.next_relation_id(state)?;
        let edge = Arc::new(Edge::new(
            id,
            (relation_type, definition),
            Arc::clone(out_vertex),
            Arc::clone(in_vertex),
            ElementLifecycle::New,
        ));
        state.added.push(Relation::Edge(Arc::clone(&edge)));
        self.touch(state, out_vertex);
        self.touch(state, in_vertex);
        Ok(edge)
    }

    pub(super) fn remove_relation(&self, state: &mut OpenState, relation: Relation) {
        let id = relation.id();
        if let Some(position) = state.added.iter().position(|added| added.id() == id) {
            state.added.remove(position);
        } else if !is_new(&relation) {
            state.deleted.insert(id, relation.clone());
        }
        relation.mark_removed();

        match &relation {
            Relation::Property(property) => self.touch(state, property.vertex()),
            Relation::Edge(edge) => {
                self.touch(state, edge.out_vertex());
                self.touch(state, edge.in_vertex());
            }
        }
    }

    pub(super) fn remove_vertex(
        &self,
        state: &mut OpenState,
        vertex: &Arc<InternalVertex>,
    ) -> CoreResult<()> {
        self.ensure_member(vertex)?;
        for relation in self.relations(state, vertex)? {
            self.remove_relation(state, relation);
        }

        let was_new = vertex.is_new();
        vertex.mark_removed();
        state.vertices.pin(vertex);
        if was_new {
            state.new_vertices.retain(|v| !Arc::ptr_eq(v, vertex));
        } else {
            state.removed_vertices.push(Arc::clone(vertex));
        }
        trace!(transaction = %self.id(), vertex = %vertex, "removed vertex");
        Ok(())
    }

    /// Records a change to `vertex`.
    fn touch(&self, state: &mut OpenState, vertex: &Arc<InternalVertex>) {
        vertex.mark_modified();
        state.vertices.pin(vertex);
    }
}

fn is_new(relation: &Relation) -> bool {
    match relation {
        Relation::Property(property) => property.lifecycle().is_new(),
        Relation::Edge(edge) => edge.lifecycle().is_new(),
    }
}
