//! Query execution.

use super::inner::TransactionInner;
use super::state::OpenState;
use crate::error::{CoreError, CoreResult};
use crate::index::{IndexDefinition, IndexSelection, SchemaInspector};
use crate::query::GraphQuery;
use crate::schema::{RelationCategory, RelationType, RelationTypeResolver, SchemaCache};
use crate::serialize::{EdgeRow, EDGE_STORE, INDEX_STORE};
use crate::types::{SchemaId, VertexId};
use crate::value::PropertyValue;
use crate::vertex::InternalVertex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// The schema as the querying transaction sees it, created types included.
struct TransactionSchemaView<'a> {
    cache: &'a SchemaCache,
    resolver: &'a dyn RelationTypeResolver,
    indexes: Vec<Arc<IndexDefinition>>,
}

impl SchemaInspector for TransactionSchemaView<'_> {
    fn relation_type_by_id(&self, id: SchemaId) -> Option<Arc<RelationType>> {
        self.cache
            .relation_type_with_id(id)
            .or_else(|| self.resolver.relation_type_by_id(id).ok().flatten())
    }

    fn indexes(&self) -> Vec<Arc<IndexDefinition>> {
        self.indexes.clone()
    }
}

impl TransactionInner {
    pub(super) fn query(
        &self,
        state: &mut OpenState,
        query: &GraphQuery,
    ) -> CoreResult<Vec<Arc<InternalVertex>>> {
        let ignore_undefined = self.config.auto_schema_maker().ignore_undefined_queries();

        let mut conditions: Vec<(SchemaId, &PropertyValue)> = Vec::new();
        for (name, value) in query.conditions() {
            match self.lookup_relation_type(state, name)? {
                Some(key) if key.is_property_key() => conditions.push((key.id(), value)),
                Some(other) => {
                    return Err(CoreError::type_kind_mismatch(
                        name.as_str(),
                        RelationCategory::PropertyKey,
                        other.category(),
                    ))
                }
                None if ignore_undefined => return Ok(Vec::new()),
                None => {
                    return Err(CoreError::schema_violation(format!(
                        "property key '{name}' is not defined"
                    )))
                }
            }
        }
        let label = match query.label() {
            Some(name) => match self.lookup_vertex_label(state, name) {
                Some(label) => Some(label.id),
                None if ignore_undefined => return Ok(Vec::new()),
                None => {
                    return Err(CoreError::schema_violation(format!(
                        "vertex label '{name}' is not defined"
                    )))
                }
            },
            None => None,
        };

        let mut matches: BTreeMap<u64, Arc<InternalVertex>> = BTreeMap::new();
        for id in self.candidates(state, &conditions)? {
            if let Some(vertex) = self.vertex(state, id, true)? {
                matches.insert(vertex.id().as_u64(), vertex);
            }
        }
        // Uncommitted changes are evaluated directly
        let volatile: Vec<_> = state.vertices.volatile().cloned().collect();
        for vertex in volatile {
            matches.insert(vertex.id().as_u64(), vertex);
        }

        let limit = query.result_limit().unwrap_or(usize::MAX);
        let mut results = Vec::new();
        for vertex in matches.into_values() {
            if results.len() >= limit {
                break;
            }
            if vertex.is_removed() || label.is_some_and(|label| vertex.label().id != label) {
                continue;
            }
            if self.satisfies(state, &vertex, &conditions)? {
                results.push(vertex);
            }
        }
        Ok(results)
    }

    /// Ids of committed vertices that may match, from indexes when the
    /// selector finds any, otherwise from a full scan.
    fn candidates(
        &self,
        state: &mut OpenState,
        conditions: &[(SchemaId, &PropertyValue)],
    ) -> CoreResult<Vec<u64>> {
        let mut keys: Vec<SchemaId> = conditions.iter().map(|(key, _)| *key).collect();
        keys.sort_unstable();
        keys.dedup();

        let selection = if keys.is_empty() {
            IndexSelection::default()
        } else {
            let view = TransactionSchemaView {
                cache: &state.schema,
                resolver: self.resolver(),
                indexes: self.graph.schema().indexes(),
            };
            self.graph.index_selector().select(&keys, &view)
        };

        let mut found: Option<BTreeSet<u64>> = None;
        for index in &selection.indexes {
            let values: Option<Vec<PropertyValue>> = index
                .keys
                .iter()
                .map(|key| {
                    conditions
                        .iter()
                        .find(|(condition, _)| condition == key)
                        .map(|(_, value)| (*value).clone())
                })
                .collect();
            let Some(values) = values else {
                continue;
            };
            let vertices: BTreeSet<u64> = self
                .index_lookup(state, index, &values)?
                .iter()
                .map(|vertex| vertex.as_u64())
                .collect();
            found = Some(match found {
                Some(previous) => previous.intersection(&vertices).copied().collect(),
                None => vertices,
            });
        }

        match found {
            Some(ids) => Ok(ids.into_iter().collect()),
            None => self.full_scan(state),
        }
    }

    fn index_lookup(
        &self,
        state: &mut OpenState,
        index: &IndexDefinition,
        values: &[PropertyValue],
    ) -> CoreResult<Arc<Vec<VertexId>>> {
        let serializer = *self.graph.index_serializer();
        let prefix = serializer.entry_prefix(index.id, values)?;
        self.graph.stats().record_index_lookup();
        if let Some(cached) = state.index_cache.get(&prefix) {
            return Ok(cached);
        }

        let entries = state.backend.scan_prefix(INDEX_STORE, &prefix)?;
        let vertices = entries
            .iter()
            .map(|(key, _)| serializer.vertex_of(key))
            .collect::<CoreResult<Vec<_>>>()?;
        let vertices = Arc::new(vertices);
        state.index_cache.insert(prefix, Arc::clone(&vertices));
        Ok(vertices)
    }

    fn full_scan(&self, state: &mut OpenState) -> CoreResult<Vec<u64>> {
        self.graph.stats().record_full_scan();
        debug!(transaction = %self.id(), "no usable index, scanning all vertices");

        let edges = *self.graph.edge_serializer();
        let mut ids = Vec::new();
        for (key, _) in state.backend.scan_prefix(EDGE_STORE, &[])? {
            if let (vertex, EdgeRow::Existence) = edges.parse(&key)? {
                ids.push(vertex.as_u64());
            }
        }
        Ok(ids)
    }

    fn satisfies(
        &self,
        state: &mut OpenState,
        vertex: &Arc<InternalVertex>,
        conditions: &[(SchemaId, &PropertyValue)],
    ) -> CoreResult<bool> {
        if conditions.is_empty() {
            return Ok(true);
        }
        let properties = self.properties_with_key(state, vertex, None)?;
        Ok(conditions.iter().all(|(key, value)| {
            properties
                .iter()
                .any(|property| property.key().id == *key && property.value() == *value)
        }))
    }
}
