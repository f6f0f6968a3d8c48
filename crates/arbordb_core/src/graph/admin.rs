//! Schema administration outside transaction scope.
//!
//! Every operation persists its definition through a dedicated backend
//! transaction, publishes it in the registry and then expires the element
//! in every open transaction.

use super::{Graph, GraphContext};
use crate::error::{CoreError, CoreResult};
use crate::index::{entry_values, IndexDefinition};
use crate::schema::{
    validate_name, Definition, EdgeLabelMaker, PropertyKeyMaker, RelationCategory, RelationType,
    VertexLabel, VertexLabelMaker, DEFAULT_VERTEX_LABEL,
};
use crate::serialize::{EdgeRow, SchemaRecordKind, EDGE_STORE, INDEX_STORE, SCHEMA_STORE};
use crate::types::{SchemaId, VertexId};
use crate::value::PropertyValue;
use arbordb_storage::{Mutation, StoreTransaction, StoreTxConfig};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

impl Graph {
    /// Defines a property key.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::SchemaConflict`] if the name is taken.
    pub fn define_property_key(&self, maker: PropertyKeyMaker) -> CoreResult<Arc<RelationType>> {
        self.ensure_writable()?;
        validate_name(maker.name())?;
        let id = self.shared.id_manager.next_schema_id()?;
        let relation_type = Arc::new(RelationType::PropertyKey(maker.build(id)));
        self.define(
            SchemaRecordKind::RelationType,
            relation_type.as_ref(),
            relation_type.name(),
            id,
            Definition::RelationType(Arc::clone(&relation_type)),
        )?;
        Ok(relation_type)
    }

    /// Defines an edge label.
    pub fn define_edge_label(&self, maker: EdgeLabelMaker) -> CoreResult<Arc<RelationType>> {
        self.ensure_writable()?;
        validate_name(maker.name())?;
        let id = self.shared.id_manager.next_schema_id()?;
        let relation_type = Arc::new(RelationType::EdgeLabel(maker.build(id)));
        self.define(
            SchemaRecordKind::RelationType,
            relation_type.as_ref(),
            relation_type.name(),
            id,
            Definition::RelationType(Arc::clone(&relation_type)),
        )?;
        Ok(relation_type)
    }

    /// Defines a vertex label.
    ///
    /// The default label name is always taken.
    pub fn define_vertex_label(&self, maker: VertexLabelMaker) -> CoreResult<Arc<VertexLabel>> {
        self.ensure_writable()?;
        validate_name(maker.name())?;
        if maker.name() == DEFAULT_VERTEX_LABEL {
            return Err(CoreError::SchemaConflict {
                name: DEFAULT_VERTEX_LABEL.to_string(),
            });
        }
        let id = self.shared.id_manager.next_schema_id()?;
        let label = Arc::new(maker.build(id));
        self.define(
            SchemaRecordKind::VertexLabel,
            label.as_ref(),
            &label.name,
            id,
            Definition::VertexLabel(Arc::clone(&label)),
        )?;
        Ok(label)
    }

    /// Renames a relation type.
    ///
    /// Open transactions that cached the type under its old name resolve
    /// it again on next use.
    pub fn rename_relation_type(&self, old_name: &str, new_name: &str) -> CoreResult<Arc<RelationType>> {
        self.ensure_writable()?;
        validate_name(new_name)?;
        let data = self.shared.data_serializer;
        let renamed = self.shared.schema.rename_with(old_name, new_name, |renamed| {
            let row = data.encode(renamed)?;
            self.write(|tx| {
                tx.mutate(
                    SCHEMA_STORE,
                    Mutation::put(SchemaRecordKind::RelationType.key(renamed.id()), row),
                )?;
                Ok(())
            })
        })?;

        info!(from = old_name, to = new_name, schema_id = %renamed.id(), "renamed relation type");
        self.broadcast_expiry(renamed.id());
        Ok(renamed)
    }

    /// Creates a composite index over existing property keys.
    ///
    /// Entries for committed vertices are written in the same backend
    /// transaction as the definition.
    ///
    /// # Errors
    ///
    /// - [`CoreError::SchemaViolation`] if a key is unknown or listed twice
    /// - [`CoreError::TypeKindMismatch`] if a name is an edge label
    /// - [`CoreError::UniquenessViolation`] if `unique` and existing data
    ///   holds a value combination more than once
    pub fn create_composite_index(
        &self,
        name: &str,
        keys: &[&str],
        unique: bool,
    ) -> CoreResult<Arc<IndexDefinition>> {
        self.ensure_writable()?;
        validate_name(name)?;
        if keys.is_empty() {
            return Err(CoreError::schema_violation(format!(
                "index '{name}' must cover at least one property key"
            )));
        }

        let mut key_ids = Vec::with_capacity(keys.len());
        for key in keys {
            let relation_type = self.shared.schema.relation_type(key).ok_or_else(|| {
                CoreError::schema_violation(format!("property key '{key}' does not exist"))
            })?;
            if !relation_type.is_property_key() {
                return Err(CoreError::type_kind_mismatch(
                    *key,
                    RelationCategory::PropertyKey,
                    relation_type.category(),
                ));
            }
            if key_ids.contains(&relation_type.id()) {
                return Err(CoreError::schema_violation(format!(
                    "property key '{key}' is listed twice in index '{name}'"
                )));
            }
            key_ids.push(relation_type.id());
        }

        let id = self.shared.id_manager.next_schema_id()?;
        let index = Arc::new(IndexDefinition {
            id,
            name: name.to_string(),
            keys: key_ids,
            unique,
        });
        let row = self.shared.data_serializer.encode(index.as_ref())?;

        self.shared.schema.define_with(
            name,
            || {
                self.write(|tx| {
                    let entries = self.backfill(tx, &index)?;
                    tx.mutate(
                        SCHEMA_STORE,
                        Mutation::put(SchemaRecordKind::Index.key(id), row),
                    )?;
                    if !entries.is_empty() {
                        tx.mutate(INDEX_STORE, entries)?;
                    }
                    Ok(())
                })
            },
            Definition::Index(Arc::clone(&index)),
        )?;

        info!(index = name, schema_id = %id, unique, "created composite index");
        self.broadcast_expiry(id);
        Ok(index)
    }

    fn define<T: Serialize>(
        &self,
        kind: SchemaRecordKind,
        record: &T,
        name: &str,
        id: SchemaId,
        element: Definition,
    ) -> CoreResult<()> {
        let row = self.shared.data_serializer.encode(record)?;
        self.shared.schema.define_with(
            name,
            || {
                self.write(|tx| {
                    tx.mutate(SCHEMA_STORE, Mutation::put(kind.key(id), row))?;
                    Ok(())
                })
            },
            element,
        )?;
        info!(element = name, schema_id = %id, kind = ?kind, "defined schema element");
        self.broadcast_expiry(id);
        Ok(())
    }

    /// Runs `f` in a fresh backend transaction and commits it.
    fn write<F>(&self, f: F) -> CoreResult<()>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> CoreResult<()>,
    {
        let mut tx = self
            .shared
            .begin_backend_transaction(&StoreTxConfig::default().group_name("schema"))?;
        let result = f(tx.as_mut()).and_then(|()| tx.commit().map_err(CoreError::from));
        if result.is_err() {
            if let Err(err) = tx.rollback() {
                warn!(error = %err, "rollback of schema write failed");
            }
        }
        result
    }

    /// Builds the entries of `index` for every committed vertex.
    fn backfill(
        &self,
        tx: &mut dyn StoreTransaction,
        index: &IndexDefinition,
    ) -> CoreResult<Mutation> {
        let edges = self.shared.edge_serializer;
        let data = self.shared.data_serializer;

        let mut values: BTreeMap<VertexId, HashMap<SchemaId, Vec<PropertyValue>>> =
            BTreeMap::new();
        for (row_key, value) in tx.scan_prefix(EDGE_STORE, &[])? {
            if let (vertex, EdgeRow::Property { key, .. }) = edges.parse(&row_key)? {
                if index.indexes_key(key) {
                    values
                        .entry(vertex)
                        .or_default()
                        .entry(key)
                        .or_default()
                        .push(data.decode(&value)?);
                }
            }
        }

        let serializer = self.shared.index_serializer;
        let mut seen: HashMap<Vec<u8>, VertexId> = HashMap::new();
        let mut entries = Mutation::new();
        for (vertex, properties) in &values {
            for combination in entry_values(index, properties) {
                let prefix = serializer.entry_prefix(index.id, &combination)?;
                if index.unique {
                    if let Some(holder) = seen.get(&prefix) {
                        if holder != vertex {
                            return Err(CoreError::UniquenessViolation {
                                index: index.name.clone(),
                            });
                        }
                    }
                    seen.insert(prefix, *vertex);
                }
                entries.add(
                    serializer.entry_key(index.id, &combination, *vertex)?,
                    Vec::new(),
                );
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Cardinality, DataType, Multiplicity};

    #[test]
    fn defined_types_are_resolvable() {
        let graph = Graph::open_in_memory().unwrap();
        let name = graph
            .define_property_key(PropertyKeyMaker::new("name").data_type(DataType::String))
            .unwrap();
        let knows = graph
            .define_edge_label(EdgeLabelMaker::new("knows").multiplicity(Multiplicity::Simple))
            .unwrap();

        assert_eq!(graph.schema().relation_type("name").unwrap().id(), name.id());
        assert!(graph.schema().relation_type("knows").unwrap().is_edge_label());
        assert_ne!(name.id(), knows.id());
    }

    #[test]
    fn duplicate_definitions_conflict() {
        let graph = Graph::open_in_memory().unwrap();
        graph.define_property_key(PropertyKeyMaker::new("name")).unwrap();
        assert!(matches!(
            graph.define_edge_label(EdgeLabelMaker::new("name")),
            Err(CoreError::SchemaConflict { .. })
        ));
        assert!(matches!(
            graph.define_vertex_label(VertexLabelMaker::new(DEFAULT_VERTEX_LABEL)),
            Err(CoreError::SchemaConflict { .. })
        ));
        assert!(matches!(
            graph.define_property_key(PropertyKeyMaker::new("~id")),
            Err(CoreError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn read_only_graph_refuses_definitions() {
        let graph = Graph::open(
            crate::config::GraphConfig::default().read_only(true),
            Arc::new(arbordb_storage::InMemoryStoreManager::new()),
        )
        .unwrap();
        assert!(matches!(
            graph.define_property_key(PropertyKeyMaker::new("name")),
            Err(CoreError::ReadOnly)
        ));
    }

    #[test]
    fn rename_expires_open_transactions() {
        let graph = Graph::open_in_memory().unwrap();
        graph.define_property_key(PropertyKeyMaker::new("name")).unwrap();

        let tx = graph.new_transaction().unwrap();
        let before = tx.get_or_create_property_key("name", None).unwrap();
        graph.rename_relation_type("name", "fullName").unwrap();

        let after = tx.get_relation_type("fullName").unwrap().unwrap();
        assert_eq!(after.id(), before.id());
        assert!(tx.get_relation_type("name").unwrap().is_none());
        assert!(graph.stats().snapshot().schema_expirations >= 1);
        tx.rollback().unwrap();
    }

    #[test]
    fn index_over_edge_label_is_rejected() {
        let graph = Graph::open_in_memory().unwrap();
        graph.define_edge_label(EdgeLabelMaker::new("knows")).unwrap();
        assert!(matches!(
            graph.create_composite_index("byKnows", &["knows"], false),
            Err(CoreError::TypeKindMismatch { .. })
        ));
        assert!(matches!(
            graph.create_composite_index("byMissing", &["missing"], false),
            Err(CoreError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn index_backfills_committed_vertices() {
        let graph = Graph::open_in_memory().unwrap();
        graph
            .define_property_key(PropertyKeyMaker::new("tag").cardinality(Cardinality::Set))
            .unwrap();
        graph
            .transaction(|tx| {
                let v = tx.add_vertex(None)?;
                tx.add_property(&v, "tag", "a")?;
                tx.add_property(&v, "tag", "b")?;
                Ok(())
            })
            .unwrap();

        let index = graph.create_composite_index("byTag", &["tag"], false).unwrap();
        assert_eq!(graph.schema().index("byTag").unwrap().id, index.id);

        let tx = graph.new_transaction().unwrap();
        let found = tx
            .query(&crate::query::GraphQuery::new().has("tag", "b"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(graph.stats().snapshot().index_lookups, 1);
        tx.rollback().unwrap();
    }

    #[test]
    fn unique_index_rejects_duplicate_data() {
        let graph = Graph::open_in_memory().unwrap();
        graph
            .transaction(|tx| {
                for _ in 0..2 {
                    let v = tx.add_vertex(None)?;
                    tx.add_property(&v, "email", "a@example.com")?;
                }
                Ok(())
            })
            .unwrap();

        assert!(matches!(
            graph.create_composite_index("byEmail", &["email"], true),
            Err(CoreError::UniquenessViolation { .. })
        ));
        assert!(graph.schema().index("byEmail").is_none());
    }
}
