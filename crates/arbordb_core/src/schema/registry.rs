//! Graph-wide schema registry.

use super::types::{RelationType, VertexLabel};
use crate::error::{CoreError, CoreResult};
use crate::index::IndexDefinition;
use crate::types::SchemaId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves relation types by name or id.
///
/// The transaction consults its resolver on a local schema cache miss. The
/// graph's [`SchemaRegistry`] is the production implementation; a
/// transaction may be opened with a different one through
/// [`crate::TransactionBuilder::relation_type_resolver`].
pub trait RelationTypeResolver: Send + Sync {
    /// Looks up a relation type by name.
    fn resolve_relation_type(&self, name: &str) -> CoreResult<Option<Arc<RelationType>>>;

    /// Looks up a relation type by id.
    fn relation_type_by_id(&self, id: SchemaId) -> CoreResult<Option<Arc<RelationType>>>;
}

/// Schema elements created by one transaction, published on commit.
#[derive(Debug, Default, Clone)]
pub struct SchemaBatch {
    /// New relation types.
    pub relation_types: Vec<Arc<RelationType>>,
    /// New vertex labels.
    pub vertex_labels: Vec<Arc<VertexLabel>>,
}

impl SchemaBatch {
    /// Returns true if the batch defines nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relation_types.is_empty() && self.vertex_labels.is_empty()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    types_by_name: HashMap<String, Arc<RelationType>>,
    types_by_id: HashMap<SchemaId, Arc<RelationType>>,
    labels_by_name: HashMap<String, Arc<VertexLabel>>,
    labels_by_id: HashMap<SchemaId, Arc<VertexLabel>>,
    indexes: HashMap<String, Arc<IndexDefinition>>,
}

impl RegistryState {
    fn name_taken(&self, name: &str) -> bool {
        self.types_by_name.contains_key(name)
            || self.labels_by_name.contains_key(name)
            || self.indexes.contains_key(name)
    }

    fn insert_type(&mut self, relation_type: Arc<RelationType>) {
        self.types_by_name
            .insert(relation_type.name().to_string(), Arc::clone(&relation_type));
        self.types_by_id.insert(relation_type.id(), relation_type);
    }

    fn insert_label(&mut self, label: Arc<VertexLabel>) {
        self.labels_by_name
            .insert(label.name.clone(), Arc::clone(&label));
        self.labels_by_id.insert(label.id, label);
    }
}

/// The committed schema of a graph.
///
/// Holds every relation type, vertex label and composite index that has
/// been committed. Transactions read from it on a cache miss; committing
/// transactions publish their new types into it.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    state: RwLock<RegistryState>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from persisted definitions.
    pub(crate) fn from_parts(
        relation_types: Vec<RelationType>,
        vertex_labels: Vec<VertexLabel>,
        indexes: Vec<IndexDefinition>,
    ) -> Self {
        let mut state = RegistryState::default();
        for relation_type in relation_types {
            state.insert_type(Arc::new(relation_type));
        }
        for label in vertex_labels {
            state.insert_label(Arc::new(label));
        }
        for index in indexes {
            state.indexes.insert(index.name.clone(), Arc::new(index));
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Returns the relation type named `name`.
    #[must_use]
    pub fn relation_type(&self, name: &str) -> Option<Arc<RelationType>> {
        self.state.read().types_by_name.get(name).cloned()
    }

    /// Returns the relation type with id `id`.
    #[must_use]
    pub fn relation_type_with_id(&self, id: SchemaId) -> Option<Arc<RelationType>> {
        self.state.read().types_by_id.get(&id).cloned()
    }

    /// Returns the vertex label named `name`.
    #[must_use]
    pub fn vertex_label(&self, name: &str) -> Option<Arc<VertexLabel>> {
        self.state.read().labels_by_name.get(name).cloned()
    }

    /// Returns the vertex label with id `id`.
    #[must_use]
    pub fn vertex_label_with_id(&self, id: SchemaId) -> Option<Arc<VertexLabel>> {
        self.state.read().labels_by_id.get(&id).cloned()
    }

    /// Returns the composite index named `name`.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<Arc<IndexDefinition>> {
        self.state.read().indexes.get(name).cloned()
    }

    /// Returns every composite index.
    #[must_use]
    pub fn indexes(&self) -> Vec<Arc<IndexDefinition>> {
        let mut indexes: Vec<_> = self.state.read().indexes.values().cloned().collect();
        indexes.sort_by_key(|index| index.id);
        indexes
    }

    /// Returns every relation type, ordered by id.
    #[must_use]
    pub fn relation_types(&self) -> Vec<Arc<RelationType>> {
        let mut types: Vec<_> = self.state.read().types_by_id.values().cloned().collect();
        types.sort_by_key(|relation_type| relation_type.id());
        types
    }

    /// Returns true if any schema element is named `name`.
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        self.state.read().name_taken(name)
    }

    /// Publishes a transaction's new schema elements.
    ///
    /// Runs `commit` while holding the registry write lock, so the backend
    /// commit and the publication are atomic with respect to other
    /// publishers. Names already taken are rejected before `commit` runs.
    pub(crate) fn publish_with<F>(&self, batch: &SchemaBatch, commit: F) -> CoreResult<()>
    where
        F: FnOnce() -> CoreResult<()>,
    {
        if batch.is_empty() {
            return commit();
        }

        let mut state = self.state.write();
        for relation_type in &batch.relation_types {
            if state.name_taken(relation_type.name()) {
                return Err(CoreError::SchemaConflict {
                    name: relation_type.name().to_string(),
                });
            }
        }
        for label in &batch.vertex_labels {
            if state.name_taken(&label.name) {
                return Err(CoreError::SchemaConflict {
                    name: label.name.clone(),
                });
            }
        }

        commit()?;

        for relation_type in &batch.relation_types {
            state.insert_type(Arc::clone(relation_type));
        }
        for label in &batch.vertex_labels {
            state.insert_label(Arc::clone(label));
        }
        Ok(())
    }

    /// Runs `persist` for a single administrative definition and publishes
    /// the element once it succeeds.
    pub(crate) fn define_with<F>(&self, name: &str, persist: F, element: Definition) -> CoreResult<()>
    where
        F: FnOnce() -> CoreResult<()>,
    {
        let mut state = self.state.write();
        if state.name_taken(name) {
            return Err(CoreError::SchemaConflict {
                name: name.to_string(),
            });
        }
        persist()?;
        match element {
            Definition::RelationType(relation_type) => state.insert_type(relation_type),
            Definition::VertexLabel(label) => state.insert_label(label),
            Definition::Index(index) => {
                state.indexes.insert(index.name.clone(), index);
            }
        }
        Ok(())
    }

    /// Renames a relation type after `persist` stores the renamed copy.
    ///
    /// Returns the renamed type.
    pub(crate) fn rename_with<F>(
        &self,
        old_name: &str,
        new_name: &str,
        persist: F,
    ) -> CoreResult<Arc<RelationType>>
    where
        F: FnOnce(&RelationType) -> CoreResult<()>,
    {
        let mut state = self.state.write();
        let existing = state
            .types_by_name
            .get(old_name)
            .cloned()
            .ok_or_else(|| {
                CoreError::schema_violation(format!("relation type '{old_name}' does not exist"))
            })?;
        if state.name_taken(new_name) {
            return Err(CoreError::SchemaConflict {
                name: new_name.to_string(),
            });
        }

        let renamed = Arc::new(existing.renamed(new_name));
        persist(&renamed)?;

        state.types_by_name.remove(old_name);
        state.insert_type(Arc::clone(&renamed));
        Ok(renamed)
    }
}

/// A schema element defined outside a transaction.
#[derive(Debug, Clone)]
pub(crate) enum Definition {
    RelationType(Arc<RelationType>),
    VertexLabel(Arc<VertexLabel>),
    Index(Arc<IndexDefinition>),
}

impl RelationTypeResolver for SchemaRegistry {
    fn resolve_relation_type(&self, name: &str) -> CoreResult<Option<Arc<RelationType>>> {
        Ok(self.relation_type(name))
    }

    fn relation_type_by_id(&self, id: SchemaId) -> CoreResult<Option<Arc<RelationType>>> {
        Ok(self.relation_type_with_id(id))
    }
}
