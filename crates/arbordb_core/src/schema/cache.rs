//! Per-transaction schema cache.

use super::types::{RelationType, VertexLabel};
use crate::types::SchemaId;
use std::collections::HashMap;
use std::sync::Arc;

/// A transaction's view of the schema.
///
/// Holds every relation type and vertex label the transaction has resolved,
/// plus the ones it created itself. Created elements are authoritative for
/// the transaction and survive expiry until they are published on commit.
#[derive(Debug, Default)]
pub(crate) struct SchemaCache {
    types_by_name: HashMap<String, Arc<RelationType>>,
    types_by_id: HashMap<SchemaId, Arc<RelationType>>,
    labels_by_name: HashMap<String, Arc<VertexLabel>>,
    labels_by_id: HashMap<SchemaId, Arc<VertexLabel>>,
    created_types: Vec<Arc<RelationType>>,
    created_labels: Vec<Arc<VertexLabel>>,
}

impl SchemaCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn relation_type(&self, name: &str) -> Option<Arc<RelationType>> {
        self.types_by_name.get(name).cloned()
    }

    pub(crate) fn relation_type_with_id(&self, id: SchemaId) -> Option<Arc<RelationType>> {
        self.types_by_id.get(&id).cloned()
    }

    pub(crate) fn vertex_label(&self, name: &str) -> Option<Arc<VertexLabel>> {
        self.labels_by_name.get(name).cloned()
    }

    pub(crate) fn vertex_label_with_id(&self, id: SchemaId) -> Option<Arc<VertexLabel>> {
        self.labels_by_id.get(&id).cloned()
    }

    /// Caches a type resolved from outside the transaction.
    pub(crate) fn insert(&mut self, relation_type: Arc<RelationType>) {
        self.types_by_name
            .insert(relation_type.name().to_string(), Arc::clone(&relation_type));
        self.types_by_id.insert(relation_type.id(), relation_type);
    }

    pub(crate) fn insert_label(&mut self, label: Arc<VertexLabel>) {
        self.labels_by_name
            .insert(label.name.clone(), Arc::clone(&label));
        self.labels_by_id.insert(label.id, label);
    }

    /// Caches a type created by this transaction.
    pub(crate) fn insert_created(&mut self, relation_type: Arc<RelationType>) {
        self.created_types.push(Arc::clone(&relation_type));
        self.insert(relation_type);
    }

    pub(crate) fn insert_created_label(&mut self, label: Arc<VertexLabel>) {
        self.created_labels.push(Arc::clone(&label));
        self.insert_label(label);
    }

    pub(crate) fn is_created(&self, id: SchemaId) -> bool {
        self.created_types.iter().any(|t| t.id() == id)
            || self.created_labels.iter().any(|l| l.id == id)
    }

    /// Drops the cached element with `id` so the next lookup re-resolves it.
    ///
    /// Returns true if anything was removed.
    pub(crate) fn expire(&mut self, id: SchemaId) -> bool {
        if self.is_created(id) {
            return false;
        }
        let mut removed = false;
        if let Some(relation_type) = self.types_by_id.remove(&id) {
            // A rename may already have moved the name to another entry
            if self
                .types_by_name
                .get(relation_type.name())
                .is_some_and(|cached| cached.id() == id)
            {
                self.types_by_name.remove(relation_type.name());
            }
            removed = true;
        }
        if let Some(label) = self.labels_by_id.remove(&id) {
            self.labels_by_name.remove(&label.name);
            removed = true;
        }
        removed
    }

    pub(crate) fn created_types(&self) -> &[Arc<RelationType>] {
        &self.created_types
    }

    pub(crate) fn created_labels(&self) -> &[Arc<VertexLabel>] {
        &self.created_labels
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.types_by_id.len() + self.labels_by_id.len()
    }
}
