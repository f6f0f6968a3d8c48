//! Schema resolution within a transaction.

use super::inner::TransactionInner;
use super::state::OpenState;
use crate::error::{CoreError, CoreResult};
use crate::schema::{
    validate_name, EdgeLabelMaker, PropertyKeyMaker, RelationCategory, RelationType, VertexLabel,
    VertexLabelMaker, DEFAULT_VERTEX_LABEL,
};
use crate::types::SchemaId;
use crate::value::PropertyValue;
use std::sync::Arc;
use tracing::debug;

impl TransactionInner {
    /// Resolves `name` as a relation type of kind `category`, creating it
    /// through the schema maker if it does not exist.
    ///
    /// Lookup order is the local cache, then the resolver, then the maker.
    pub(super) fn get_or_create_relation_type(
        &self,
        state: &mut OpenState,
        name: &str,
        category: RelationCategory,
        value: Option<&PropertyValue>,
    ) -> CoreResult<Arc<RelationType>> {
        if let Some(existing) = self.lookup_relation_type(state, name)? {
            if existing.category() != category {
                return Err(CoreError::type_kind_mismatch(
                    name,
                    category,
                    existing.category(),
                ));
            }
            return Ok(existing);
        }
        self.create_relation_type(state, name, category, value)
    }

    /// Resolves `name` without creating anything.
    pub(super) fn lookup_relation_type(
        &self,
        state: &mut OpenState,
        name: &str,
    ) -> CoreResult<Option<Arc<RelationType>>> {
        if let Some(cached) = state.schema.relation_type(name) {
            return Ok(Some(cached));
        }
        let resolved = self.resolver().resolve_relation_type(name)?;
        if let Some(relation_type) = &resolved {
            state.schema.insert(Arc::clone(relation_type));
        }
        Ok(resolved)
    }

    pub(super) fn relation_type_by_id(
        &self,
        state: &mut OpenState,
        id: SchemaId,
    ) -> CoreResult<Arc<RelationType>> {
        if let Some(cached) = state.schema.relation_type_with_id(id) {
            return Ok(cached);
        }
        let relation_type = self
            .resolver()
            .relation_type_by_id(id)?
            .ok_or_else(|| CoreError::schema_violation(format!("unknown relation type id {id}")))?;
        state.schema.insert(Arc::clone(&relation_type));
        Ok(relation_type)
    }

    fn create_relation_type(
        &self,
        state: &mut OpenState,
        name: &str,
        category: RelationCategory,
        value: Option<&PropertyValue>,
    ) -> CoreResult<Arc<RelationType>> {
        if self.config.is_read_only() {
            return Err(CoreError::ReadOnly);
        }
        validate_name(name)?;
        if state.schema.vertex_label(name).is_some() || self.graph.schema().contains_name(name) {
            return Err(CoreError::schema_violation(format!(
                "name '{name}' is already used by another schema element"
            )));
        }

        let maker = self.config.auto_schema_maker();
        let relation_type = match category {
            RelationCategory::PropertyKey => {
                let definition = maker.make_property_key(PropertyKeyMaker::new(name), value)?;
                let id = self.graph.id_manager().next_schema_id()?;
                RelationType::PropertyKey(definition.build(id))
            }
            RelationCategory::EdgeLabel => {
                let definition = maker.make_edge_label(EdgeLabelMaker::new(name))?;
                let id = self.graph.id_manager().next_schema_id()?;
                RelationType::EdgeLabel(definition.build(id))
            }
        };

        let relation_type = Arc::new(relation_type);
        state.schema.insert_created(Arc::clone(&relation_type));
        self.graph.stats().record_schema_created();
        debug!(
            transaction = %self.id(),
            relation_type = name,
            category = %category,
            schema_id = %relation_type.id(),
            maker = maker.name(),
            "created relation type"
        );
        Ok(relation_type)
    }

    pub(super) fn get_or_create_vertex_label(
        &self,
        state: &mut OpenState,
        name: &str,
    ) -> CoreResult<Arc<VertexLabel>> {
        if name == DEFAULT_VERTEX_LABEL {
            return Ok(Arc::clone(&state.default_label));
        }
        if let Some(label) = self.lookup_vertex_label(state, name) {
            return Ok(label);
        }

        if self.config.is_read_only() {
            return Err(CoreError::ReadOnly);
        }
        validate_name(name)?;
        if self.lookup_relation_type(state, name)?.is_some() || self.graph.schema().contains_name(name)
        {
            return Err(CoreError::schema_violation(format!(
                "name '{name}' is already used by another schema element"
            )));
        }

        let maker = self.config.auto_schema_maker();
        let definition = maker.make_vertex_label(VertexLabelMaker::new(name))?;
        let id = self.graph.id_manager().next_schema_id()?;
        let label = Arc::new(definition.build(id));
        state.schema.insert_created_label(Arc::clone(&label));
        self.graph.stats().record_schema_created();
        debug!(transaction = %self.id(), label = name, schema_id = %id, "created vertex label");
        Ok(label)
    }

    pub(super) fn lookup_vertex_label(
        &self,
        state: &mut OpenState,
        name: &str,
    ) -> Option<Arc<VertexLabel>> {
        if name == DEFAULT_VERTEX_LABEL {
            return Some(Arc::clone(&state.default_label));
        }
        if let Some(label) = state.schema.vertex_label(name) {
            return Some(label);
        }
        let label = self.graph.schema().vertex_label(name)?;
        state.schema.insert_label(Arc::clone(&label));
        Some(label)
    }

    pub(super) fn vertex_label_by_id(
        &self,
        state: &mut OpenState,
        id: SchemaId,
    ) -> CoreResult<Arc<VertexLabel>> {
        if id == state.default_label.id {
            return Ok(Arc::clone(&state.default_label));
        }
        if let Some(label) = state.schema.vertex_label_with_id(id) {
            return Ok(label);
        }
        let label = self
            .graph
            .schema()
            .vertex_label_with_id(id)
            .ok_or_else(|| CoreError::schema_violation(format!("unknown vertex label id {id}")))?;
        state.schema.insert_label(Arc::clone(&label));
        Ok(label)
    }
}
