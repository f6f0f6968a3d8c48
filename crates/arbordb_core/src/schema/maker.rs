//! Schema makers.
//!
//! A schema maker decides what happens when a transaction references a
//! relation type or vertex label that does not exist yet. The transaction
//! hands it a builder holding whatever the caller specified; the maker
//! either completes the builder or refuses.

use super::types::{
    Cardinality, DataType, EdgeLabel, Multiplicity, PropertyKey, RelationCategory, VertexLabel,
};
use crate::error::{CoreError, CoreResult};
use crate::types::SchemaId;
use crate::value::PropertyValue;
use std::fmt;

/// Builder for a property key definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyKeyMaker {
    name: String,
    data_type: Option<DataType>,
    cardinality: Option<Cardinality>,
}

impl PropertyKeyMaker {
    /// Starts a definition for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            cardinality: None,
        }
    }

    /// Returns the requested name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the data type.
    #[must_use]
    pub const fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Sets the cardinality.
    #[must_use]
    pub const fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = Some(cardinality);
        self
    }

    /// Returns true if the data type has been set.
    #[must_use]
    pub const fn has_data_type(&self) -> bool {
        self.data_type.is_some()
    }

    /// Returns true if the cardinality has been set.
    #[must_use]
    pub const fn has_cardinality(&self) -> bool {
        self.cardinality.is_some()
    }

    /// Finishes the definition under `id`.
    ///
    /// Unset attributes default to [`DataType::Object`] and
    /// [`Cardinality::Single`].
    #[must_use]
    pub fn build(self, id: SchemaId) -> PropertyKey {
        PropertyKey {
            id,
            name: self.name,
            data_type: self.data_type.unwrap_or(DataType::Object),
            cardinality: self.cardinality.unwrap_or_default(),
        }
    }
}

/// Builder for an edge label definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLabelMaker {
    name: String,
    multiplicity: Option<Multiplicity>,
    directed: bool,
}

impl EdgeLabelMaker {
    /// Starts a definition for `name`. Labels are directed unless changed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multiplicity: None,
            directed: true,
        }
    }

    /// Returns the requested name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the multiplicity.
    #[must_use]
    pub const fn multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = Some(multiplicity);
        self
    }

    /// Makes edges of this label undirected.
    #[must_use]
    pub const fn undirected(mut self) -> Self {
        self.directed = false;
        self
    }

    /// Returns true if the multiplicity has been set.
    #[must_use]
    pub const fn has_multiplicity(&self) -> bool {
        self.multiplicity.is_some()
    }

    /// Finishes the definition under `id`.
    #[must_use]
    pub fn build(self, id: SchemaId) -> EdgeLabel {
        EdgeLabel {
            id,
            name: self.name,
            multiplicity: self.multiplicity.unwrap_or_default(),
            directed: self.directed,
        }
    }
}

/// Builder for a vertex label definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLabelMaker {
    name: String,
}

impl VertexLabelMaker {
    /// Starts a definition for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the requested name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the definition under `id`.
    #[must_use]
    pub fn build(self, id: SchemaId) -> VertexLabel {
        VertexLabel {
            id,
            name: self.name,
        }
    }
}

/// Policy for creating undefined schema elements on first use.
///
/// Implementations are shared by every transaction of a graph and must be
/// safe to call concurrently.
pub trait SchemaMaker: Send + Sync + fmt::Debug {
    /// Completes a property key definition, or refuses to create it.
    ///
    /// `value` is the first value written under the key, if the key is being
    /// created by a write.
    fn make_property_key(
        &self,
        maker: PropertyKeyMaker,
        value: Option<&PropertyValue>,
    ) -> CoreResult<PropertyKeyMaker>;

    /// Completes an edge label definition, or refuses to create it.
    fn make_edge_label(&self, maker: EdgeLabelMaker) -> CoreResult<EdgeLabelMaker>;

    /// Completes a vertex label definition, or refuses to create it.
    fn make_vertex_label(&self, maker: VertexLabelMaker) -> CoreResult<VertexLabelMaker>;

    /// Whether queries on undefined keys return nothing instead of failing.
    fn ignore_undefined_queries(&self) -> bool {
        true
    }

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Creates every requested element with configurable defaults.
///
/// Property keys take their data type from the first value written, or
/// [`DataType::Object`] when created without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSchemaMaker {
    cardinality: Cardinality,
    multiplicity: Multiplicity,
    ignore_undefined_queries: bool,
}

impl Default for DefaultSchemaMaker {
    fn default() -> Self {
        Self {
            cardinality: Cardinality::Single,
            multiplicity: Multiplicity::Multi,
            ignore_undefined_queries: true,
        }
    }
}

impl DefaultSchemaMaker {
    /// Creates a maker with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cardinality given to new property keys.
    #[must_use]
    pub const fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Sets the multiplicity given to new edge labels.
    #[must_use]
    pub const fn with_multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    /// Sets whether queries on undefined keys are ignored.
    #[must_use]
    pub const fn with_ignore_undefined_queries(mut self, value: bool) -> Self {
        self.ignore_undefined_queries = value;
        self
    }
}

impl SchemaMaker for DefaultSchemaMaker {
    fn make_property_key(
        &self,
        mut maker: PropertyKeyMaker,
        value: Option<&PropertyValue>,
    ) -> CoreResult<PropertyKeyMaker> {
        if !maker.has_data_type() {
            let data_type = value.map_or(DataType::Object, PropertyValue::data_type);
            maker = maker.data_type(data_type);
        }
        if !maker.has_cardinality() {
            maker = maker.cardinality(self.cardinality);
        }
        Ok(maker)
    }

    fn make_edge_label(&self, maker: EdgeLabelMaker) -> CoreResult<EdgeLabelMaker> {
        if maker.has_multiplicity() {
            Ok(maker)
        } else {
            Ok(maker.multiplicity(self.multiplicity))
        }
    }

    fn make_vertex_label(&self, maker: VertexLabelMaker) -> CoreResult<VertexLabelMaker> {
        Ok(maker)
    }

    fn ignore_undefined_queries(&self) -> bool {
        self.ignore_undefined_queries
    }

    fn name(&self) -> &str {
        "default"
    }
}

/// Refuses to create anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisabledSchemaMaker;

impl SchemaMaker for DisabledSchemaMaker {
    fn make_property_key(
        &self,
        maker: PropertyKeyMaker,
        _value: Option<&PropertyValue>,
    ) -> CoreResult<PropertyKeyMaker> {
        Err(CoreError::schema_creation_disallowed(
            maker.name,
            RelationCategory::PropertyKey.to_string(),
        ))
    }

    fn make_edge_label(&self, maker: EdgeLabelMaker) -> CoreResult<EdgeLabelMaker> {
        Err(CoreError::schema_creation_disallowed(
            maker.name,
            RelationCategory::EdgeLabel.to_string(),
        ))
    }

    fn make_vertex_label(&self, maker: VertexLabelMaker) -> CoreResult<VertexLabelMaker> {
        Err(CoreError::schema_creation_disallowed(maker.name, "vertex label"))
    }

    fn ignore_undefined_queries(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Wraps another maker and logs every element it creates.
#[derive(Debug, Clone, Default)]
pub struct LoggingSchemaMaker<M> {
    inner: M,
}

impl<M: SchemaMaker> LoggingSchemaMaker<M> {
    /// Wraps `inner`.
    pub const fn new(inner: M) -> Self {
        Self { inner }
    }

    /// Returns the wrapped maker.
    pub const fn inner(&self) -> &M {
        &self.inner
    }
}

impl<M: SchemaMaker> SchemaMaker for LoggingSchemaMaker<M> {
    fn make_property_key(
        &self,
        maker: PropertyKeyMaker,
        value: Option<&PropertyValue>,
    ) -> CoreResult<PropertyKeyMaker> {
        let maker = self.inner.make_property_key(maker, value)?;
        tracing::info!(
            name = maker.name(),
            data_type = ?maker.data_type,
            cardinality = ?maker.cardinality,
            "creating undefined property key"
        );
        Ok(maker)
    }

    fn make_edge_label(&self, maker: EdgeLabelMaker) -> CoreResult<EdgeLabelMaker> {
        let maker = self.inner.make_edge_label(maker)?;
        tracing::info!(
            name = maker.name(),
            multiplicity = ?maker.multiplicity,
            "creating undefined edge label"
        );
        Ok(maker)
    }

    fn make_vertex_label(&self, maker: VertexLabelMaker) -> CoreResult<VertexLabelMaker> {
        let maker = self.inner.make_vertex_label(maker)?;
        tracing::info!(name = maker.name(), "creating undefined vertex label");
        Ok(maker)
    }

    fn ignore_undefined_queries(&self) -> bool {
        self.inner.ignore_undefined_queries()
    }

    fn name(&self) -> &str {
        "logging"
    }
}
