//! Schema element definitions.

use crate::error::{CoreError, CoreResult};
use crate::types::{Direction, SchemaId};
use crate::value::PropertyValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names starting with this prefix are reserved for system use.
pub const RESERVED_PREFIX: char = '~';

/// Name of the label given to vertices created without one.
pub const DEFAULT_VERTEX_LABEL: &str = "vertex";

/// Validates a user-supplied schema name.
///
/// # Errors
///
/// Returns [`CoreError::SchemaViolation`] if the name is empty, starts with
/// the reserved prefix or contains control characters.
pub fn validate_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::schema_violation("schema name must not be empty"));
    }
    if name.starts_with(RESERVED_PREFIX) {
        return Err(CoreError::schema_violation(format!(
            "schema name '{name}' uses the reserved prefix '{RESERVED_PREFIX}'"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(CoreError::schema_violation(format!(
            "schema name {name:?} contains control characters"
        )));
    }
    Ok(())
}

/// Kind of a relation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationCategory {
    /// A property key.
    PropertyKey,
    /// An edge label.
    EdgeLabel,
}

impl fmt::Display for RelationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PropertyKey => f.write_str("property key"),
            Self::EdgeLabel => f.write_str("edge label"),
        }
    }
}

/// Data type accepted by a property key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// `true` / `false`.
    Boolean,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
    /// UTF-8 string.
    String,
    /// Raw bytes.
    Bytes,
    /// Any value.
    Object,
}

impl DataType {
    /// Returns true if `value` may be stored under a key of this type.
    #[must_use]
    pub fn accepts(self, value: &PropertyValue) -> bool {
        self == Self::Object || self == value.data_type()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// How many values a property key may hold per vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cardinality {
    /// At most one value; setting a value replaces the previous one.
    #[default]
    Single,
    /// Any number of values, duplicates allowed.
    List,
    /// Any number of distinct values.
    Set,
}

/// Constraint on the number of edges of a label between vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Multiplicity {
    /// No constraint.
    #[default]
    Multi,
    /// At most one edge of this label between any pair of vertices.
    Simple,
    /// At most one outgoing edge per vertex.
    ManyToOne,
    /// At most one incoming edge per vertex.
    OneToMany,
    /// At most one outgoing and one incoming edge per vertex.
    OneToOne,
}

impl Multiplicity {
    /// Returns true if a vertex may have at most one edge in `direction`.
    #[must_use]
    pub const fn is_unique(self, direction: Direction) -> bool {
        match direction {
            Direction::Out => matches!(self, Self::ManyToOne | Self::OneToOne),
            Direction::In => matches!(self, Self::OneToMany | Self::OneToOne),
            Direction::Both => matches!(self, Self::OneToOne),
        }
    }
}

/// A property key definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyKey {
    /// Schema id.
    pub id: SchemaId,
    /// Unique name.
    pub name: String,
    /// Accepted data type.
    pub data_type: DataType,
    /// Values per vertex.
    pub cardinality: Cardinality,
}

/// An edge label definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeLabel {
    /// Schema id.
    pub id: SchemaId,
    /// Unique name.
    pub name: String,
    /// Edge multiplicity constraint.
    pub multiplicity: Multiplicity,
    /// Whether edges of this label are directed.
    pub directed: bool,
}

/// A vertex label definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexLabel {
    /// Schema id.
    pub id: SchemaId,
    /// Unique name.
    pub name: String,
}

/// A relation type: either a property key or an edge label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationType {
    /// A property key.
    PropertyKey(PropertyKey),
    /// An edge label.
    EdgeLabel(EdgeLabel),
}

impl RelationType {
    /// Returns the schema id.
    #[must_use]
    pub fn id(&self) -> SchemaId {
        match self {
            Self::PropertyKey(key) => key.id,
            Self::EdgeLabel(label) => label.id,
        }
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::PropertyKey(key) => &key.name,
            Self::EdgeLabel(label) => &label.name,
        }
    }

    /// Returns the kind of this relation type.
    #[must_use]
    pub fn category(&self) -> RelationCategory {
        match self {
            Self::PropertyKey(_) => RelationCategory::PropertyKey,
            Self::EdgeLabel(_) => RelationCategory::EdgeLabel,
        }
    }

    /// Returns true if this is a property key.
    #[must_use]
    pub fn is_property_key(&self) -> bool {
        matches!(self, Self::PropertyKey(_))
    }

    /// Returns true if this is an edge label.
    #[must_use]
    pub fn is_edge_label(&self) -> bool {
        matches!(self, Self::EdgeLabel(_))
    }

    /// Returns the property key, if this is one.
    #[must_use]
    pub fn as_property_key(&self) -> Option<&PropertyKey> {
        match self {
            Self::PropertyKey(key) => Some(key),
            Self::EdgeLabel(_) => None,
        }
    }

    /// Returns the edge label, if this is one.
    #[must_use]
    pub fn as_edge_label(&self) -> Option<&EdgeLabel> {
        match self {
            Self::EdgeLabel(label) => Some(label),
            Self::PropertyKey(_) => None,
        }
    }

    /// Returns a copy of this type under a new name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            Self::PropertyKey(key) => key.name = name.into(),
            Self::EdgeLabel(label) => label.name = name.into(),
        }
        copy
    }
}

impl From<PropertyKey> for RelationType {
    fn from(key: PropertyKey) -> Self {
        Self::PropertyKey(key)
    }
}

impl From<EdgeLabel> for RelationType {
    fn from(label: EdgeLabel) -> Self {
        Self::EdgeLabel(label)
    }
}
