//! Graph schema: relation types, vertex labels and the policies that
//! create them.
//!
//! Every transaction resolves names through a [`RelationTypeResolver`]
//! (normally the graph's [`SchemaRegistry`]) and caches the result for its
//! own lifetime. Names that resolve to nothing are handed to the
//! configured [`SchemaMaker`].

mod cache;
mod maker;
mod registry;
mod types;

pub(crate) use cache::SchemaCache;
pub use maker::{
    DefaultSchemaMaker, DisabledSchemaMaker, EdgeLabelMaker, LoggingSchemaMaker,
    PropertyKeyMaker, SchemaMaker, VertexLabelMaker,
};
pub(crate) use registry::Definition;
pub use registry::{RelationTypeResolver, SchemaBatch, SchemaRegistry};
pub use types::{
    validate_name, Cardinality, DataType, EdgeLabel, Multiplicity, PropertyKey, RelationCategory,
    RelationType, VertexLabel, DEFAULT_VERTEX_LABEL, RESERVED_PREFIX,
};
