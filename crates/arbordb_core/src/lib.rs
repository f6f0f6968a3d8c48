//! # ArborDB Core
//!
//! Transaction engine for the ArborDB property graph.
//!
//! This crate provides:
//! - Graph transactions with a per-transaction vertex and schema cache
//! - Schema resolution with pluggable schema makers
//! - Vertex, property and edge mutations persisted through a backend
//! - Composite indexes and index-aware vertex queries
//! - Id allocation in blocks reserved from the backend
//!
//! ## Example
//!
//! ```rust
//! use arbordb_core::{Graph, GraphQuery};
//!
//! let graph = Graph::open_in_memory().unwrap();
//! graph
//!     .transaction(|tx| {
//!         let marko = tx.add_vertex(Some("person"))?;
//!         tx.add_property(&marko, "name", "marko")?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let tx = graph.new_transaction().unwrap();
//! let found = tx.query(&GraphQuery::new().has("name", "marko")).unwrap();
//! assert_eq!(found.len(), 1);
//! tx.rollback().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod graph;
mod id;
mod index;
mod query;
mod relation;
mod schema;
mod serialize;
mod stats;
mod time;
mod transaction;
mod types;
mod value;
mod vertex;

pub use config::{GraphConfig, TransactionConfig};
pub use error::{CoreError, CoreResult};
pub use graph::{Graph, GraphContext, OpenTransaction};
pub use id::{IdManager, IdNamespace, DEFAULT_ID_BLOCK_SIZE, MAX_CUSTOM_VERTEX_ID, SYSTEM_STORE};
pub use index::{
    IndexDefinition, IndexSelection, IndexSelectionStrategy, SchemaInspector,
    ThresholdBasedIndexSelectionStrategy, DEFAULT_INDEX_SELECTION_THRESHOLD,
    MAX_INDEX_SELECTION_THRESHOLD,
};
pub use query::GraphQuery;
pub use relation::{Edge, Relation, VertexProperty};
pub use schema::{
    validate_name, Cardinality, DataType, DefaultSchemaMaker, DisabledSchemaMaker, EdgeLabel,
    EdgeLabelMaker, LoggingSchemaMaker, Multiplicity, PropertyKey, PropertyKeyMaker,
    RelationCategory, RelationType, RelationTypeResolver, SchemaBatch, SchemaMaker,
    SchemaRegistry, VertexLabel, VertexLabelMaker, DEFAULT_VERTEX_LABEL, RESERVED_PREFIX,
};
pub use serialize::{
    DataSerializer, EdgeRow, EdgeSerializer, IndexSerializer, SchemaRecordKind, VertexRecord,
    EDGE_STORE, INDEX_STORE, SCHEMA_STORE,
};
pub use stats::{GraphStats, StatsSnapshot};
pub use time::TimestampProvider;
pub use transaction::{GraphTransaction, TransactionBuilder};
pub use types::{Direction, RelationId, SchemaId, TransactionId, VertexId};
pub use value::PropertyValue;
pub use vertex::{ElementLifecycle, InternalVertex};
