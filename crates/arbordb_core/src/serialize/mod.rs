//! Byte layouts of everything the engine persists.
//!
//! Values are CBOR. Keys are built from big-endian fixed-width ids so that
//! a prefix scan returns rows in id order.
//!
//! | Store | Key | Value |
//! |---|---|---|
//! | `edgestore` | vertex id, row tag, ... | see [`EdgeSerializer`] |
//! | `graphindex` | index id, CBOR values, vertex id | empty |
//! | `schema` | kind tag, schema id | CBOR definition |
//! | `system` | namespace name | id block bound |

mod edge;
mod index;

pub use edge::{EdgeRow, EdgeSerializer, VertexRecord};
pub use index::IndexSerializer;

use crate::error::{CoreError, CoreResult};
use crate::types::SchemaId;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Adjacency rows of every vertex.
pub const EDGE_STORE: &str = "edgestore";
/// Composite index entries.
pub const INDEX_STORE: &str = "graphindex";
/// Schema definitions.
pub const SCHEMA_STORE: &str = "schema";

/// Encodes and decodes persisted values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataSerializer;

impl DataSerializer {
    /// Creates a serializer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encodes `value` as CBOR.
    pub fn encode<T: Serialize>(&self, value: &T) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf).map_err(|e| CoreError::codec(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes a CBOR value.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CoreResult<T> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::codec(e.to_string()))
    }
}

/// Kind tag of a schema store row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaRecordKind {
    /// A property key or edge label.
    RelationType = 0x01,
    /// A vertex label.
    VertexLabel = 0x02,
    /// A composite index.
    Index = 0x03,
}

impl SchemaRecordKind {
    /// Returns the key of the row holding schema element `id`.
    #[must_use]
    pub fn key(self, id: SchemaId) -> Vec<u8> {
        let mut key = Vec::with_capacity(9);
        key.push(self as u8);
        key.extend_from_slice(&id.as_u64().to_be_bytes());
        key
    }

    /// Returns the prefix shared by all rows of this kind.
    #[must_use]
    pub fn prefix(self) -> [u8; 1] {
        [self as u8]
    }
}

/// Reads a big-endian u64 at `offset`.
pub(crate) fn read_u64(bytes: &[u8], offset: usize) -> CoreResult<u64> {
    bytes
        .get(offset..offset + 8)
        .and_then(|slice| <[u8; 8]>::try_from(slice).ok())
        .map(u64::from_be_bytes)
        .ok_or_else(|| {
            CoreError::codec(format!(
                "key of {} bytes has no u64 at offset {offset}",
                bytes.len()
            ))
        })
}
