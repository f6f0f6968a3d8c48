//! Adjacency row layout.
//!
//! Every row of a vertex starts with its id, so one prefix scan loads the
//! vertex with all of its relations:
//!
//! ```text
//! vertex(8) 0x00                         -> VertexRecord
//! vertex(8) 0x01 key(8) relation(8)      -> PropertyValue
//! vertex(8) 0x02 label(8) relation(8)    -> in-vertex(8)   (outgoing edge)
//! vertex(8) 0x03 label(8) relation(8)    -> out-vertex(8)  (incoming edge)
//! ```

use super::read_u64;
use crate::error::{CoreError, CoreResult};
use crate::types::{Direction, RelationId, SchemaId, VertexId};
use serde::{Deserialize, Serialize};

const EXISTENCE_TAG: u8 = 0x00;
const PROPERTY_TAG: u8 = 0x01;
const OUT_EDGE_TAG: u8 = 0x02;
const IN_EDGE_TAG: u8 = 0x03;

/// Row written once per vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRecord {
    /// Vertex label id.
    pub label: SchemaId,
}

/// A decoded adjacency row key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeRow {
    /// The vertex existence row.
    Existence,
    /// A property row.
    Property {
        /// Property key id.
        key: SchemaId,
        /// Property id.
        relation: RelationId,
    },
    /// One side of an edge.
    Edge {
        /// [`Direction::Out`] or [`Direction::In`], relative to the row's vertex.
        direction: Direction,
        /// Edge label id.
        label: SchemaId,
        /// Edge id.
        relation: RelationId,
    },
}

/// Builds and parses adjacency row keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeSerializer;

impl EdgeSerializer {
    /// Creates a serializer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Prefix of every row of `vertex`.
    #[must_use]
    pub fn vertex_prefix(&self, vertex: VertexId) -> Vec<u8> {
        vertex.to_be_bytes().to_vec()
    }

    /// Key of the existence row of `vertex`.
    #[must_use]
    pub fn existence_key(&self, vertex: VertexId) -> Vec<u8> {
        let mut key = self.vertex_prefix(vertex);
        key.push(EXISTENCE_TAG);
        key
    }

    /// Key of a property row.
    #[must_use]
    pub fn property_key(&self, vertex: VertexId, key_id: SchemaId, relation: RelationId) -> Vec<u8> {
        let mut key = self.property_prefix(vertex, key_id);
        key.extend_from_slice(&relation.as_u64().to_be_bytes());
        key
    }

    /// Prefix of every property row of `vertex` under `key_id`.
    #[must_use]
    pub fn property_prefix(&self, vertex: VertexId, key_id: SchemaId) -> Vec<u8> {
        let mut key = self.vertex_prefix(vertex);
        key.push(PROPERTY_TAG);
        key.extend_from_slice(&key_id.as_u64().to_be_bytes());
        key
    }

    /// Key of one side of an edge.
    ///
    /// `direction` must be [`Direction::Out`] or [`Direction::In`].
    pub fn edge_key(
        &self,
        vertex: VertexId,
        direction: Direction,
        label: SchemaId,
        relation: RelationId,
    ) -> CoreResult<Vec<u8>> {
        let mut key = self.edge_prefix(vertex, direction, Some(label))?;
        key.extend_from_slice(&relation.as_u64().to_be_bytes());
        Ok(key)
    }

    /// Prefix of edge rows of `vertex` in `direction`, optionally for one label.
    pub fn edge_prefix(
        &self,
        vertex: VertexId,
        direction: Direction,
        label: Option<SchemaId>,
    ) -> CoreResult<Vec<u8>> {
        let tag = match direction {
            Direction::Out => OUT_EDGE_TAG,
            Direction::In => IN_EDGE_TAG,
            Direction::Both => {
                return Err(CoreError::invalid_operation(
                    "edge rows are stored per direction",
                ))
            }
        };
        let mut key = self.vertex_prefix(vertex);
        key.push(tag);
        if let Some(label) = label {
            key.extend_from_slice(&label.as_u64().to_be_bytes());
        }
        Ok(key)
    }

    /// Encodes the vertex stored as the value of an edge row.
    #[must_use]
    pub fn encode_vertex_ref(&self, vertex: VertexId) -> Vec<u8> {
        vertex.to_be_bytes().to_vec()
    }

    /// Decodes an edge row value.
    pub fn decode_vertex_ref(&self, value: &[u8]) -> CoreResult<VertexId> {
        if value.len() != 8 {
            return Err(CoreError::codec(format!(
                "edge row value has {} bytes, expected 8",
                value.len()
            )));
        }
        read_u64(value, 0).map(VertexId::new)
    }

    /// Parses a row key.
    pub fn parse(&self, key: &[u8]) -> CoreResult<(VertexId, EdgeRow)> {
        let vertex = VertexId::new(read_u64(key, 0)?);
        let tag = key
            .get(8)
            .copied()
            .ok_or_else(|| CoreError::codec("adjacency key is missing its row tag"))?;

        let row = match tag {
            EXISTENCE_TAG => EdgeRow::Existence,
            PROPERTY_TAG => EdgeRow::Property {
                key: SchemaId::new(read_u64(key, 9)?),
                relation: RelationId::new(read_u64(key, 17)?),
            },
            OUT_EDGE_TAG | IN_EDGE_TAG => EdgeRow::Edge {
                direction: if tag == OUT_EDGE_TAG {
                    Direction::Out
                } else {
                    Direction::In
                },
                label: SchemaId::new(read_u64(key, 9)?),
                relation: RelationId::new(read_u64(key, 17)?),
            },
            other => {
                return Err(CoreError::codec(format!(
                    "unknown adjacency row tag {other:#04x}"
                )))
            }
        };
        Ok((vertex, row))
    }
}
