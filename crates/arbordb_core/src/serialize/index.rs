//! Composite index entry layout: `index(8) CBOR(values) vertex(8)`.
//!
//! CBOR items are self-delimiting, so the prefix `index(8) CBOR(values)`
//! matches exactly the entries for those values.

use super::{read_u64, DataSerializer};
use crate::error::{CoreError, CoreResult};
use crate::types::{SchemaId, VertexId};
use crate::value::PropertyValue;

/// Builds and parses composite index keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexSerializer {
    data: DataSerializer,
}

impl IndexSerializer {
    /// Creates a serializer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: DataSerializer::new(),
        }
    }

    /// Prefix of every entry of `index` holding `values`.
    pub fn entry_prefix(&self, index: SchemaId, values: &[PropertyValue]) -> CoreResult<Vec<u8>> {
        let mut key = index.as_u64().to_be_bytes().to_vec();
        key.extend(self.data.encode(&values)?);
        Ok(key)
    }

    /// Key of the entry of `vertex` in `index`.
    pub fn entry_key(
        &self,
        index: SchemaId,
        values: &[PropertyValue],
        vertex: VertexId,
    ) -> CoreResult<Vec<u8>> {
        let mut key = self.entry_prefix(index, values)?;
        key.extend_from_slice(&vertex.to_be_bytes());
        Ok(key)
    }

    /// Prefix of every entry of `index`.
    #[must_use]
    pub fn index_prefix(&self, index: SchemaId) -> Vec<u8> {
        index.as_u64().to_be_bytes().to_vec()
    }

    /// Returns the vertex an entry points to.
    pub fn vertex_of(&self, key: &[u8]) -> CoreResult<VertexId> {
        let offset = key
            .len()
            .checked_sub(8)
            .filter(|offset| *offset >= 8)
            .ok_or_else(|| CoreError::codec("index entry key is too short"))?;
        read_u64(key, offset).map(VertexId::new)
    }
}
