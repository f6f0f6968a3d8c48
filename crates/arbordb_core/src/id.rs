//! Identifier allocation.
//!
//! Permanent ids are handed out from blocks reserved in the backend's
//! system store, so two graph instances sharing a backend never hand out
//! the same id. Each namespace has its own counter.
//!
//! ## Id space
//!
//! ```text
//! 0                       reserved, never a valid id
//! 1 ..= 2^48              custom vertex ids supplied by clients
//! 2^48 + 1 ..             allocated vertex ids
//! bit 63 set              transaction-local temporary ids
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::{RelationId, SchemaId, VertexId};
use arbordb_storage::{Mutation, StoreManager, StoreTxConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name of the store holding id block bounds.
pub const SYSTEM_STORE: &str = "system";

/// Largest id a client may choose for a vertex.
pub const MAX_CUSTOM_VERTEX_ID: u64 = 1 << 48;

/// Marker bit set on every temporary id.
const TEMPORARY_BIT: u64 = 1 << 63;

/// Default number of ids reserved per block.
pub const DEFAULT_ID_BLOCK_SIZE: u64 = 10_000;

/// Separate id counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdNamespace {
    /// Vertex ids.
    Vertex,
    /// Property and edge ids.
    Relation,
    /// Schema element ids.
    Schema,
}

impl IdNamespace {
    fn key(self) -> &'static [u8] {
        match self {
            Self::Vertex => b"ids/vertex",
            Self::Relation => b"ids/relation",
            Self::Schema => b"ids/schema",
        }
    }

    const fn first_id(self) -> u64 {
        match self {
            Self::Vertex => MAX_CUSTOM_VERTEX_ID + 1,
            Self::Relation | Self::Schema => 1,
        }
    }
}

/// A reserved range `[next, end)`.
#[derive(Debug, Clone, Copy)]
struct IdBlock {
    next: u64,
    end: u64,
}

impl IdBlock {
    fn take(&mut self) -> Option<u64> {
        if self.next < self.end {
            let id = self.next;
            self.next += 1;
            Some(id)
        } else {
            None
        }
    }
}

/// Allocates permanent ids and classifies temporary ones.
pub struct IdManager {
    store: Arc<dyn StoreManager>,
    block_size: u64,
    blocks: Mutex<HashMap<IdNamespace, IdBlock>>,
}

impl fmt::Debug for IdManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdManager")
            .field("store", &self.store.name())
            .field("block_size", &self.block_size)
            .finish_non_exhaustive()
    }
}

impl IdManager {
    /// Creates an id manager reserving `block_size` ids at a time.
    pub fn new(store: Arc<dyn StoreManager>, block_size: u64) -> Self {
        Self {
            store,
            block_size: block_size.max(1),
            blocks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the block size.
    #[must_use]
    pub const fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Allocates a permanent vertex id.
    pub fn next_vertex_id(&self) -> CoreResult<VertexId> {
        self.next_id(IdNamespace::Vertex).map(VertexId::new)
    }

    /// Allocates a permanent relation id.
    pub fn next_relation_id(&self) -> CoreResult<RelationId> {
        self.next_id(IdNamespace::Relation).map(RelationId::new)
    }

    /// Allocates a schema id.
    pub fn next_schema_id(&self) -> CoreResult<SchemaId> {
        self.next_id(IdNamespace::Schema).map(SchemaId::new)
    }

    fn next_id(&self, namespace: IdNamespace) -> CoreResult<u64> {
        let mut blocks = self.blocks.lock();
        if let Some(id) = blocks.get_mut(&namespace).and_then(IdBlock::take) {
            return Ok(id);
        }

        let mut block = self.reserve_block(namespace)?;
        let id = block
            .take()
            .ok_or_else(|| CoreError::invalid_operation("reserved an empty id block"))?;
        blocks.insert(namespace, block);
        Ok(id)
    }

    /// Reserves the next block through a dedicated backend transaction.
    fn reserve_block(&self, namespace: IdNamespace) -> CoreResult<IdBlock> {
        let mut tx = self.store.begin_transaction(&StoreTxConfig::default())?;

        let result = (|| -> CoreResult<IdBlock> {
            let start = match tx.get(SYSTEM_STORE, namespace.key())? {
                Some(bytes) => decode_bound(&bytes)?,
                None => namespace.first_id(),
            };
            let end = start
                .checked_add(self.block_size)
                .filter(|end| *end < TEMPORARY_BIT)
                .ok_or_else(|| CoreError::invalid_operation("id space exhausted"))?;

            let mutation = Mutation::put(namespace.key().to_vec(), end.to_be_bytes().to_vec());
            tx.mutate(SYSTEM_STORE, mutation)?;
            tx.commit()?;
            Ok(IdBlock { next: start, end })
        })();

        match result {
            Ok(block) => {
                tracing::debug!(
                    namespace = ?namespace,
                    start = block.next,
                    end = block.end,
                    "reserved id block"
                );
                Ok(block)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback of id block reservation failed");
                }
                Err(err)
            }
        }
    }

    /// Returns true if `id` is a transaction-local temporary id.
    #[must_use]
    pub const fn is_temporary(id: u64) -> bool {
        id & TEMPORARY_BIT != 0
    }

    /// Checks that a client-supplied vertex id lies in the custom range.
    pub fn validate_custom_vertex_id(id: u64) -> CoreResult<VertexId> {
        if id == 0 {
            return Err(CoreError::invalid_custom_id(id, "zero is not a valid id"));
        }
        if id > MAX_CUSTOM_VERTEX_ID {
            return Err(CoreError::invalid_custom_id(
                id,
                format!("custom ids must not exceed {MAX_CUSTOM_VERTEX_ID}"),
            ));
        }
        Ok(VertexId::new(id))
    }
}

fn decode_bound(bytes: &[u8]) -> CoreResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| CoreError::codec(format!("id bound has {} bytes, expected 8", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

/// Hands out temporary ids within one transaction.
#[derive(Debug, Default)]
pub(crate) struct TemporaryIds {
    next: u64,
}

impl TemporaryIds {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next(&mut self) -> u64 {
        self.next += 1;
        TEMPORARY_BIT | self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbordb_storage::InMemoryStoreManager;

    fn manager(block_size: u64) -> (InMemoryStoreManager, IdManager) {
        let store = InMemoryStoreManager::new();
        let ids = IdManager::new(Arc::new(store.clone()), block_size);
        (store, ids)
    }

    #[test]
    fn vertex_ids_start_above_custom_range() {
        let (_, ids) = manager(10);
        let first = ids.next_vertex_id().unwrap();
        assert_eq!(first.as_u64(), MAX_CUSTOM_VERTEX_ID + 1);
        assert!(!IdManager::is_temporary(first.as_u64()));
    }

    #[test]
    fn ids_are_unique_across_blocks() {
        let (_, ids) = manager(3);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10 {
            assert!(seen.insert(ids.next_relation_id().unwrap()));
        }
    }

    #[test]
    fn second_manager_continues_after_reserved_blocks() {
        let (store, ids) = manager(5);
        let first = ids.next_schema_id().unwrap();
        assert_eq!(first, SchemaId::new(1));

        let other = IdManager::new(Arc::new(store), 5);
        let next = other.next_schema_id().unwrap();
        assert_eq!(next, SchemaId::new(6));
    }

    #[test]
    fn temporary_ids_are_marked() {
        let mut temps = TemporaryIds::new();
        let a = temps.next();
        let b = temps.next();
        assert_ne!(a, b);
        assert!(IdManager::is_temporary(a));
        assert!(IdManager::is_temporary(b));
    }

    #[test]
    fn custom_id_range() {
        assert!(IdManager::validate_custom_vertex_id(1).is_ok());
        assert!(IdManager::validate_custom_vertex_id(MAX_CUSTOM_VERTEX_ID).is_ok());
        assert!(matches!(
            IdManager::validate_custom_vertex_id(0),
            Err(CoreError::InvalidCustomId { id: 0, .. })
        ));
        assert!(IdManager::validate_custom_vertex_id(MAX_CUSTOM_VERTEX_ID + 1).is_err());
    }

    #[test]
    fn reservation_fails_on_closed_store() {
        let (store, ids) = manager(5);
        store.close().unwrap();
        assert!(matches!(
            ids.next_vertex_id(),
            Err(CoreError::Storage(_))
        ));
    }

    proptest::proptest! {
        #[test]
        fn custom_ids_never_look_temporary(id in 1..=MAX_CUSTOM_VERTEX_ID) {
            let vertex = IdManager::validate_custom_vertex_id(id).unwrap();
            proptest::prop_assert!(!IdManager::is_temporary(vertex.as_u64()));
        }
    }
}
