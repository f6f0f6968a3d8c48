//! Interfaces between a graph and its transactions.

use crate::config::GraphConfig;
use crate::error::CoreResult;
use crate::id::IdManager;
use crate::index::IndexSelectionStrategy;
use crate::schema::SchemaRegistry;
use crate::serialize::{DataSerializer, EdgeSerializer, IndexSerializer};
use crate::stats::GraphStats;
use crate::types::{SchemaId, TransactionId};
use crate::vertex::InternalVertex;
use arbordb_storage::{StoreTransaction, StoreTxConfig};
use std::sync::{Arc, Weak};

/// What a transaction needs from the graph that owns it.
///
/// [`crate::Graph`] is the production implementation. Transactions hold it
/// as `Arc<dyn GraphContext>`, so tests can wrap or replace any part.
pub trait GraphContext: Send + Sync {
    /// Graph configuration.
    fn configuration(&self) -> &GraphConfig;

    /// Value codec.
    fn data_serializer(&self) -> &DataSerializer;

    /// Adjacency row layout.
    fn edge_serializer(&self) -> &EdgeSerializer;

    /// Composite index entry layout.
    fn index_serializer(&self) -> &IndexSerializer;

    /// Id allocator.
    fn id_manager(&self) -> &IdManager;

    /// Index selection strategy.
    fn index_selector(&self) -> &dyn IndexSelectionStrategy;

    /// Committed schema.
    fn schema(&self) -> &SchemaRegistry;

    /// Shared counters.
    fn stats(&self) -> &GraphStats;

    /// Whether the graph accepts new transactions.
    fn is_open(&self) -> bool;

    /// Begins the backend transaction a graph transaction will own.
    fn begin_backend_transaction(
        &self,
        config: &StoreTxConfig,
    ) -> CoreResult<Box<dyn StoreTransaction>>;

    /// Allocates a transaction id.
    fn next_transaction_id(&self) -> TransactionId;

    /// Adds an open transaction to the registry.
    fn register_transaction(
        &self,
        id: TransactionId,
        transaction: Weak<dyn OpenTransaction>,
    ) -> CoreResult<()>;

    /// Removes a closed transaction from the registry.
    ///
    /// Called exactly once per registered transaction.
    fn close_transaction(&self, id: TransactionId);
}

/// A registered transaction, as seen by the graph and other subsystems.
///
/// Every method is safe to call after the transaction has closed:
/// lookups return nothing and expiry does nothing.
pub trait OpenTransaction: Send + Sync {
    /// Transaction id.
    fn id(&self) -> TransactionId;

    /// Whether the transaction is still open.
    fn is_open(&self) -> bool;

    /// Returns the cached vertex with `id`, loading it if necessary.
    fn get_internal_vertex(&self, id: u64) -> Option<Arc<InternalVertex>>;

    /// Drops the cached schema element with `id`.
    fn expire_schema_element(&self, id: SchemaId);

    /// Rolls the transaction back because the graph is shutting down.
    fn rollback_on_shutdown(&self) -> CoreResult<()>;
}
