//! The shared core of a transaction.

use super::state::OpenState;
use crate::config::TransactionConfig;
use crate::error::{CoreError, CoreResult};
use crate::graph::{GraphContext, OpenTransaction};
use crate::schema::RelationTypeResolver;
use crate::types::{SchemaId, TransactionId};
use crate::vertex::InternalVertex;
use arbordb_storage::StoreTransaction;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

/// A transaction as registered with its graph.
///
/// `state` is `Some` exactly while the transaction is open. Closing takes
/// the state out, so every path that closes the transaction observes the
/// transition once.
pub(crate) struct TransactionInner {
    id: TransactionId,
    pub(super) graph: Arc<dyn GraphContext>,
    pub(super) config: TransactionConfig,
    resolver: Option<Arc<dyn RelationTypeResolver>>,
    owner: Option<ThreadId>,
    state: Mutex<Option<OpenState>>,
    deregistered: AtomicBool,
    start_time: u64,
}

impl TransactionInner {
    pub(super) fn new(
        id: TransactionId,
        graph: Arc<dyn GraphContext>,
        config: TransactionConfig,
        resolver: Option<Arc<dyn RelationTypeResolver>>,
        backend: Box<dyn StoreTransaction>,
    ) -> Self {
        let owner = config.is_single_threaded().then(|| thread::current().id());
        let start_time = config.timestamp_provider().now();
        let state = OpenState::new(backend, &config);
        Self {
            id,
            graph,
            config,
            resolver,
            owner,
            state: Mutex::new(Some(state)),
            deregistered: AtomicBool::new(false),
            start_time,
        }
    }

    pub(super) fn id(&self) -> TransactionId {
        self.id
    }

    pub(super) fn start_time(&self) -> u64 {
        self.start_time
    }

    pub(super) fn is_open(&self) -> bool {
        self.state.lock().is_some()
    }

    /// The resolver consulted on a schema cache miss.
    pub(super) fn resolver(&self) -> &dyn RelationTypeResolver {
        match &self.resolver {
            Some(resolver) => resolver.as_ref(),
            None => self.graph.schema(),
        }
    }

    pub(super) fn check_thread(&self) -> CoreResult<()> {
        match self.owner {
            Some(owner) if owner != thread::current().id() => Err(CoreError::ThreadConfinement),
            _ => Ok(()),
        }
    }

    /// Runs `f` against the open state on behalf of a client.
    pub(super) fn read<T>(&self, f: impl FnOnce(&mut OpenState) -> CoreResult<T>) -> CoreResult<T> {
        self.check_thread()?;
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(CoreError::TransactionClosed)?;
        f(state)
    }

    /// Like [`read`](Self::read), but refuses read-only transactions.
    pub(super) fn write<T>(&self, f: impl FnOnce(&mut OpenState) -> CoreResult<T>) -> CoreResult<T> {
        self.check_thread()?;
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(CoreError::TransactionClosed)?;
        if self.config.is_read_only() {
            return Err(CoreError::ReadOnly);
        }
        f(state)
    }

    /// Closes the transaction, handing its state to the caller.
    pub(super) fn take_state(&self) -> CoreResult<OpenState> {
        self.state.lock().take().ok_or(CoreError::TransactionClosed)
    }

    /// Rolls back. Callable from any thread.
    pub(super) fn rollback(&self) -> CoreResult<()> {
        let mut state = self.take_state()?;
        let result = state.backend.rollback().map_err(CoreError::from);
        drop(state);

        self.graph.stats().record_rollback();
        self.deregister();
        match &result {
            Ok(()) => debug!(transaction = %self.id, "rolled back transaction"),
            Err(err) => warn!(transaction = %self.id, error = %err, "backend rollback failed"),
        }
        result
    }

    /// Releases a transaction that never made it into the registry.
    pub(super) fn abandon(&self) {
        self.deregistered.store(true, Ordering::Release);
        if let Ok(mut state) = self.take_state() {
            if let Err(err) = state.backend.rollback() {
                warn!(transaction = %self.id, error = %err, "rollback of abandoned transaction failed");
            }
        }
    }

    /// Removes the transaction from the graph registry, once.
    pub(super) fn deregister(&self) {
        if !self.deregistered.swap(true, Ordering::AcqRel) {
            self.graph.close_transaction(self.id);
        }
    }
}

impl OpenTransaction for TransactionInner {
    fn id(&self) -> TransactionId {
        self.id
    }

    fn is_open(&self) -> bool {
        TransactionInner::is_open(self)
    }

    fn get_internal_vertex(&self, id: u64) -> Option<Arc<InternalVertex>> {
        let mut guard = self.state.lock();
        let state = guard.as_mut()?;
        match self.vertex(state, id, self.config.verify_internal_vertex_existence()) {
            Ok(vertex) => vertex,
            Err(err) => {
                warn!(transaction = %self.id, vertex = id, error = %err, "vertex lookup failed");
                None
            }
        }
    }

    fn expire_schema_element(&self, id: SchemaId) {
        if let Some(state) = self.state.lock().as_mut() {
            if state.schema.expire(id) {
                debug!(transaction = %self.id, schema_id = %id, "expired cached schema element");
            }
        }
    }

    fn rollback_on_shutdown(&self) -> CoreResult<()> {
        self.rollback()
    }
}
