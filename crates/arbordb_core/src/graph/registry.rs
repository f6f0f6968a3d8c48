//! Registry of open transactions.

use super::context::OpenTransaction;
use crate::types::TransactionId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Weak references to every open transaction of a graph.
///
/// Registration and deregistration are thread-safe, and deregistering an
/// unknown or already removed id is a no-op.
#[derive(Default)]
pub(crate) struct TransactionRegistry {
    open: Mutex<HashMap<TransactionId, Weak<dyn OpenTransaction>>>,
}

impl TransactionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, id: TransactionId, transaction: Weak<dyn OpenTransaction>) {
        self.open.lock().insert(id, transaction);
    }

    /// Returns true if `id` was registered.
    pub(crate) fn deregister(&self, id: TransactionId) -> bool {
        self.open.lock().remove(&id).is_some()
    }

    /// Returns the live transactions, dropping entries whose owner is gone.
    ///
    /// The lock is released before the caller touches any transaction.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn OpenTransaction>> {
        let mut open = self.open.lock();
        open.retain(|_, weak| weak.strong_count() > 0);
        let mut live: Vec<_> = open.values().filter_map(Weak::upgrade).collect();
        live.sort_by_key(|tx| tx.id());
        live
    }

    pub(crate) fn len(&self) -> usize {
        self.open.lock().len()
    }

    pub(crate) fn contains(&self, id: TransactionId) -> bool {
        self.open.lock().contains_key(&id)
    }
}
