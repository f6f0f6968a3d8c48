//! The in-memory vertex.

use super::ElementLifecycle;
use crate::id::IdManager;
use crate::schema::VertexLabel;
use crate::types::{TransactionId, VertexId};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A vertex as seen by one transaction.
///
/// The id starts out temporary for vertices created without an id and is
/// replaced by a permanent one when ids are assigned. The vertex keeps its
/// last id after the transaction closes.
pub struct InternalVertex {
    id: AtomicU64,
    label: Arc<VertexLabel>,
    lifecycle: Mutex<ElementLifecycle>,
    transaction: TransactionId,
}

impl InternalVertex {
    pub(crate) fn new(
        id: u64,
        label: Arc<VertexLabel>,
        lifecycle: ElementLifecycle,
        transaction: TransactionId,
    ) -> Self {
        Self {
            id: AtomicU64::new(id),
            label,
            lifecycle: Mutex::new(lifecycle),
            transaction,
        }
    }

    /// Returns the current id.
    #[must_use]
    pub fn id(&self) -> VertexId {
        VertexId::new(self.id.load(Ordering::Acquire))
    }

    /// Returns true while the vertex only has a temporary id.
    #[must_use]
    pub fn has_temporary_id(&self) -> bool {
        IdManager::is_temporary(self.id.load(Ordering::Acquire))
    }

    /// Returns the vertex label.
    #[must_use]
    pub fn label(&self) -> &VertexLabel {
        &self.label
    }

    pub(crate) fn label_arc(&self) -> &Arc<VertexLabel> {
        &self.label
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> ElementLifecycle {
        *self.lifecycle.lock()
    }

    /// Returns true if the vertex was created in its transaction.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.lifecycle().is_new()
    }

    /// Returns true if the vertex was removed in its transaction.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.lifecycle().is_removed()
    }

    /// Returns the transaction this vertex belongs to.
    #[must_use]
    pub const fn transaction(&self) -> TransactionId {
        self.transaction
    }

    pub(crate) fn assign_id(&self, id: VertexId) {
        self.id.store(id.as_u64(), Ordering::Release);
    }

    pub(crate) fn mark_modified(&self) {
        let mut lifecycle = self.lifecycle.lock();
        *lifecycle = lifecycle.modified();
    }

    pub(crate) fn mark_removed(&self) {
        *self.lifecycle.lock() = ElementLifecycle::Removed;
    }
}

impl fmt::Debug for InternalVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalVertex")
            .field("id", &self.id())
            .field("label", &self.label.name)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

impl fmt::Display for InternalVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SchemaId;

    fn label() -> Arc<VertexLabel> {
        Arc::new(VertexLabel {
            id: SchemaId::new(0),
            name: "vertex".to_string(),
        })
    }

    #[test]
    fn id_assignment_replaces_temporary_id() {
        let vertex = InternalVertex::new(
            1 << 63 | 1,
            label(),
            ElementLifecycle::New,
            TransactionId::new(1),
        );
        assert!(vertex.has_temporary_id());
        vertex.assign_id(VertexId::new(500));
        assert!(!vertex.has_temporary_id());
        assert_eq!(vertex.id(), VertexId::new(500));
    }

    #[test]
    fn lifecycle_transitions() {
        let vertex = InternalVertex::new(7, label(), ElementLifecycle::Loaded, TransactionId::new(1));
        vertex.mark_modified();
        assert_eq!(vertex.lifecycle(), ElementLifecycle::Modified);
        vertex.mark_removed();
        assert!(vertex.is_removed());
        vertex.mark_modified();
        assert!(vertex.is_removed());
    }
}
