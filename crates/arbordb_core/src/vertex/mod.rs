//! Vertices and the per-transaction vertex cache.
//!
//! A transaction hands out at most one [`InternalVertex`] per vertex id.
//! Identity is pointer identity of the `Arc`, so two lookups of the same id
//! within a transaction satisfy `Arc::ptr_eq`.

mod cache;
mod internal;

pub(crate) use cache::VertexCache;
pub use internal::InternalVertex;

/// Lifecycle of a vertex or relation within a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementLifecycle {
    /// Created in this transaction, not yet persisted.
    New,
    /// Loaded from the backend, unchanged.
    Loaded,
    /// Loaded from the backend and changed in this transaction.
    Modified,
    /// Removed in this transaction.
    Removed,
}

impl ElementLifecycle {
    /// Returns true for elements created in this transaction.
    #[must_use]
    pub const fn is_new(self) -> bool {
        matches!(self, Self::New)
    }

    /// Returns true for removed elements.
    #[must_use]
    pub const fn is_removed(self) -> bool {
        matches!(self, Self::Removed)
    }

    /// Returns true if the element has changes that commit must persist.
    #[must_use]
    pub const fn is_dirty(self) -> bool {
        !matches!(self, Self::Loaded)
    }

    /// The state after a relation of the element changed.
    #[must_use]
    pub const fn modified(self) -> Self {
        match self {
            Self::Loaded => Self::Modified,
            other => other,
        }
    }
}
