//! Properties and edges.

use crate::id::IdManager;
use crate::schema::{EdgeLabel, PropertyKey, RelationType};
use crate::types::{Direction, RelationId};
use crate::value::PropertyValue;
use crate::vertex::{ElementLifecycle, InternalVertex};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// A property of a vertex.
pub struct VertexProperty {
    id: AtomicU64,
    vertex: Arc<InternalVertex>,
    key: Arc<RelationType>,
    definition: PropertyKey,
    value: PropertyValue,
    lifecycle: Mutex<ElementLifecycle>,
}

impl VertexProperty {
    pub(crate) fn new(
        id: u64,
        vertex: Arc<InternalVertex>,
        (key, definition): (Arc<RelationType>, PropertyKey),
        value: PropertyValue,
        lifecycle: ElementLifecycle,
    ) -> Self {
        Self {
            id: AtomicU64::new(id),
            vertex,
            key,
            definition,
            value,
            lifecycle: Mutex::new(lifecycle),
        }
    }

    /// Returns the relation id.
    #[must_use]
    pub fn id(&self) -> RelationId {
        RelationId::new(self.id.load(Ordering::Acquire))
    }

    /// Returns the owning vertex.
    #[must_use]
    pub fn vertex(&self) -> &Arc<InternalVertex> {
        &self.vertex
    }

    /// Returns the property key.
    #[must_use]
    pub fn key(&self) -> &PropertyKey {
        &self.definition
    }

    pub(crate) fn relation_type(&self) -> &Arc<RelationType> {
        &self.key
    }

    /// Returns the property key name.
    #[must_use]
    pub fn key_name(&self) -> &str {
        self.key.name()
    }

    /// Returns the value.
    #[must_use]
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> ElementLifecycle {
        *self.lifecycle.lock()
    }

    pub(crate) fn has_temporary_id(&self) -> bool {
        IdManager::is_temporary(self.id.load(Ordering::Acquire))
    }

    pub(crate) fn assign_id(&self, id: RelationId) {
        self.id.store(id.as_u64(), Ordering::Release);
    }

    pub(crate) fn mark_removed(&self) {
        *self.lifecycle.lock() = ElementLifecycle::Removed;
    }
}

impl fmt::Debug for VertexProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexProperty")
            .field("id", &self.id())
            .field("vertex", &self.vertex.id())
            .field("key", &self.key.name())
            .field("value", &self.value)
            .finish()
    }
}

/// An edge between two vertices.
pub struct Edge {
    id: AtomicU64,
    label: Arc<RelationType>,
    definition: EdgeLabel,
    out_vertex: Arc<InternalVertex>,
    in_vertex: Arc<InternalVertex>,
    lifecycle: Mutex<ElementLifecycle>,
}

impl Edge {
    pub(crate) fn new(
        id: u64,
        (label, definition): (Arc<RelationType>, EdgeLabel),
        out_vertex: Arc<InternalVertex>,
        in_vertex: Arc<InternalVertex>,
        lifecycle: ElementLifecycle,
    ) -> Self {
        Self {
            id: AtomicU64::new(id),
            label,
            definition,
            out_vertex,
            in_vertex,
            lifecycle: Mutex::new(lifecycle),
        }
    }

    /// Returns the relation id.
    #[must_use]
    pub fn id(&self) -> RelationId {
        RelationId::new(self.id.load(Ordering::Acquire))
    }

    /// Returns the edge label.
    #[must_use]
    pub fn label(&self) -> &EdgeLabel {
        &self.definition
    }

    pub(crate) fn relation_type(&self) -> &Arc<RelationType> {
        &self.label
    }

    /// Returns the label name.
    #[must_use]
    pub fn label_name(&self) -> &str {
        self.label.name()
    }

    /// Returns the tail vertex.
    #[must_use]
    pub fn out_vertex(&self) -> &Arc<InternalVertex> {
        &self.out_vertex
    }

    /// Returns the head vertex.
    #[must_use]
    pub fn in_vertex(&self) -> &Arc<InternalVertex> {
        &self.in_vertex
    }

    /// Returns the vertex at the other end from `vertex`.
    #[must_use]
    pub fn other_vertex(&self, vertex: &Arc<InternalVertex>) -> &Arc<InternalVertex> {
        if Arc::ptr_eq(&self.out_vertex, vertex) {
            &self.in_vertex
        } else {
            &self.out_vertex
        }
    }

    /// Returns true if the edge is incident on `vertex` in `direction`.
    #[must_use]
    pub fn is_incident(&self, vertex: &Arc<InternalVertex>, direction: Direction) -> bool {
        let out = Arc::ptr_eq(&self.out_vertex, vertex);
        let inc = Arc::ptr_eq(&self.in_vertex, vertex);
        match direction {
            Direction::Out => out,
            Direction::In => inc,
            Direction::Both => out || inc,
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> ElementLifecycle {
        *self.lifecycle.lock()
    }

    pub(crate) fn has_temporary_id(&self) -> bool {
        IdManager::is_temporary(self.id.load(Ordering::Acquire))
    }

    pub(crate) fn assign_id(&self, id: RelationId) {
        self.id.store(id.as_u64(), Ordering::Release);
    }

    pub(crate) fn mark_removed(&self) {
        *self.lifecycle.lock() = ElementLifecycle::Removed;
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("id", &self.id())
            .field("label", &self.label.name())
            .field("out", &self.out_vertex.id())
            .field("in", &self.in_vertex.id())
            .finish()
    }
}

/// A property or an edge.
#[derive(Debug, Clone)]
pub enum Relation {
    /// A vertex property.
    Property(Arc<VertexProperty>),
    /// An edge.
    Edge(Arc<Edge>),
}

impl Relation {
    /// Returns the relation id.
    #[must_use]
    pub fn id(&self) -> RelationId {
        match self {
            Self::Property(property) => property.id(),
            Self::Edge(edge) => edge.id(),
        }
    }

    /// Returns the relation type.
    #[must_use]
    pub fn relation_type(&self) -> &Arc<RelationType> {
        match self {
            Self::Property(property) => property.relation_type(),
            Self::Edge(edge) => edge.relation_type(),
        }
    }

    /// Returns true if the relation touches `vertex`.
    #[must_use]
    pub fn is_incident(&self, vertex: &Arc<InternalVertex>) -> bool {
        match self {
            Self::Property(property) => Arc::ptr_eq(property.vertex(), vertex),
            Self::Edge(edge) => edge.is_incident(vertex, Direction::Both),
        }
    }

    pub(crate) fn has_temporary_id(&self) -> bool {
        match self {
            Self::Property(property) => property.has_temporary_id(),
            Self::Edge(edge) => edge.has_temporary_id(),
        }
    }

    pub(crate) fn assign_id(&self, id: RelationId) {
        match self {
            Self::Property(property) => property.assign_id(id),
            Self::Edge(edge) => edge.assign_id(id),
        }
    }

    pub(crate) fn mark_removed(&self) {
        match self {
            Self::Property(property) => property.mark_removed(),
            Self::Edge(edge) => edge.mark_removed(),
        }
    }
}

/// Weakly tracks the relations a transaction loaded from the backend.
///
/// Repeated loads of the same relation id hand out the instance a caller
/// still holds. Entries die with their last strong reference.
pub(crate) struct RelationCache {
    properties: HashMap<RelationId, Weak<VertexProperty>>,
    edges: HashMap<RelationId, Weak<Edge>>,
    prune_at: usize,
}

impl RelationCache {
    pub(crate) fn new() -> Self {
        Self {
            properties: HashMap::new(),
            edges: HashMap::new(),
            prune_at: 64,
        }
    }

    pub(crate) fn property(&self, id: RelationId) -> Option<Arc<VertexProperty>> {
        self.properties.get(&id)?.upgrade()
    }

    pub(crate) fn edge(&self, id: RelationId) -> Option<Arc<Edge>> {
        self.edges.get(&id)?.upgrade()
    }

    /// Tracks a loaded property, keeping the live instance if there is one.
    pub(crate) fn insert_property(&mut self, property: VertexProperty) -> Arc<VertexProperty> {
        let id = property.id();
        if let Some(existing) = self.property(id) {
            return existing;
        }
        let property = Arc::new(property);
        self.properties.insert(id, Arc::downgrade(&property));
        self.prune();
        property
    }

    /// Tracks a loaded edge, keeping the live instance if there is one.
    pub(crate) fn insert_edge(&mut self, edge: Edge) -> Arc<Edge> {
        let id = edge.id();
        if let Some(existing) = self.edge(id) {
            return existing;
        }
        let edge = Arc::new(edge);
        self.edges.insert(id, Arc::downgrade(&edge));
        self.prune();
        edge
    }

    fn prune(&mut self) {
        if self.properties.len() + self.edges.len() > self.prune_at {
            self.properties.retain(|_, weak| weak.strong_count() > 0);
            self.edges.retain(|_, weak| weak.strong_count() > 0);
            let live = self.properties.len() + self.edges.len();
            self.prune_at = live.saturating_mul(2).max(self.prune_at);
        }
    }
}
