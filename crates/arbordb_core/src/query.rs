//! Vertex queries.

use crate::value::PropertyValue;

/// A conjunctive vertex query.
///
/// Matches vertices that have every listed property value and, if set, the
/// given label. Results are ordered by vertex id.
///
/// ```rust
/// use arbordb_core::GraphQuery;
///
/// let query = GraphQuery::new().has("name", "marko").has_label("person").limit(10);
/// assert_eq!(query.conditions().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphQuery {
    conditions: Vec<(String, PropertyValue)>,
    label: Option<String>,
    limit: Option<usize>,
}

impl GraphQuery {
    /// Creates a query matching every vertex.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires property `key` to hold `value`.
    #[must_use]
    pub fn has(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.conditions.push((key.into(), value.into()));
        self
    }

    /// Requires the vertex label `label`.
    #[must_use]
    pub fn has_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Property conditions, in insertion order.
    #[must_use]
    pub fn conditions(&self) -> &[(String, PropertyValue)] {
        &self.conditions
    }

    /// Required label.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Result cap.
    #[must_use]
    pub const fn result_limit(&self) -> Option<usize> {
        self.limit
    }
}
