//! Composite indexes and index selection.
//!
//! A composite index maps the values of a fixed list of property keys to
//! the vertices holding them. It answers a query only when the query has an
//! equality condition on every one of its keys.
//!
//! Index selection is advisory: when no index applies, or an index lookup
//! yields nothing usable, the query falls back to a full scan.

mod cache;
mod selection;

pub(crate) use cache::IndexCache;
pub use selection::{
    IndexSelection, IndexSelectionStrategy, ThresholdBasedIndexSelectionStrategy,
    DEFAULT_INDEX_SELECTION_THRESHOLD, MAX_INDEX_SELECTION_THRESHOLD,
};

use crate::schema::RelationType;
use crate::types::SchemaId;
use crate::value::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A composite index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Schema id.
    pub id: SchemaId,
    /// Unique name.
    pub name: String,
    /// Indexed property keys, in index order.
    pub keys: Vec<SchemaId>,
    /// Whether at most one vertex may hold each combination of values.
    pub unique: bool,
}

impl IndexDefinition {
    /// Returns true if every key of the index is in `keys`.
    #[must_use]
    pub fn is_covered_by(&self, keys: &[SchemaId]) -> bool {
        self.keys.iter().all(|key| keys.contains(key))
    }

    /// Returns true if `key` is one of the indexed keys.
    #[must_use]
    pub fn indexes_key(&self, key: SchemaId) -> bool {
        self.keys.contains(&key)
    }
}

/// Every value combination `index` holds for a vertex whose property
/// values are `values`.
///
/// Empty if the vertex lacks any indexed key. Multi-valued keys contribute
/// one entry per combination.
pub(crate) fn entry_values(
    index: &IndexDefinition,
    values: &HashMap<SchemaId, Vec<PropertyValue>>,
) -> Vec<Vec<PropertyValue>> {
    let mut combinations: Vec<Vec<PropertyValue>> = vec![Vec::new()];
    for key in &index.keys {
        let Some(key_values) = values.get(key).filter(|v| !v.is_empty()) else {
            return Vec::new();
        };
        combinations = combinations
            .into_iter()
            .flat_map(|prefix| {
                key_values.iter().map(move |value| {
                    let mut combination = prefix.clone();
                    combination.push(value.clone());
                    combination
                })
            })
            .collect();
    }
    let mut unique: Vec<Vec<PropertyValue>> = Vec::with_capacity(combinations.len());
    for combination in combinations {
        if !unique.contains(&combination) {
            unique.push(combination);
        }
    }
    unique
}

/// The schema as one transaction sees it.
///
/// Includes relation types the transaction created but has not committed.
pub trait SchemaInspector {
    /// Looks up a relation type by id.
    fn relation_type_by_id(&self, id: SchemaId) -> Option<Arc<RelationType>>;

    /// Returns every composite index.
    fn indexes(&self) -> Vec<Arc<IndexDefinition>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_requires_every_key() {
        let index = IndexDefinition {
            id: SchemaId::new(10),
            name: "byNameAge".to_string(),
            keys: vec![SchemaId::new(1), SchemaId::new(2)],
            unique: false,
        };
        assert!(index.is_covered_by(&[SchemaId::new(2), SchemaId::new(1), SchemaId::new(3)]));
        assert!(!index.is_covered_by(&[SchemaId::new(1)]));
        assert!(index.indexes_key(SchemaId::new(2)));
    }

    #[test]
    fn entry_values_combine_multi_valued_keys() {
        let index = IndexDefinition {
            id: SchemaId::new(10),
            name: "byTagAge".to_string(),
            keys: vec![SchemaId::new(1), SchemaId::new(2)],
            unique: false,
        };
        let mut values = HashMap::new();
        values.insert(
            SchemaId::new(1),
            vec![PropertyValue::from("a"), PropertyValue::from("b"), PropertyValue::from("a")],
        );
        values.insert(SchemaId::new(2), vec![PropertyValue::from(30)]);

        let entries = entry_values(&index, &values);
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&vec![PropertyValue::from("b"), PropertyValue::from(30)]));

        values.remove(&SchemaId::new(2));
        assert!(entry_values(&index, &values).is_empty());
    }
}
