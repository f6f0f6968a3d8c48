//! Index selection strategies.

use super::{IndexDefinition, SchemaInspector};
use crate::types::SchemaId;
use std::fmt;
use std::sync::Arc;

/// Candidate count up to which every combination of indexes is tried.
pub const DEFAULT_INDEX_SELECTION_THRESHOLD: usize = 10;

/// Largest accepted threshold; exhaustive search costs `2^n` subsets.
pub const MAX_INDEX_SELECTION_THRESHOLD: usize = 16;

/// Indexes chosen for a query.
#[derive(Debug, Clone, Default)]
pub struct IndexSelection {
    /// Indexes to intersect, in lookup order.
    pub indexes: Vec<Arc<IndexDefinition>>,
    /// Condition keys answered by the indexes.
    pub covered: Vec<SchemaId>,
}

impl IndexSelection {
    /// Returns true if no index applies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    fn from_indexes(indexes: Vec<Arc<IndexDefinition>>) -> Self {
        let mut covered: Vec<SchemaId> = indexes
            .iter()
            .flat_map(|index| index.keys.iter().copied())
            .collect();
        covered.sort_unstable();
        covered.dedup();
        Self { indexes, covered }
    }
}

/// Picks the indexes that answer a query.
///
/// Shared by all transactions of a graph.
pub trait IndexSelectionStrategy: Send + Sync + fmt::Debug {
    /// Selects indexes for a query with equality conditions on `keys`.
    ///
    /// `schema` is the querying transaction's view, so indexes over keys
    /// the transaction cannot see are skipped.
    fn select(&self, keys: &[SchemaId], schema: &dyn SchemaInspector) -> IndexSelection;
}

/// Exhaustive search over small candidate sets, greedy above a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdBasedIndexSelectionStrategy {
    threshold: usize,
}

impl Default for ThresholdBasedIndexSelectionStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_SELECTION_THRESHOLD)
    }
}

impl ThresholdBasedIndexSelectionStrategy {
    /// Creates a strategy with the given exhaustive-search threshold,
    /// clamped to [`MAX_INDEX_SELECTION_THRESHOLD`].
    #[must_use]
    pub const fn new(threshold: usize) -> Self {
        let threshold = if threshold > MAX_INDEX_SELECTION_THRESHOLD {
            MAX_INDEX_SELECTION_THRESHOLD
        } else {
            threshold
        };
        Self { threshold }
    }

    /// Returns the threshold.
    #[must_use]
    pub const fn threshold(&self) -> usize {
        self.threshold
    }

    fn candidates(
        keys: &[SchemaId],
        schema: &dyn SchemaInspector,
    ) -> Vec<Arc<IndexDefinition>> {
        schema
            .indexes()
            .into_iter()
            .filter(|index| !index.keys.is_empty() && index.is_covered_by(keys))
            .filter(|index| {
                index
                    .keys
                    .iter()
                    .all(|key| schema.relation_type_by_id(*key).is_some())
            })
            .collect()
    }

    /// Tries every subset and keeps the best one.
    fn exhaustive(candidates: &[Arc<IndexDefinition>]) -> Vec<Arc<IndexDefinition>> {
        let mut best: Vec<Arc<IndexDefinition>> = Vec::new();
        let mut best_score = Score::default();
        let subsets = 1u64 << candidates.len();
        for mask in 1..subsets {
            let chosen: Vec<_> = candidates
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, index)| Arc::clone(index))
                .collect();
            let score = Score::of(&chosen);
            if score > best_score {
                best_score = score;
                best = chosen;
            }
        }
        best
    }

    /// Repeatedly takes the index covering the most uncovered keys.
    fn greedy(candidates: &[Arc<IndexDefinition>]) -> Vec<Arc<IndexDefinition>> {
        let mut covered: Vec<SchemaId> = Vec::new();
        let mut chosen: Vec<Arc<IndexDefinition>> = Vec::new();
        loop {
            let next = candidates
                .iter()
                .filter(|index| !chosen.iter().any(|c| c.id == index.id))
                .map(|index| {
                    let gain = index.keys.iter().filter(|k| !covered.contains(k)).count();
                    (gain, index.unique, index)
                })
                .filter(|(gain, _, _)| *gain > 0)
                .max_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)).then(b.2.id.cmp(&a.2.id)));
            match next {
                Some((_, _, index)) => {
                    covered.extend(index.keys.iter().copied());
                    chosen.push(Arc::clone(index));
                }
                None => break,
            }
        }
        chosen
    }
}

impl IndexSelectionStrategy for ThresholdBasedIndexSelectionStrategy {
    fn select(&self, keys: &[SchemaId], schema: &dyn SchemaInspector) -> IndexSelection {
        let candidates = Self::candidates(keys, schema);
        if candidates.is_empty() {
            return IndexSelection::default();
        }
        let chosen = if candidates.len() <= self.threshold {
            Self::exhaustive(&candidates)
        } else {
            Self::greedy(&candidates)
        };
        tracing::trace!(
            candidates = candidates.len(),
            chosen = chosen.len(),
            "selected indexes"
        );
        IndexSelection::from_indexes(chosen)
    }
}

/// Ranking of an index combination: more covered keys first, then a
/// unique index, then fewer lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
struct Score {
    covered: usize,
    unique: bool,
    fewer_lookups: std::cmp::Reverse<usize>,
}

impl Score {
    fn of(indexes: &[Arc<IndexDefinition>]) -> Self {
        let mut keys: Vec<SchemaId> = indexes
            .iter()
            .flat_map(|index| index.keys.iter().copied())
            .collect();
        keys.sort_unstable();
        keys.dedup();
        Self {
            covered: keys.len(),
            unique: indexes.iter().any(|index| index.unique),
            fewer_lookups: std::cmp::Reverse(indexes.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Cardinality, DataType, PropertyKey, RelationType};

    struct Inspector {
        keys: Vec<SchemaId>,
        indexes: Vec<Arc<IndexDefinition>>,
    }

    impl SchemaInspector for Inspector {
        fn relation_type_by_id(&self, id: SchemaId) -> Option<Arc<RelationType>> {
            self.keys.contains(&id).then(|| {
                Arc::new(RelationType::PropertyKey(PropertyKey {
                    id,
                    name: format!("k{}", id.as_u64()),
                    data_type: DataType::Object,
                    cardinality: Cardinality::Single,
                }))
            })
        }

        fn indexes(&self) -> Vec<Arc<IndexDefinition>> {
            self.indexes.clone()
        }
    }

    fn index(id: u64, keys: &[u64], unique: bool) -> Arc<IndexDefinition> {
        Arc::new(IndexDefinition {
            id: SchemaId::new(id),
            name: format!("i{id}"),
            keys: keys.iter().copied().map(SchemaId::new).collect(),
            unique,
        })
    }

    fn ids(keys: &[u64]) -> Vec<SchemaId> {
        keys.iter().copied().map(SchemaId::new).collect()
    }

    #[test]
    fn no_applicable_index() {
        let inspector = Inspector {
            keys: ids(&[1, 2]),
            indexes: vec![index(10, &[1, 2], false)],
        };
        let strategy = ThresholdBasedIndexSelectionStrategy::default();
        assert!(strategy.select(&ids(&[1]), &inspector).is_empty());
    }

    #[test]
    fn prefers_wider_coverage() {
        let inspector = Inspector {
            keys: ids(&[1, 2]),
            indexes: vec![index(10, &[1], false), index(11, &[1, 2], false)],
        };
        let strategy = ThresholdBasedIndexSelectionStrategy::default();
        let selection = strategy.select(&ids(&[1, 2]), &inspector);
        assert_eq!(selection.indexes.len(), 1);
        assert_eq!(selection.indexes[0].id, SchemaId::new(11));
        assert_eq!(selection.covered, ids(&[1, 2]));
    }

    #[test]
    fn prefers_unique_index_on_tie() {
        let inspector = Inspector {
            keys: ids(&[1]),
            indexes: vec![index(10, &[1], false), index(11, &[1], true)],
        };
        let strategy = ThresholdBasedIndexSelectionStrategy::default();
        let selection = strategy.select(&ids(&[1]), &inspector);
        assert_eq!(selection.indexes.len(), 1);
        assert!(selection.indexes[0].unique);
    }

    #[test]
    fn skips_indexes_over_invisible_keys() {
        let inspector = Inspector {
            keys: ids(&[1]),
            indexes: vec![index(10, &[1, 2], false)],
        };
        let strategy = ThresholdBasedIndexSelectionStrategy::default();
        assert!(strategy.select(&ids(&[1, 2]), &inspector).is_empty());
    }

    #[test]
    fn large_thresholds_are_clamped() {
        let strategy = ThresholdBasedIndexSelectionStrategy::new(40);
        assert_eq!(strategy.threshold(), MAX_INDEX_SELECTION_THRESHOLD);
        assert_eq!(ThresholdBasedIndexSelectionStrategy::new(3).threshold(), 3);

        let keys: Vec<u64> = (1..=24).collect();
        let indexes: Vec<_> = keys.iter().map(|key| index(100 + key, &[*key], false)).collect();
        let inspector = Inspector {
            keys: ids(&keys),
            indexes,
        };
        let selection = strategy.select(&ids(&keys), &inspector);
        assert_eq!(selection.covered.len(), 24);
    }

    #[test]
    fn greedy_and_exhaustive_cover_the_same_keys() {
        let indexes = vec![
            index(10, &[1], false),
            index(11, &[2], false),
            index(12, &[3], false),
            index(13, &[2, 3], false),
        ];
        let inspector = Inspector {
            keys: ids(&[1, 2, 3]),
            indexes,
        };
        let query = ids(&[1, 2, 3]);
        let exhaustive = ThresholdBasedIndexSelectionStrategy::new(10).select(&query, &inspector);
        let greedy = ThresholdBasedIndexSelectionStrategy::new(0).select(&query, &inspector);
        assert_eq!(exhaustive.covered, query);
        assert_eq!(greedy.covered, query);
        assert_eq!(exhaustive.indexes.len(), 2);
    }
}
