//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data that respects the
//! naming and value rules of the graph.

use arbordb_core::PropertyValue;
use proptest::prelude::*;

/// Strategy for generating valid schema element names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating names the schema rejects.
pub fn invalid_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        prop::string::string_regex("~[a-z]{0,8}").expect("Invalid regex"),
    ]
}

/// Strategy for generating property values of every data type.
pub fn property_value_strategy() -> impl Strategy<Value = PropertyValue> {
    prop_oneof![
        any::<bool>().prop_map(PropertyValue::from),
        any::<i64>().prop_map(PropertyValue::from),
        (-1.0e9..1.0e9f64).prop_map(PropertyValue::from),
        prop::string::string_regex("[a-z0-9 ]{0,24}")
            .expect("Invalid regex")
            .prop_map(PropertyValue::from),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(PropertyValue::from),
    ]
}

/// Strategy for generating custom vertex ids, valid or not.
pub fn custom_id_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        4 => 1..=arbordb_core::MAX_CUSTOM_VERTEX_ID,
        1 => Just(0u64),
        1 => (arbordb_core::MAX_CUSTOM_VERTEX_ID + 1)..u64::MAX,
    ]
}

/// One step of a generated transaction.
///
/// Vertex operands are indexes into the vertices created so far; they are
/// taken modulo the number of vertices when applied.
#[derive(Debug, Clone)]
pub enum GraphOperation {
    /// Create a vertex.
    AddVertex,
    /// Set a property.
    AddProperty {
        /// Target vertex.
        vertex: usize,
        /// Key name.
        key: String,
        /// Value.
        value: PropertyValue,
    },
    /// Connect two vertices.
    AddEdge {
        /// Out vertex.
        out_vertex: usize,
        /// In vertex.
        in_vertex: usize,
        /// Label name.
        label: String,
    },
    /// Remove a vertex.
    RemoveVertex {
        /// Target vertex.
        vertex: usize,
    },
}

/// Strategy for generating a single graph operation.
///
/// Keys and labels come from disjoint small pools so generated operations
/// collide on names and never mix kinds.
pub fn graph_operation_strategy() -> impl Strategy<Value = GraphOperation> {
    let key = prop::sample::select(vec!["name", "age", "tag", "score"]).prop_map(String::from);
    let label = prop::sample::select(vec!["knows", "created", "likes"]).prop_map(String::from);
    prop_oneof![
        3 => Just(GraphOperation::AddVertex),
        3 => (any::<usize>(), key, any::<i64>()).prop_map(|(vertex, key, value)| {
            GraphOperation::AddProperty {
                vertex,
                key,
                value: PropertyValue::from(value),
            }
        }),
        2 => (any::<usize>(), any::<usize>(), label).prop_map(|(out_vertex, in_vertex, label)| {
            GraphOperation::AddEdge {
                out_vertex,
                in_vertex,
                label,
            }
        }),
        1 => any::<usize>().prop_map(|vertex| GraphOperation::RemoveVertex { vertex }),
    ]
}

/// Strategy for generating a batch of graph operations.
pub fn graph_operations_strategy(max_ops: usize) -> impl Strategy<Value = Vec<GraphOperation>> {
    prop::collection::vec(graph_operation_strategy(), 1..=max_ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbordb_core::validate_name;

    proptest! {
        #[test]
        fn generated_names_are_valid(name in name_strategy()) {
            prop_assert!(validate_name(&name).is_ok());
        }

        #[test]
        fn invalid_names_are_rejected(name in invalid_name_strategy()) {
            prop_assert!(validate_name(&name).is_err());
        }

        #[test]
        fn operations_are_bounded(ops in graph_operations_strategy(20)) {
            prop_assert!(!ops.is_empty());
            prop_assert!(ops.len() <= 20);
        }
    }
}
