//! Schema resolution inside a transaction: cache, resolver, then maker.

use arbordb_core::{
    Cardinality, CoreError, DataType, DefaultSchemaMaker, DisabledSchemaMaker, EdgeLabel,
    EdgeLabelMaker, GraphConfig, Multiplicity, PropertyKey, PropertyKeyMaker, RelationCategory,
    RelationType, SchemaId,
};
use arbordb_testkit::{CountingSchemaMaker, StubResolver, TestGraph};
use std::sync::Arc;

fn counting_graph() -> (TestGraph, Arc<CountingSchemaMaker<DefaultSchemaMaker>>) {
    let maker = Arc::new(CountingSchemaMaker::new(DefaultSchemaMaker::new()));
    let graph = TestGraph::with_config(GraphConfig::new().shared_schema_maker(maker.clone()));
    (graph, maker)
}

#[test]
fn unknown_name_creates_key_once() {
    let (graph, maker) = counting_graph();
    let tx = graph.new_transaction().unwrap();

    let first = tx
        .get_or_create_relation_type("Foo", RelationCategory::PropertyKey)
        .unwrap();
    let second = tx
        .get_or_create_relation_type("Foo", RelationCategory::PropertyKey)
        .unwrap();

    assert!(first.is_property_key());
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(maker.property_key_calls(), 1);
    tx.rollback().unwrap();
}

#[test]
fn edge_label_requested_as_key_is_a_kind_mismatch() {
    let (graph, maker) = counting_graph();
    graph.define_edge_label(EdgeLabelMaker::new("Baz")).unwrap();
    let tx = graph.new_transaction().unwrap();

    let err = tx
        .get_or_create_relation_type("Baz", RelationCategory::PropertyKey)
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::TypeKindMismatch {
            expected: RelationCategory::PropertyKey,
            actual: RelationCategory::EdgeLabel,
            ..
        }
    ));
    assert!(err.is_recoverable());
    assert_eq!(maker.total_calls(), 0);

    // Still usable
    assert!(tx.is_open());
    let v = tx.add_vertex(None).unwrap();
    tx.add_property(&v, "name", "x").unwrap();
    tx.commit().unwrap();
}

#[test]
fn foo_baz_qux_scenario() {
    let (graph, maker) = counting_graph();
    graph.define_edge_label(EdgeLabelMaker::new("Baz")).unwrap();
    let qux = graph
        .define_property_key(PropertyKeyMaker::new("Qux").data_type(DataType::String))
        .unwrap();
    let tx = graph.new_transaction().unwrap();

    let mut mismatches = 0;
    let foo = tx
        .get_or_create_relation_type("Foo", RelationCategory::PropertyKey)
        .unwrap();
    if let Err(CoreError::TypeKindMismatch { .. }) =
        tx.get_or_create_relation_type("Baz", RelationCategory::PropertyKey)
    {
        mismatches += 1;
    }
    let found = tx
        .get_or_create_relation_type("Qux", RelationCategory::PropertyKey)
        .unwrap();

    assert_eq!(foo.name(), "Foo");
    assert_eq!(found.id(), qux.id());
    assert_eq!(maker.total_calls(), 1);
    assert_eq!(mismatches, 1);

    assert!(tx.is_open());
    let v = tx.add_vertex(None).unwrap();
    tx.add_property(&v, "Foo", 1i64).unwrap();
    tx.add_property(&v, "Qux", "value").unwrap();
    tx.commit().unwrap();
    assert!(graph.schema().relation_type("Foo").is_some());
}

#[test]
fn foo_baz_qux_through_a_stub_resolver() {
    let (graph, maker) = counting_graph();
    let resolver = Arc::new(
        StubResolver::new()
            .with(RelationType::EdgeLabel(EdgeLabel {
                id: SchemaId::new(9_001),
                name: "Baz".to_string(),
                multiplicity: Multiplicity::Multi,
                directed: true,
            }))
            .with(RelationType::PropertyKey(PropertyKey {
                id: SchemaId::new(9_002),
                name: "Qux".to_string(),
                data_type: DataType::String,
                cardinality: Cardinality::Single,
            })),
    );
    let tx = graph
        .build_transaction()
        .relation_type_resolver(resolver.clone())
        .start()
        .unwrap();

    tx.get_or_create_relation_type("Foo", RelationCategory::PropertyKey)
        .unwrap();
    let err = tx
        .get_or_create_relation_type("Baz", RelationCategory::PropertyKey)
        .unwrap_err();
    assert!(matches!(err, CoreError::TypeKindMismatch { .. }));
    let qux = tx
        .get_or_create_relation_type("Qux", RelationCategory::PropertyKey)
        .unwrap();
    assert_eq!(qux.id(), SchemaId::new(9_002));
    assert_eq!(maker.total_calls(), 1);

    // Resolved types are cached locally
    let lookups = resolver.lookups();
    tx.get_or_create_relation_type("Qux", RelationCategory::PropertyKey)
        .unwrap();
    tx.get_or_create_relation_type("Baz", RelationCategory::EdgeLabel)
        .unwrap();
    assert_eq!(resolver.lookups(), lookups);
    tx.rollback().unwrap();
}

#[test]
fn disabled_maker_reports_creation_disallowed() {
    let graph = TestGraph::with_config(GraphConfig::new().auto_schema_maker(DisabledSchemaMaker));
    let tx = graph.new_transaction().unwrap();

    let err = tx
        .get_or_create_relation_type("missing", RelationCategory::EdgeLabel)
        .unwrap_err();
    assert!(matches!(err, CoreError::SchemaCreationDisallowed { .. }));
    assert!(tx.is_open());
    assert!(!tx.contains_relation_type("missing").unwrap());
    tx.rollback().unwrap();
}

#[test]
fn read_only_transactions_never_reach_the_maker() {
    let (graph, maker) = counting_graph();
    graph.define_property_key(PropertyKeyMaker::new("Bar")).unwrap();
    let tx = graph.build_transaction().read_only(true).start().unwrap();

    let err = tx
        .get_or_create_relation_type("Foo", RelationCategory::PropertyKey)
        .unwrap_err();
    assert!(matches!(err, CoreError::ReadOnly));
    assert_eq!(maker.total_calls(), 0);

    // Existing types still resolve
    let bar = tx
        .get_or_create_relation_type("Bar", RelationCategory::PropertyKey)
        .unwrap();
    assert!(bar.is_property_key());
    assert!(tx.is_open());
    tx.commit().unwrap();
}

#[test]
fn created_types_are_published_only_on_commit() {
    let graph = TestGraph::memory();

    let tx = graph.new_transaction().unwrap();
    tx.get_or_create_edge_label("knows").unwrap();
    assert!(graph.schema().relation_type("knows").is_none());
    tx.rollback().unwrap();
    assert!(graph.schema().relation_type("knows").is_none());

    let tx = graph.new_transaction().unwrap();
    let created = tx.get_or_create_edge_label("knows").unwrap();
    tx.commit().unwrap();
    let published = graph.schema().relation_type("knows").unwrap();
    assert_eq!(published.id(), created.id());
}

#[test]
fn concurrent_creation_of_the_same_name_conflicts() {
    let graph = TestGraph::memory();
    let first = graph.new_transaction().unwrap();
    let second = graph.new_transaction().unwrap();

    first.get_or_create_edge_label("likes").unwrap();
    second.get_or_create_edge_label("likes").unwrap();

    first.commit().unwrap();
    let err = second.commit().unwrap_err();
    assert!(matches!(err, CoreError::SchemaConflict { .. }));
    assert!(!second.is_open());
    assert_eq!(graph.stats().commit_failures(), 1);
}
