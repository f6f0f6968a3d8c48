//! Schema administration and its effect on open transactions.

use arbordb_core::{
    Cardinality, CoreError, DataType, EdgeLabelMaker, GraphConfig, Multiplicity, PropertyKeyMaker,
    VertexLabelMaker,
};
use arbordb_testkit::TestGraph;

#[test]
fn defined_types_are_visible_to_new_transactions() {
    let graph = TestGraph::memory();
    graph
        .define_property_key(
            PropertyKeyMaker::new("tags")
                .data_type(DataType::String)
                .cardinality(Cardinality::Set),
        )
        .unwrap();
    graph
        .define_edge_label(EdgeLabelMaker::new("mother").multiplicity(Multiplicity::ManyToOne))
        .unwrap();
    graph.define_vertex_label(VertexLabelMaker::new("god")).unwrap();

    let tx = graph.new_transaction().unwrap();
    let tags = tx.get_relation_type("tags").unwrap().unwrap();
    assert_eq!(tags.as_property_key().unwrap().cardinality, Cardinality::Set);
    assert!(tx.get_vertex_label("god").unwrap().is_some());

    let a = tx.add_vertex(Some("god")).unwrap();
    let b = tx.add_vertex(Some("god")).unwrap();
    let c = tx.add_vertex(Some("god")).unwrap();
    tx.add_edge(&a, &b, "mother").unwrap();
    let err = tx.add_edge(&a, &c, "mother").unwrap_err();
    assert!(matches!(err, CoreError::MultiplicityViolation { .. }));

    let err = tx.add_property(&a, "tags", 5i64).unwrap_err();
    assert!(matches!(err, CoreError::DataTypeMismatch { .. }));
    tx.rollback().unwrap();
}

#[test]
fn duplicate_definitions_conflict() {
    let graph = TestGraph::memory();
    graph.define_edge_label(EdgeLabelMaker::new("knows")).unwrap();
    let err = graph
        .define_property_key(PropertyKeyMaker::new("knows"))
        .unwrap_err();
    assert!(matches!(err, CoreError::SchemaConflict { .. }));
    assert!(matches!(
        graph.define_vertex_label(VertexLabelMaker::new("vertex")),
        Err(CoreError::SchemaConflict { .. })
    ));
    assert!(graph.define_edge_label(EdgeLabelMaker::new("~hidden")).is_err());
}

#[test]
fn rename_expires_cached_types_in_open_transactions() {
    let graph = TestGraph::memory();
    let knows = graph.define_edge_label(EdgeLabelMaker::new("knows")).unwrap();

    let tx = graph.new_transaction().unwrap();
    assert!(tx.contains_relation_type("knows").unwrap());

    let renamed = graph.rename_relation_type("knows", "befriends").unwrap();
    assert_eq!(renamed.id(), knows.id());

    assert!(!tx.contains_relation_type("knows").unwrap());
    let found = tx.get_relation_type("befriends").unwrap().unwrap();
    assert_eq!(found.id(), knows.id());
    assert!(graph.stats().snapshot().schema_expirations >= 1);
    tx.rollback().unwrap();
}

#[test]
fn expiring_an_element_reloads_it() {
    let graph = TestGraph::memory();
    let key = graph
        .define_property_key(PropertyKeyMaker::new("age").data_type(DataType::Integer))
        .unwrap();

    let tx = graph.new_transaction().unwrap();
    let first = tx.get_relation_type("age").unwrap().unwrap();
    tx.expire_schema_element(key.id());
    let second = tx.get_relation_type("age").unwrap().unwrap();
    assert_eq!(first.id(), second.id());
    tx.commit().unwrap();

    // Expiring on a closed transaction is a no-op
    tx.expire_schema_element(key.id());
}

#[test]
fn schema_survives_reopen() {
    let graph = TestGraph::memory();
    graph
        .transaction(|tx| {
            let v = tx.add_vertex(Some("person"))?;
            tx.add_property(&v, "name", "marko")?;
            Ok(())
        })
        .unwrap();
    graph.create_composite_index("byName", &["name"], true).unwrap();

    let reopened = graph.reopen(GraphConfig::default());
    let name = reopened.schema().relation_type("name").unwrap();
    assert_eq!(name.as_property_key().unwrap().data_type, DataType::String);
    assert!(reopened.schema().vertex_label("person").is_some());
    assert_eq!(reopened.schema().indexes().len(), 1);

    // The unique index persisted with its entries
    let err = reopened
        .transaction(|tx| {
            let v = tx.add_vertex(Some("person"))?;
            tx.add_property(&v, "name", "marko")?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, CoreError::UniquenessViolation { .. }));
}

#[test]
fn read_only_graph_refuses_administration() {
    let graph = TestGraph::memory();
    let read_only = graph.reopen(GraphConfig::new().read_only(true));
    assert!(matches!(
        read_only.define_edge_label(EdgeLabelMaker::new("knows")),
        Err(CoreError::ReadOnly)
    ));
    let tx = read_only.new_transaction().unwrap();
    assert!(tx.is_read_only());
    tx.rollback().unwrap();
}
