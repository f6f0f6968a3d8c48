//! Transaction lifecycle: close paths, deregistration and backend failures.

use arbordb_core::{CoreError, Graph, GraphConfig, GraphQuery, SchemaId};
use arbordb_storage::StorageError;
use arbordb_testkit::{init_test_logging, FaultyStoreManager, RecordingGraph, TestGraph};
use std::sync::Arc;

fn faulty_graph() -> (Graph, FaultyStoreManager) {
    init_test_logging();
    let store = FaultyStoreManager::new();
    let graph = Graph::open(GraphConfig::default(), Arc::new(store.clone())).unwrap();
    (graph, store)
}

#[test]
fn rollback_releases_state() {
    let graph = TestGraph::memory();
    let tx = graph.new_transaction().unwrap();
    let v = tx.add_vertex(None).unwrap();
    let key = tx.get_or_create_property_key("name", None).unwrap();
    let id = v.id().as_u64();
    assert!(tx.get_internal_vertex(id).is_some());

    tx.rollback().unwrap();

    assert!(!tx.is_open());
    assert!(tx.get_internal_vertex(id).is_none());
    assert!(tx.get_internal_vertex(1).is_none());
    tx.expire_schema_element(key.id());
    tx.expire_schema_element(SchemaId::new(u64::MAX));
}

#[test]
fn commit_deregisters_exactly_once() {
    let graph = TestGraph::memory();
    let recording = RecordingGraph::new(&graph);
    let tx = recording.build_transaction().start().unwrap();
    let id = tx.id();
    assert_eq!(graph.open_transaction_count(), 1);

    let v = tx.add_vertex(None).unwrap();
    tx.add_property(&v, "name", "marko").unwrap();
    tx.commit().unwrap();

    assert!(!tx.is_open());
    assert_eq!(recording.close_count(id), 1);
    assert_eq!(graph.open_transaction_count(), 0);

    assert!(matches!(tx.rollback(), Err(CoreError::TransactionClosed)));
    assert!(matches!(tx.commit(), Err(CoreError::TransactionClosed)));
    assert_eq!(recording.close_count(id), 1);
    assert_eq!(graph.open_transaction_count(), 0);
}

#[test]
fn rollback_deregisters_exactly_once() {
    let graph = TestGraph::memory();
    let recording = RecordingGraph::new(&graph);
    let other = graph.new_transaction().unwrap();
    let tx = recording.build_transaction().start().unwrap();
    let id = tx.id();

    tx.rollback().unwrap();
    assert!(tx.rollback().is_err());
    assert_eq!(recording.closed(), vec![id]);

    // Other registrations are untouched
    assert_eq!(graph.open_transaction_count(), 1);
    other.rollback().unwrap();
    assert_eq!(graph.open_transaction_count(), 0);
}

#[test]
fn closed_transaction_rejects_mutations() {
    let graph = TestGraph::memory();
    let tx = graph.new_transaction().unwrap();
    let v = tx.add_vertex(None).unwrap();
    tx.rollback().unwrap();

    assert!(matches!(tx.add_vertex(None), Err(CoreError::TransactionClosed)));
    assert!(matches!(
        tx.add_property(&v, "name", "x"),
        Err(CoreError::TransactionClosed)
    ));
    assert!(matches!(
        tx.get_or_create_edge_label("knows"),
        Err(CoreError::TransactionClosed)
    ));
}

#[test]
fn failed_commit_closes_the_transaction() {
    let (graph, store) = faulty_graph();
    let tx = graph.new_transaction().unwrap();
    let v = tx.add_vertex(None).unwrap();
    tx.add_property(&v, "name", "marko").unwrap();

    store.fail_commits(true);
    let err = tx.commit().unwrap_err();
    assert!(matches!(err, CoreError::Storage(StorageError::Permanent(_))));

    assert!(!tx.is_open());
    assert_eq!(graph.open_transaction_count(), 0);
    let stats = graph.stats().snapshot();
    assert_eq!(stats.commit_failures, 1);
    assert_eq!(stats.transactions_committed, 0);
    assert_eq!(stats.transactions_rolled_back, 1);

    // Nothing from the failed commit is visible
    assert!(graph.schema().relation_type("name").is_none());
    store.fail_commits(false);
    let tx = graph.new_transaction().unwrap();
    assert!(tx.get_vertex(v.id().as_u64()).unwrap().is_none());
    tx.rollback().unwrap();
}

#[test]
fn failed_rollback_after_failed_commit_is_logged_only() {
    let (graph, store) = faulty_graph();
    let tx = graph.new_transaction().unwrap();
    tx.add_vertex(None).unwrap();

    store.fail_commits(true);
    store.fail_rollbacks(true);
    let err = tx.commit().unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)));
    assert!(!tx.is_open());
    assert_eq!(graph.open_transaction_count(), 0);
}

#[test]
fn failed_rollback_still_closes() {
    let (graph, store) = faulty_graph();
    let tx = graph.new_transaction().unwrap();
    store.fail_rollbacks(true);

    assert!(tx.rollback().is_err());
    assert!(!tx.is_open());
    assert_eq!(graph.open_transaction_count(), 0);
    assert!(matches!(tx.rollback(), Err(CoreError::TransactionClosed)));
}

#[test]
fn read_failures_surface_as_backend_errors() {
    let (graph, store) = faulty_graph();
    graph
        .transaction(|tx| {
            tx.add_vertex(None)?;
            Ok(())
        })
        .unwrap();

    let tx = graph.new_transaction().unwrap();
    store.fail_reads(true);
    let err = tx.get_vertex((1 << 48) + 1).unwrap_err();
    assert!(matches!(err, CoreError::Storage(StorageError::Temporary(_))));
    assert!(tx.is_open());
    store.fail_reads(false);
    tx.rollback().unwrap();
}

#[test]
fn read_only_commit_skips_the_pipeline() {
    let (graph, store) = faulty_graph();
    store.fail_commits(true);

    let tx = graph.build_transaction().read_only(true).start().unwrap();
    assert!(matches!(tx.add_vertex(None), Err(CoreError::ReadOnly)));
    tx.commit().unwrap();
    assert_eq!(graph.stats().transactions_committed(), 1);
}

#[test]
fn transaction_helper_keeps_the_body_error() {
    let graph = TestGraph::memory();
    let err = graph
        .transaction(|tx| -> Result<(), CoreError> {
            tx.add_vertex(None)?;
            Err(CoreError::invalid_operation("body failed"))
        })
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidOperation { .. }));
    assert_eq!(graph.open_transaction_count(), 0);
    assert_eq!(graph.stats().transactions_rolled_back(), 1);
}

#[test]
fn closing_the_graph_rolls_back_open_transactions() {
    let graph = TestGraph::memory();
    let first = graph.new_transaction().unwrap();
    let second = graph.new_transaction().unwrap();
    first.add_vertex(None).unwrap();

    graph.close().unwrap();

    assert!(!first.is_open());
    assert!(!second.is_open());
    assert_eq!(graph.open_transaction_count(), 0);
    assert!(matches!(graph.new_transaction(), Err(CoreError::GraphClosed)));
    // Closing twice is a no-op
    graph.close().unwrap();
}

#[test]
fn dropping_an_open_transaction_deregisters_it() {
    let graph = TestGraph::memory();
    {
        let tx = graph.new_transaction().unwrap();
        tx.add_vertex(None).unwrap();
        assert_eq!(graph.open_transaction_count(), 1);
    }
    assert_eq!(graph.open_transaction_count(), 0);
    assert_eq!(graph.stats().transactions_rolled_back(), 1);
}

#[test]
fn dropping_with_a_failing_backend_still_deregisters() {
    let (graph, store) = faulty_graph();
    store.fail_rollbacks(true);
    {
        let tx = graph.new_transaction().unwrap();
        tx.add_vertex(None).unwrap();
    }
    assert_eq!(graph.open_transaction_count(), 0);
    store.fail_rollbacks(false);
    graph.close().unwrap();
}

#[test]
fn shared_transaction_serializes_concurrent_mutations() {
    let graph = TestGraph::memory();
    let tx = graph.new_transaction().unwrap();
    assert!(!tx.config().is_single_threaded());

    std::thread::scope(|scope| {
        for worker in 0..8_i64 {
            let tx = &tx;
            scope.spawn(move || {
                for _ in 0..200 {
                    let v = tx.add_vertex(None).unwrap();
                    tx.add_property(&v, "worker", worker).unwrap();
                }
            });
        }
    });
    assert_eq!(tx.cached_vertex_count().unwrap(), 1600);
    tx.commit().unwrap();

    let check = graph.new_transaction().unwrap();
    let mut total = 0;
    for worker in 0..8_i64 {
        let found = check.query(&GraphQuery::new().has("worker", worker)).unwrap();
        assert_eq!(found.len(), 200);
        total += found.len();
    }
    assert_eq!(total, 1600);
    check.rollback().unwrap();
}
