//! Test fixtures and graph helpers.
//!
//! Provides convenience functions for setting up test graphs and common
//! test scenarios.

use arbordb_core::{Graph, GraphConfig};
use arbordb_storage::InMemoryStoreManager;
use std::sync::{Arc, Once};
use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber for tests, once per process.
///
/// Honors `RUST_LOG`; defaults to `arbordb_core=debug`. Output goes through
/// the test writer so it is captured per test.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("arbordb_core=debug,arbordb_storage=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_ansi(false)
            .try_init();
    });
}

/// A graph over an in-memory backend the test can inspect and reopen.
pub struct TestGraph {
    /// The graph instance.
    pub graph: Graph,
    /// The backend, sharing its data with the graph.
    pub store: InMemoryStoreManager,
}

impl TestGraph {
    /// Creates a graph with default settings.
    pub fn memory() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Creates a graph with `config`.
    pub fn with_config(config: GraphConfig) -> Self {
        init_test_logging();
        let store = InMemoryStoreManager::new();
        let graph =
            Graph::open(config, Arc::new(store.clone())).expect("Failed to open in-memory graph");
        Self { graph, store }
    }

    /// Opens a second graph instance over the same data.
    pub fn reopen(&self, config: GraphConfig) -> Graph {
        Graph::open(config, Arc::new(self.store.clone())).expect("Failed to reopen graph")
    }
}

impl std::ops::Deref for TestGraph {
    type Target = Graph;

    fn deref(&self) -> &Self::Target {
        &self.graph
    }
}

/// Runs a test with a temporary in-memory graph.
///
/// # Example
///
/// ```rust
/// use arbordb_testkit::with_test_graph;
///
/// with_test_graph(|graph| {
///     let tx = graph.new_transaction().unwrap();
///     assert!(tx.is_open());
///     tx.rollback().unwrap();
/// });
/// ```
pub fn with_test_graph<F, R>(f: F) -> R
where
    F: FnOnce(&Graph) -> R,
{
    let test_graph = TestGraph::memory();
    f(&test_graph.graph)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use arbordb_core::{CoreResult, InternalVertex, VertexId};

    /// Ids of the vertices of [`modern_graph`].
    #[derive(Debug, Clone, Copy)]
    pub struct ModernIds {
        /// "marko", 29
        pub marko: VertexId,
        /// "vadas", 27
        pub vadas: VertexId,
        /// "josh", 32
        pub josh: VertexId,
        /// "peter", 35
        pub peter: VertexId,
        /// "lop", java
        pub lop: VertexId,
        /// "ripple", java
        pub ripple: VertexId,
    }

    /// Creates the six-vertex "modern" social graph.
    ///
    /// People carry `name` and `age`, software carries `name` and `lang`.
    /// Edges are `knows` between people and `created` from people to
    /// software.
    pub fn modern_graph() -> (TestGraph, ModernIds) {
        let test_graph = TestGraph::memory();
        let vertices = test_graph
            .graph
            .transaction(|tx| -> CoreResult<[Arc<InternalVertex>; 6]> {
                let person = |name: &str, age: i64| -> CoreResult<_> {
                    let v = tx.add_vertex(Some("person"))?;
                    tx.add_property(&v, "name", name)?;
                    tx.add_property(&v, "age", age)?;
                    Ok(v)
                };
                let software = |name: &str| -> CoreResult<_> {
                    let v = tx.add_vertex(Some("software"))?;
                    tx.add_property(&v, "name", name)?;
                    tx.add_property(&v, "lang", "java")?;
                    Ok(v)
                };

                let marko = person("marko", 29)?;
                let vadas = person("vadas", 27)?;
                let josh = person("josh", 32)?;
                let peter = person("peter", 35)?;
                let lop = software("lop")?;
                let ripple = software("ripple")?;

                tx.add_edge(&marko, &vadas, "knows")?;
                tx.add_edge(&marko, &josh, "knows")?;
                tx.add_edge(&marko, &lop, "created")?;
                tx.add_edge(&josh, &ripple, "created")?;
                tx.add_edge(&josh, &lop, "created")?;
                tx.add_edge(&peter, &lop, "created")?;

                Ok([marko, vadas, josh, peter, lop, ripple])
            })
            .expect("Failed to build modern graph");

        // Ids are permanent only after commit
        let [marko, vadas, josh, peter, lop, ripple] = vertices.map(|v| v.id());
        let ids = ModernIds {
            marko,
            vadas,
            josh,
            peter,
            lop,
            ripple,
        };
        (test_graph, ids)
    }
}
