//! Stress tests for ArborDB.
//!
//! These tests verify behavior under heavy load and concurrent access.

use arbordb_core::{CoreError, Direction, Graph, GraphQuery, PropertyValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let seconds = duration.as_secs_f64();
        let ops_per_second = if seconds > 0.0 {
            total as f64 / seconds
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of transactions to run.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Vertices created per transaction.
    pub vertices_per_tx: usize,
    /// Distinct values of the `tag` property.
    pub tag_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            vertices_per_tx: 4,
            tag_count: 16,
        }
    }
}

/// Commits one transaction that adds a chain of tagged vertices.
fn add_chain(graph: &Graph, seed: usize, config: &StressConfig) -> Result<(), CoreError> {
    graph.transaction(|tx| {
        let mut previous = None;
        for i in 0..config.vertices_per_tx {
            let v = tx.add_vertex(Some("item"))?;
            tx.add_property(&v, "seq", (seed * config.vertices_per_tx + i) as i64)?;
            tx.add_property(&v, "tag", format!("t{}", (seed + i) % config.tag_count.max(1)))?;
            if let Some(prev) = &previous {
                tx.add_edge(prev, &v, "next")?;
            }
            previous = Some(v);
        }
        Ok(())
    })
}

/// Run a sequential commit stress test.
pub fn stress_sequential_commits(graph: &Graph, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        match add_chain(graph, i, config) {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a sequential query stress test over previously committed data.
pub fn stress_sequential_queries(graph: &Graph, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let tag = format!("t{}", i % config.tag_count.max(1));
        let result = graph.transaction(|tx| {
            for v in tx.query(&GraphQuery::new().has("tag", tag.as_str()))? {
                tx.edges(&v, Direction::Out, Some("next"))?;
            }
            Ok(())
        });
        match result {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a transaction abort stress test.
///
/// Every other transaction body fails and is rolled back.
pub fn stress_transaction_aborts(graph: &Graph, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let should_fail = i % 2 == 0;
        let result = graph.transaction(|tx| {
            let v = tx.add_vertex(None)?;
            tx.add_property(&v, "seq", i as i64)?;
            if should_fail {
                Err(CoreError::invalid_operation("intentional"))
            } else {
                Ok(())
            }
        });
        match result {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Creates the schema the stress transactions use.
///
/// Transactions racing to create the same type conflict at commit, so
/// concurrent runs define it up front.
pub fn prepare_schema(graph: &Graph) -> Result<(), CoreError> {
    graph.transaction(|tx| {
        tx.get_or_create_vertex_label("item")?;
        tx.get_or_create_property_key("seq", Some(&PropertyValue::from(0i64)))?;
        tx.get_or_create_property_key("tag", Some(&PropertyValue::from("t0")))?;
        tx.get_or_create_edge_label("next")?;
        Ok(())
    })
}

/// Run a concurrent commit stress test.
///
/// Each thread commits its share of transactions against the same graph.
pub fn stress_concurrent_commits(graph: &Graph, config: &StressConfig) -> StressTestResult {
    if let Err(err) = prepare_schema(graph) {
        warn!(error = %err, "stress schema preparation failed");
    }
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let threads = config.threads.max(1);
    let ops_per_thread = config.operations / threads;

    let start = Instant::now();

    thread::scope(|scope| {
        for t in 0..threads {
            let successful = &successful;
            let failed = &failed;
            scope.spawn(move || {
                for i in 0..ops_per_thread {
                    match add_chain(graph, t * ops_per_thread + i, config) {
                        Ok(()) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
    });

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}
