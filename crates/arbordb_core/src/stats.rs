//! Graph statistics.
//!
//! # Usage
//!
//! ```rust
//! use arbordb_core::Graph;
//!
//! let graph = Graph::open_in_memory().unwrap();
//! let tx = graph.new_transaction().unwrap();
//! tx.rollback().unwrap();
//!
//! let stats = graph.stats().snapshot();
//! assert_eq!(stats.transactions_started, 1);
//! assert_eq!(stats.transactions_rolled_back, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by all transactions of a graph.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct GraphStats {
    transactions_started: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
    commit_failures: AtomicU64,

    vertex_cache_hits: AtomicU64,
    vertex_cache_misses: AtomicU64,

    schema_types_created: AtomicU64,
    schema_expirations: AtomicU64,

    index_lookups: AtomicU64,
    full_scans: AtomicU64,
}

impl GraphStats {
    /// Creates a new stats instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_transaction_start(&self) {
        self.transactions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit_failure(&self) {
        self.commit_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_vertex_cache(&self, hit: bool) {
        if hit {
            self.vertex_cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.vertex_cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_schema_created(&self) {
        self.schema_types_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_schema_expiration(&self) {
        self.schema_expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_index_lookup(&self) {
        self.index_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_full_scan(&self) {
        self.full_scans.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of transactions started.
    pub fn transactions_started(&self) -> u64 {
        self.transactions_started.load(Ordering::Relaxed)
    }

    /// Returns the number of committed transactions.
    pub fn transactions_committed(&self) -> u64 {
        self.transactions_committed.load(Ordering::Relaxed)
    }

    /// Returns the number of rolled back transactions.
    pub fn transactions_rolled_back(&self) -> u64 {
        self.transactions_rolled_back.load(Ordering::Relaxed)
    }

    /// Returns the number of failed commits.
    pub fn commit_failures(&self) -> u64 {
        self.commit_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of full scans.
    ///
    /// High counts may indicate missing indexes.
    pub fn full_scans(&self) -> u64 {
        self.full_scans.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            transactions_started: self.transactions_started(),
            transactions_committed: self.transactions_committed(),
            transactions_rolled_back: self.transactions_rolled_back(),
            commit_failures: self.commit_failures(),
            vertex_cache_hits: self.vertex_cache_hits.load(Ordering::Relaxed),
            vertex_cache_misses: self.vertex_cache_misses.load(Ordering::Relaxed),
            schema_types_created: self.schema_types_created.load(Ordering::Relaxed),
            schema_expirations: self.schema_expirations.load(Ordering::Relaxed),
            index_lookups: self.index_lookups.load(Ordering::Relaxed),
            full_scans: self.full_scans(),
        }
    }
}

/// A point-in-time copy of [`GraphStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Transactions started.
    pub transactions_started: u64,
    /// Transactions committed.
    pub transactions_committed: u64,
    /// Transactions rolled back, including failed commits.
    pub transactions_rolled_back: u64,
    /// Commits that failed.
    pub commit_failures: u64,
    /// Vertex lookups answered by a transaction cache.
    pub vertex_cache_hits: u64,
    /// Vertex lookups that went to the backend.
    pub vertex_cache_misses: u64,
    /// Schema elements created by schema makers.
    pub schema_types_created: u64,
    /// Schema expirations delivered to open transactions.
    pub schema_expirations: u64,
    /// Composite index lookups.
    pub index_lookups: u64,
    /// Queries answered by scanning every vertex.
    pub full_scans: u64,
}
