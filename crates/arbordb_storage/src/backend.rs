//! Backend transaction traits.

use crate::error::StorageResult;
use crate::mutation::{KeyValue, Mutation};

/// Per-transaction settings handed to the backend when a transaction begins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreTxConfig {
    /// Optional name used to group transactions in backend diagnostics.
    pub group_name: Option<String>,
    /// Commit timestamp in the graph's timestamp unit, if fixed up front.
    pub commit_time: Option<u64>,
}

impl StoreTxConfig {
    /// Sets the group name.
    #[must_use]
    pub fn group_name(mut self, name: impl Into<String>) -> Self {
        self.group_name = Some(name.into());
        self
    }

    /// Sets the commit time.
    #[must_use]
    pub const fn commit_time(mut self, time: u64) -> Self {
        self.commit_time = Some(time);
        self
    }
}

/// Capabilities advertised by a store manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreFeatures {
    /// Whether buffered mutations of one transaction become visible atomically.
    pub transactional: bool,
    /// Whether data survives the process.
    pub persistent: bool,
    /// Whether `scan_prefix` returns keys in ascending byte order.
    pub ordered_scan: bool,
}

/// A factory for backend transactions.
///
/// # Invariants
///
/// - Every transaction returned by `begin_transaction` is independent
/// - After `close`, `begin_transaction` fails with [`crate::StorageError::Closed`]
pub trait StoreManager: Send + Sync {
    /// Begins a new backend transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager is closed or the backend is unavailable.
    fn begin_transaction(&self, config: &StoreTxConfig)
        -> StorageResult<Box<dyn StoreTransaction>>;

    /// Returns the capabilities of this backend.
    fn features(&self) -> StoreFeatures;

    /// Returns a short human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// Closes the manager. Further transactions are refused.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing backend resources fails.
    fn close(&self) -> StorageResult<()>;
}

/// A backend transaction handle.
///
/// The graph engine owns exactly one handle per graph transaction and routes
/// every durable read and write through it. Handles buffer writes until
/// [`commit`](StoreTransaction::commit) and observe their own buffered writes.
///
/// # Invariants
///
/// - After `commit` or `rollback` returns, every further call fails with
///   [`crate::StorageError::TransactionFinished`]
/// - A failed `commit` applies nothing
pub trait StoreTransaction: Send {
    /// Reads a single key from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the transaction is finished.
    fn get(&mut self, store: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Returns every entry of `store` whose key starts with `prefix`.
    ///
    /// An empty prefix scans the whole store.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails or the transaction is finished.
    fn scan_prefix(&mut self, store: &str, prefix: &[u8]) -> StorageResult<Vec<KeyValue>>;

    /// Buffers a mutation against `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is finished.
    fn mutate(&mut self, store: &str, mutation: Mutation) -> StorageResult<()>;

    /// Atomically applies all buffered mutations.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails. Nothing is applied in that case.
    fn commit(&mut self) -> StorageResult<()>;

    /// Discards all buffered mutations.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is already finished.
    fn rollback(&mut self) -> StorageResult<()>;
}
