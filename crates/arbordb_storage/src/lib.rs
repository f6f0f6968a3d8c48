//! # ArborDB Storage
//!
//! Backend transaction abstraction for the ArborDB graph engine.
//!
//! This crate is the lowest layer the transaction engine talks to. Stores
//! are **opaque ordered key/value maps**: they do not interpret the keys or
//! values they hold. The graph engine owns every byte layout.
//!
//! ## Design Principles
//!
//! - A [`StoreManager`] hands out one [`StoreTransaction`] per graph transaction
//! - Writes are buffered as [`Mutation`]s and applied atomically on commit
//! - Reads inside a backend transaction observe its own buffered writes
//! - Managers must be `Send + Sync`; transactions must be `Send`
//!
//! ## Available Backends
//!
//! - [`InMemoryStoreManager`] - For testing and ephemeral graphs
//!
//! ## Example
//!
//! ```rust
//! use arbordb_storage::{InMemoryStoreManager, Mutation, StoreManager, StoreTxConfig};
//!
//! let manager = InMemoryStoreManager::new();
//! let mut tx = manager.begin_transaction(&StoreTxConfig::default()).unwrap();
//! tx.mutate("edgestore", Mutation::put(b"k".to_vec(), b"v".to_vec())).unwrap();
//! assert_eq!(tx.get("edgestore", b"k").unwrap(), Some(b"v".to_vec()));
//! tx.commit().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;
mod mutation;

pub use backend::{StoreFeatures, StoreManager, StoreTransaction, StoreTxConfig};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStoreManager;
pub use mutation::{KeyValue, Mutation};
