//! # ArborDB Testkit
//!
//! Test utilities for ArborDB.
//!
//! This crate provides:
//! - Test fixtures and graph helpers
//! - Test doubles for the seams of the transaction engine
//! - Property-based test generators using proptest
//! - Stress testing utilities
//!
//! The cross-crate integration suite lives in `tests/`.
//!
//! ## Usage
//!
//! ```rust
//! use arbordb_testkit::prelude::*;
//!
//! with_test_graph(|graph| {
//!     let tx = graph.new_transaction().unwrap();
//!     tx.add_vertex(None).unwrap();
//!     tx.commit().unwrap();
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod doubles;
pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::doubles::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use doubles::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;
