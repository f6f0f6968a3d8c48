//! Graph transactions.
//!
//! A [`GraphTransaction`] mediates every read and write a client performs
//! during one logical transaction:
//!
//! - **Identity**: at most one [`crate::InternalVertex`] per vertex id
//! - **Schema**: names resolve through a local cache, then the graph's
//!   resolver, then the schema maker
//! - **Backend**: exactly one backend transaction, owned until close
//! - **Lifecycle**: `Open` until the first commit or rollback, `Closed`
//!   afterwards; lookups on a closed transaction report absence
//!
//! Every transaction registers itself with its graph on open and
//! deregisters exactly once on close.

mod builder;
mod commit;
mod elements;
mod handle;
mod inner;
mod query;
mod schema;
mod state;

pub use builder::TransactionBuilder;
pub use handle::GraphTransaction;
