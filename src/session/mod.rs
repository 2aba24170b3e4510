//! Session orchestration: connections, transactions and query execution.
//!
//! Every statement is sent with the Simple Query flow. Nothing here owns the
//! transport; [`Connection`] and [`Transaction`] share the same [`Client`]
//! through an [`Operations`] handle.
//!
//! [`Client`]: crate::client::Client

mod characteristics;
mod connection;
mod operations;
mod transaction;

pub use characteristics::{IsolationLevel, Mutability};
pub use connection::Connection;
pub use operations::{Operations, QueryResult};
pub use transaction::Transaction;
