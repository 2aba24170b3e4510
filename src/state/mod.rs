//! Sans-I/O state machines for the PostgreSQL protocol.
//!
//! State machines hold the protocol logic without performing any I/O.
//! They produce [`Action`] values that tell the caller what to do next.

pub mod action;
pub mod connection;

pub use action::Action;
pub use connection::{ConnectionState, ConnectionStateMachine};
