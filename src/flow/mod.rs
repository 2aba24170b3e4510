//! Protocol message flows.
//!
//! Each flow is a stateless driver over a [`Client`](crate::client::Client):
//! it decides what to send and how to interpret what comes back, without
//! owning any connection state itself.

pub mod copy_in;
pub mod copy_out;
pub mod simple_query;
pub mod termination;
pub mod util;

pub use util::not;
