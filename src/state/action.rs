//! Action types for state machine I/O requests.

use crate::protocol::FrontendMessage;

/// Action requested by a state machine.
///
/// The caller performs the requested I/O and feeds the next backend message
/// back into the state machine's `step()`.
#[derive(Debug)]
pub enum Action {
    /// Write the message and flush, then read a message.
    WriteAndReadMessage(FrontendMessage),

    /// Read a message from the server.
    ReadMessage,

    /// The state machine has finished successfully.
    Finished,
}
