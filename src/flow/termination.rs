//! Termination flow.

use crate::client::{self, Client, ResponseStream};
use crate::protocol::FrontendMessage;

/// Send `Terminate`.
///
/// The server does not answer; the sequence only signals that the message was
/// handed to the connection. Invoke at most once per connection.
pub fn exchange(client: &dyn Client) -> ResponseStream {
    client.exchange(client::single(FrontendMessage::Terminate))
}
