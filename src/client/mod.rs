//! The contract message flows run on.
//!
//! A [`Client`] owns one server connection. It accepts a sequence of frontend
//! messages and returns the backend messages the server sends in reply, in the
//! order the server sent them. Requests and responses are correlated purely by
//! position, so at most one exchange is active on a client at a time.

#[cfg(test)]
pub(crate) mod test_client;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::Result;
use crate::protocol::{BackendMessage, FrontendMessage};

/// Frontend messages submitted in one exchange.
pub type RequestStream = BoxStream<'static, FrontendMessage>;

/// Backend messages received for one exchange.
pub type ResponseStream = BoxStream<'static, Result<BackendMessage>>;

/// A single logical connection to a server.
///
/// Implementations serialize exchanges: a second call to [`Client::exchange`]
/// does not touch the connection until the previous response stream has ended
/// or been dropped.
pub trait Client: Send + Sync {
    /// Send `requests` and stream back the server's responses.
    ///
    /// Nothing is written until the returned stream is first polled.
    fn exchange(&self, requests: RequestStream) -> ResponseStream;

    /// Snapshot of the parameters reported by the server via `ParameterStatus`.
    fn parameter_status(&self) -> HashMap<String, String>;

    /// Release the connection. Calling this more than once has no further effect.
    fn close(&self) -> BoxFuture<'static, Result<()>>;

    /// Wait for the connection and keep it for the caller.
    ///
    /// Exchanges through the returned client run back to back; other users of
    /// this client wait until every clone of it is dropped. Flows that span
    /// several exchanges, such as COPY, run on a reserved client.
    fn reserve(self: Arc<Self>) -> BoxFuture<'static, Result<Arc<dyn Client>>>;
}

/// A request stream of a single message.
pub fn single(message: impl Into<FrontendMessage>) -> RequestStream {
    stream::iter([message.into()]).boxed()
}

/// A request stream that sends nothing; used to keep reading an in-flight response.
pub fn nothing() -> RequestStream {
    stream::empty().boxed()
}
