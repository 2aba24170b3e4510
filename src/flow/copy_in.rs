//! COPY IN flow (`COPY ... FROM STDIN`).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};

use crate::client::{Client, ResponseStream};
use crate::error::Error;
use crate::flow::util::{concat_with, surface_errors, take_while};
use crate::protocol::frontend::CopyMessage;
use crate::protocol::{BackendMessage, FrontendMessage};

fn is_copy_in_response(item: &crate::error::Result<BackendMessage>) -> bool {
    matches!(item, Ok(BackendMessage::CopyInResponse(_)))
}

/// Watch `responses` until the server asks for data, then send `requests`.
///
/// Messages before `CopyInResponse` are forwarded; `CopyInResponse` itself is
/// not. The request exchange is created only after it has been seen, and its
/// responses are appended to the output. `requests` should be `Data*` ending
/// with exactly one `Done` or `Fail`; after `Fail` the server's error becomes
/// the failure of the sequence.
///
/// If `responses` ends without `CopyInResponse` the statement was not a
/// `COPY FROM STDIN`: `requests` is dropped unsent and the sequence ends with
/// [`Error::InvalidArgument`].
pub fn exchange(
    client: Arc<dyn Client>,
    requests: BoxStream<'static, CopyMessage>,
    responses: ResponseStream,
) -> ResponseStream {
    let started = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&started);
    let watched = take_while(surface_errors(responses), move |item| {
        if is_copy_in_response(item) {
            seen.store(true, Ordering::SeqCst);
            return false;
        }
        true
    });

    concat_with(watched, move || {
        if !started.load(Ordering::SeqCst) {
            let err = Error::invalid_argument("statement did not start a COPY FROM STDIN");
            let failed: ResponseStream = stream::once(future::err(err)).boxed();
            return failed;
        }
        surface_errors(client.exchange(requests.map(FrontendMessage::from).boxed()))
    })
}
