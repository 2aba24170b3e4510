//! COPY OUT flow (`COPY ... TO STDOUT`).

use std::sync::Arc;

use crate::client::{self, Client, ResponseStream};
use crate::flow::util::{concat_with, not, surface_errors, take_while};
use crate::protocol::BackendMessage;

fn is_copy_out_response(item: &crate::error::Result<BackendMessage>) -> bool {
    matches!(item, Ok(BackendMessage::CopyOutResponse(_)))
}

/// Watch `responses` until the server starts sending data, then keep reading.
///
/// Messages before `CopyOutResponse` are forwarded; `CopyOutResponse` itself is
/// not. The rest of the transfer (`CopyData*`, `CopyDone`, `CommandComplete`)
/// is read through an exchange that sends nothing.
pub fn exchange(client: Arc<dyn Client>, responses: ResponseStream) -> ResponseStream {
    let watched = take_while(surface_errors(responses), not(is_copy_out_response));

    concat_with(watched, move || surface_errors(client.exchange(client::nothing())))
}
