//! Sequence combinators the flows are assembled from.

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};

use crate::client::ResponseStream;
use crate::protocol::BackendMessage;

/// Negate a predicate.
pub fn not<T: ?Sized>(predicate: impl Fn(&T) -> bool) -> impl Fn(&T) -> bool {
    move |value: &T| !predicate(value)
}

/// Forward items while `predicate` holds, then stop without forwarding the
/// failing item. The source is not polled again after that.
pub fn take_while<T, P>(source: BoxStream<'static, T>, predicate: P) -> BoxStream<'static, T>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + 'static,
{
    source
        .take_while(move |item| future::ready(predicate(item)))
        .boxed()
}

enum Concat<S, F> {
    First(S, F),
    Second(S),
    Done,
}

/// Drain `first`, then start the sequence produced by `second`.
///
/// `second` is not called until `first` has ended, and `first` is dropped
/// before it is called. An error item ends the whole sequence: nothing after
/// it is forwarded and a pending `second` is never started.
pub fn concat_with<T, E, F>(
    first: BoxStream<'static, Result<T, E>>,
    second: F,
) -> BoxStream<'static, Result<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
    F: FnOnce() -> BoxStream<'static, Result<T, E>> + Send + 'static,
{
    stream::unfold(Concat::First(first, second), |mut state| async move {
        loop {
            match state {
                Concat::First(mut first, second) => match first.next().await {
                    Some(Ok(item)) => return Some((Ok(item), Concat::First(first, second))),
                    Some(Err(err)) => return Some((Err(err), Concat::Done)),
                    None => {
                        drop(first);
                        state = Concat::Second(second());
                    }
                },
                Concat::Second(mut rest) => {
                    return match rest.next().await {
                        Some(Ok(item)) => Some((Ok(item), Concat::Second(rest))),
                        Some(Err(err)) => Some((Err(err), Concat::Done)),
                        None => None,
                    };
                }
                Concat::Done => return None,
            }
        }
    })
    .boxed()
}

/// Turn `ErrorResponse` into a failure of the whole exchange.
///
/// The first `ErrorResponse` is held back and the rest of the exchange is
/// drained and discarded, so the connection stays in step with the server.
/// The error is then yielded once as [`crate::Error::Server`] and the
/// sequence ends. Transport errors are forwarded immediately.
pub fn surface_errors(responses: ResponseStream) -> ResponseStream {
    stream::unfold(Some((responses, None)), |state| async move {
        let (mut responses, mut failure) = state?;
        loop {
            match responses.next().await {
                Some(Ok(BackendMessage::ErrorResponse(response))) => {
                    if failure.is_none() {
                        failure = Some(response.into_error());
                    }
                }
                Some(Ok(message)) => {
                    if failure.is_none() {
                        return Some((Ok(message), Some((responses, failure))));
                    }
                }
                Some(Err(err)) => return Some((Err(err), None)),
                None => return failure.map(|err| (Err(err), None)),
            }
        }
    })
    .boxed()
}
