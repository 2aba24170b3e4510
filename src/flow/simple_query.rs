//! Simple Query flow.

use futures::future;
use futures::stream::StreamExt;

use crate::client::{self, Client, ResponseStream};
use crate::error::Result;
use crate::flow::util::surface_errors;
use crate::protocol::BackendMessage;
use crate::protocol::frontend::Query;

/// Send `query` and stream every response message.
///
/// An `ErrorResponse` fails the sequence with [`crate::Error::Server`] once the
/// exchange has been drained. A query containing a NUL byte is rejected before
/// anything is sent.
pub fn exchange(client: &dyn Client, query: &str) -> Result<ResponseStream> {
    let query = Query::new(query)?;
    tracing::trace!(query = query.text(), "simple query");
    Ok(surface_errors(client.exchange(client::single(query))))
}

/// Like [`exchange`], but without `CommandComplete` messages.
///
/// For statements run only for their side effect, the result is empty unless
/// the server emitted notices or parameter changes along the way.
pub fn execute(client: &dyn Client, query: &str) -> Result<ResponseStream> {
    Ok(exchange(client, query)?
        .filter(|item| {
            future::ready(!matches!(item, Ok(BackendMessage::CommandComplete(_))))
        })
        .boxed())
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;
    use crate::client::test_client::{TestClient, msg};
    use crate::error::Error;

    #[tokio::test]
    async fn exchange_returns_all_messages() {
        let client = TestClient::builder()
            .expect(msg::query("test-query"), [msg::command_complete("test")])
            .build();

        let messages: Vec<_> = exchange(client.as_ref(), "test-query")
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(messages, vec![msg::command_complete("test")]);
        client.verify();
    }

    #[tokio::test]
    async fn execute_drops_command_complete() {
        let client = TestClient::builder()
            .expect(
                msg::query("test-query"),
                [
                    msg::parameter_status("test-name", "test-value"),
                    msg::command_complete("test"),
                ],
            )
            .build();

        let messages: Vec<_> = execute(client.as_ref(), "test-query")
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(messages, vec![msg::parameter_status("test-name", "test-value")]);
    }

    #[tokio::test]
    async fn execute_with_only_command_complete_is_empty() {
        let client = TestClient::builder()
            .expect(msg::query("BEGIN"), [msg::command_complete("BEGIN")])
            .build();

        let messages: Vec<_> = execute(client.as_ref(), "BEGIN")
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert!(messages.is_empty());
        client.verify();
    }

    #[tokio::test]
    async fn error_response_fails_the_exchange() {
        let client = TestClient::builder()
            .expect(
                msg::query("SELEC 1"),
                [msg::error("42601", "syntax error at or near \"SELEC\"")],
            )
            .build();

        let err = execute(client.as_ref(), "SELEC 1")
            .unwrap()
            .try_collect::<Vec<_>>()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Server(_)));
        assert_eq!(err.sqlstate(), Some("42601"));
    }

    #[test]
    fn nul_in_query_is_rejected_before_io() {
        let client = TestClient::no_op();
        let err = exchange(client.as_ref(), "SELECT '\0'").err().unwrap();
        assert_eq!(
            err.to_string(),
            "Invalid argument: query must not contain a NUL byte"
        );
        assert_eq!(client.exchanges(), 0);
    }
}
