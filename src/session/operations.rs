//! SQL execution shared by [`Connection`](super::Connection) and
//! [`Transaction`](super::Transaction).

use std::sync::Arc;

use bytes::Bytes;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::client::{self, Client, ResponseStream};
use crate::conversion::Codecs;
use crate::error::{Error, Result};
use crate::flow::{copy_in, copy_out, simple_query};
use crate::protocol::BackendMessage;
use crate::protocol::backend::query::{CommandComplete, RowDescription};
use crate::protocol::frontend::{CopyMessage, Query};
use crate::row::Row;

/// The outcome of one statement of a query string.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Columns of the result set; empty for statements that return no rows
    pub columns: Arc<RowDescription>,
    /// Rows in the order the server sent them
    pub rows: Vec<Row>,
    /// Completion tag, e.g. `INSERT 0 3`
    pub command: CommandComplete,
}

impl QueryResult {
    /// Rows affected or returned, as reported in the completion tag.
    pub fn rows_affected(&self) -> Option<u64> {
        self.command.rows_affected()
    }
}

/// Runs SQL over a [`Client`] and decodes results with a [`Codecs`] registry.
#[derive(Clone)]
pub struct Operations {
    client: Arc<dyn Client>,
    codecs: Arc<Codecs>,
}

impl Operations {
    pub fn new(client: Arc<dyn Client>, codecs: Arc<Codecs>) -> Self {
        Self { client, codecs }
    }

    /// The codec registry rows are decoded with.
    pub fn codecs(&self) -> &Arc<Codecs> {
        &self.codecs
    }

    /// Run `sql` for its side effects.
    pub async fn execute(&self, sql: &str) -> Result<()> {
        drain(simple_query::execute(self.client.as_ref(), sql)?).await
    }

    /// Run `sql` and stream one [`QueryResult`] per statement.
    ///
    /// `sql` may hold several statements separated by `;`. A failing statement
    /// ends the stream with the server's error.
    pub fn query(&self, sql: &str) -> Result<BoxStream<'static, Result<QueryResult>>> {
        let responses = simple_query::exchange(self.client.as_ref(), sql)?;
        let codecs = Arc::clone(&self.codecs);

        Ok(stream::try_unfold(responses, move |responses| {
            next_result(responses, Arc::clone(&codecs))
        })
        .boxed())
    }

    /// Run `sql` and collect every row of every statement.
    pub async fn query_rows(&self, sql: &str) -> Result<Vec<Row>> {
        self.query(sql)?
            .try_fold(Vec::new(), |mut rows, result| {
                rows.extend(result.rows);
                future::ok(rows)
            })
            .await
    }

    /// Run a `COPY ... FROM STDIN` statement, sending `data` once the server
    /// is ready for it.
    ///
    /// Returns the row count from the completion tag. The connection is
    /// reserved for the whole transfer.
    pub async fn copy_in(
        &self,
        sql: &str,
        data: BoxStream<'static, CopyMessage>,
    ) -> Result<Option<u64>> {
        let query = Query::new(sql)?;
        let client = Arc::clone(&self.client).reserve().await?;
        let responses = client.exchange(client::single(query));
        copy_in::exchange(client, data, responses)
            .try_fold(None, |count, message| {
                future::ok(match message {
                    BackendMessage::CommandComplete(command) => command.rows_affected(),
                    _ => count,
                })
            })
            .await
    }

    /// Run a `COPY ... TO STDOUT` statement and stream the data chunks.
    ///
    /// The connection is reserved from the first poll until the stream ends
    /// or is dropped.
    pub fn copy_out(&self, sql: &str) -> Result<BoxStream<'static, Result<Bytes>>> {
        let query = Query::new(sql)?;
        let reserve = Arc::clone(&self.client).reserve();
        let transfer = async move {
            let client = reserve.await?;
            let responses = client.exchange(client::single(query));
            Ok::<_, Error>(copy_out::exchange(client, responses))
        };

        Ok(stream::once(transfer)
            .try_flatten()
            .try_filter_map(|message| {
                future::ok(match message {
                    BackendMessage::CopyData(data) => Some(data),
                    _ => None,
                })
            })
            .boxed())
    }
}

pub(crate) async fn drain(responses: ResponseStream) -> Result<()> {
    responses.try_for_each(|_| future::ok(())).await
}

async fn next_result(
    mut responses: ResponseStream,
    codecs: Arc<Codecs>,
) -> Result<Option<(QueryResult, ResponseStream)>> {
    let mut columns: Option<Arc<RowDescription>> = None;
    let mut rows = Vec::new();

    while let Some(message) = responses.try_next().await? {
        match message {
            BackendMessage::RowDescription(description) => {
                columns = Some(Arc::new(description));
            }
            BackendMessage::DataRow(data) => {
                let description = columns.as_ref().map(Arc::clone).ok_or_else(|| {
                    Error::ProtocolDecode("DataRow before RowDescription".into())
                })?;
                rows.push(Row::new(description, data, Arc::clone(&codecs))?);
            }
            BackendMessage::CommandComplete(command) => {
                let columns =
                    columns.unwrap_or_else(|| Arc::new(RowDescription::new(Vec::new())));
                let result = QueryResult {
                    columns,
                    rows,
                    command,
                };
                return Ok(Some((result, responses)));
            }
            BackendMessage::NoticeResponse(notice) => {
                tracing::debug!(message = ?notice.fields.message, "notice");
            }
            _ => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::stream;

    use super::*;
    use crate::client::test_client::{TestClient, msg};
    use crate::protocol::backend::query::{DataRow, FieldDescription};
    use crate::protocol::frontend::FrontendMessage;
    use crate::protocol::types::{Format, oid};

    fn description(name: &str) -> BackendMessage {
        BackendMessage::RowDescription(RowDescription::new(vec![FieldDescription {
            name: name.into(),
            table_oid: 0,
            column_id: 0,
            type_oid: oid::INT4,
            type_size: 4,
            type_modifier: -1,
            format: Format::Text,
        }]))
    }

    fn data_row(value: &'static [u8]) -> BackendMessage {
        BackendMessage::DataRow(DataRow::new(vec![Some(Bytes::from_static(value))]))
    }

    fn operations(client: Arc<TestClient>) -> Operations {
        Operations::new(client, Arc::new(Codecs::default()))
    }

    #[tokio::test]
    async fn query_yields_one_result_per_statement() {
        let client = TestClient::builder()
            .expect(
                msg::query("SELECT 1 AS a; UPDATE t SET x = 1"),
                [
                    description("a"),
                    data_row(b"1"),
                    msg::command_complete("SELECT 1"),
                    msg::command_complete("UPDATE 4"),
                ],
            )
            .build();

        let results: Vec<_> = operations(Arc::clone(&client))
            .query("SELECT 1 AS a; UPDATE t SET x = 1")
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rows.len(), 1);
        assert_eq!(results[0].rows[0].get_by_name::<i32>("a").unwrap(), 1);
        assert!(results[1].columns.is_empty());
        assert_eq!(results[1].rows_affected(), Some(4));
        client.verify();
    }

    #[tokio::test]
    async fn query_surfaces_server_error() {
        let client = TestClient::builder()
            .expect(
                msg::query("SELEC 1"),
                [msg::error("42601", "syntax error at or near \"SELEC\"")],
            )
            .build();

        let err = operations(Arc::clone(&client))
            .query_rows("SELEC 1")
            .await
            .unwrap_err();
        assert_eq!(err.sqlstate(), Some("42601"));
    }

    #[tokio::test]
    async fn query_rejects_nul_before_sending() {
        let client = TestClient::no_op();
        let err = operations(Arc::clone(&client)).query("SELECT '\0'").err();
        assert!(matches!(err, Some(Error::InvalidArgument(_))));
        assert_eq!(client.exchanges(), 0);
    }

    #[tokio::test]
    async fn copy_in_reports_row_count() {
        let client = TestClient::builder()
            .expect(msg::query("COPY t FROM STDIN"), [msg::copy_in_response()])
            .expect(FrontendMessage::from(CopyMessage::data(&b"1\n"[..])), [])
            .expect(
                FrontendMessage::CopyDone,
                [msg::command_complete("COPY 1")],
            )
            .build();

        let data = stream::iter([CopyMessage::data(&b"1\n"[..]), CopyMessage::Done]).boxed();
        let count = operations(Arc::clone(&client))
            .copy_in("COPY t FROM STDIN", data)
            .await
            .unwrap();

        assert_eq!(count, Some(1));
        assert_eq!(client.reserves(), 1);
        client.verify();
    }

    #[tokio::test]
    async fn copy_out_yields_chunks() {
        let client = TestClient::builder()
            .expect(
                msg::query("COPY t TO STDOUT"),
                [
                    msg::copy_out_response(),
                    msg::copy_data(b"1\n"),
                    msg::copy_data(b"2\n"),
                    BackendMessage::CopyDone,
                    msg::command_complete("COPY 2"),
                ],
            )
            .build();

        let chunks: Vec<Bytes> = operations(Arc::clone(&client))
            .copy_out("COPY t TO STDOUT")
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(chunks, vec![Bytes::from_static(b"1\n"), Bytes::from_static(b"2\n")]);
        assert_eq!(client.reserves(), 1);
    }
}
