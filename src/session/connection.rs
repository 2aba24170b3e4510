use std::collections::HashMap;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use super::characteristics::{IsolationLevel, Mutability, Scope, isolation_level_sql, mutability_sql};
use super::operations::drain;
use super::{Operations, Transaction};
use crate::client::Client;
use crate::conversion::Codecs;
use crate::error::Result;
use crate::flow::termination;

/// A session on one [`Client`].
///
/// `Connection` derefs to [`Operations`] for running queries and COPY.
pub struct Connection {
    client: Arc<dyn Client>,
    operations: Operations,
}

impl Connection {
    /// Wrap `client`, decoding rows with the built-in codecs.
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self::with_codecs(client, Codecs::default())
    }

    /// Wrap `client`, decoding rows with `codecs`.
    pub fn with_codecs(client: Arc<dyn Client>, codecs: Codecs) -> Self {
        let operations = Operations::new(Arc::clone(&client), Arc::new(codecs));
        Self { client, operations }
    }

    /// Start a transaction.
    pub async fn begin(&self) -> Result<Transaction> {
        self.operations.execute("BEGIN").await?;
        Ok(Transaction::new(self.operations.clone()))
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` succeeds. When `f` or the commit fails, the
    /// transaction is rolled back and the original error is returned; a
    /// failed rollback is only logged.
    pub async fn with_transaction<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Transaction) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let tx = self.begin().await?;
        let outcome = match f(tx.clone()).await {
            Ok(value) => tx.clone().commit().await.map(|()| value),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(value) => Ok(value),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        error = %rollback_err,
                        original = %err,
                        "rollback after failed transaction also failed"
                    );
                }
                Err(err)
            }
        }
    }

    /// Set the default isolation level for later transactions.
    pub async fn set_isolation_level(&self, level: IsolationLevel) -> Result<()> {
        self.operations
            .execute(&isolation_level_sql(Scope::Session, level))
            .await
    }

    /// Set the default mutability for later transactions.
    pub async fn set_mutability(&self, mutability: Mutability) -> Result<()> {
        self.operations
            .execute(&mutability_sql(Scope::Session, mutability))
            .await
    }

    /// Parameters the server has reported, such as `server_version`.
    pub fn parameter_status(&self) -> HashMap<String, String> {
        self.client.parameter_status()
    }

    /// Send `Terminate` and release the client.
    ///
    /// The client is closed even when sending `Terminate` fails. The first
    /// error encountered is returned.
    pub async fn close(&self) -> Result<()> {
        let terminated = drain(termination::exchange(self.client.as_ref())).await;
        if let Err(err) = &terminated {
            tracing::debug!(error = %err, "terminate failed");
        }

        let closed = self.client.close().await;
        if let Err(err) = &closed {
            tracing::warn!(error = %err, "failed to close connection");
        }

        terminated.and(closed)
    }
}

impl Deref for Connection {
    type Target = Operations;

    fn deref(&self) -> &Operations {
        &self.operations
    }
}
