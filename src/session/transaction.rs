use std::ops::Deref;

use super::Operations;
use super::characteristics::{IsolationLevel, Mutability, Scope, isolation_level_sql, mutability_sql};
use crate::error::{Error, Result};

/// An open transaction, started by [`Connection::begin`](super::Connection::begin).
///
/// Dropping a `Transaction` sends nothing; the server keeps the transaction
/// open until `commit` or `rollback` is called or the connection closes.
/// Queries run through [`Operations`], which `Transaction` derefs to.
#[derive(Clone)]
pub struct Transaction {
    operations: Operations,
}

impl Transaction {
    pub(crate) fn new(operations: Operations) -> Self {
        Self { operations }
    }

    /// Commit the transaction.
    pub async fn commit(self) -> Result<()> {
        self.operations.execute("COMMIT").await
    }

    /// Roll back the transaction.
    pub async fn rollback(self) -> Result<()> {
        self.operations.execute("ROLLBACK").await
    }

    /// `SAVEPOINT {name}`.
    ///
    /// `name` is inserted into the statement as is: it is neither quoted nor
    /// escaped, so it must come from a trusted source.
    pub async fn create_savepoint(&self, name: &str) -> Result<()> {
        self.operations
            .execute(&format!("SAVEPOINT {}", savepoint_name(name)?))
            .await
    }

    /// `RELEASE SAVEPOINT {name}`. `name` is not escaped.
    pub async fn release_savepoint(&self, name: &str) -> Result<()> {
        self.operations
            .execute(&format!("RELEASE SAVEPOINT {}", savepoint_name(name)?))
            .await
    }

    /// `ROLLBACK TO SAVEPOINT {name}`. `name` is not escaped.
    pub async fn rollback_to_savepoint(&self, name: &str) -> Result<()> {
        self.operations
            .execute(&format!("ROLLBACK TO SAVEPOINT {}", savepoint_name(name)?))
            .await
    }

    /// Set the isolation level of this transaction.
    ///
    /// Must be called before the first query of the transaction.
    pub async fn set_isolation_level(&self, level: IsolationLevel) -> Result<()> {
        self.operations
            .execute(&isolation_level_sql(Scope::Transaction, level))
            .await
    }

    /// Make this transaction read-only or read-write.
    pub async fn set_mutability(&self, mutability: Mutability) -> Result<()> {
        self.operations
            .execute(&mutability_sql(Scope::Transaction, mutability))
            .await
    }
}

impl Deref for Transaction {
    type Target = Operations;

    fn deref(&self) -> &Operations {
        &self.operations
    }
}

fn savepoint_name(name: &str) -> Result<&str> {
    if name.is_empty() {
        Err(Error::invalid_argument("name must not be empty"))
    } else {
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::test_client::{TestClient, msg};
    use crate::conversion::Codecs;

    fn transaction(client: &Arc<TestClient>) -> Transaction {
        let client: Arc<TestClient> = Arc::clone(client);
        Transaction::new(Operations::new(client, Arc::new(Codecs::default())))
    }

    #[tokio::test]
    async fn commit_and_rollback() {
        let client = TestClient::builder()
            .expect(msg::query("COMMIT"), [msg::command_complete("COMMIT")])
            .expect(msg::query("ROLLBACK"), [msg::command_complete("ROLLBACK")])
            .build();

        transaction(&client).commit().await.unwrap();
        transaction(&client).rollback().await.unwrap();
        client.verify();
    }

    #[tokio::test]
    async fn savepoints() {
        let client = TestClient::builder()
            .expect(msg::query("SAVEPOINT sp1"), [msg::command_complete("SAVEPOINT")])
            .expect(
                msg::query("ROLLBACK TO SAVEPOINT sp1"),
                [msg::command_complete("ROLLBACK")],
            )
            .expect(
                msg::query("RELEASE SAVEPOINT sp1"),
                [msg::command_complete("RELEASE")],
            )
            .build();

        let tx = transaction(&client);
        tx.create_savepoint("sp1").await.unwrap();
        tx.rollback_to_savepoint("sp1").await.unwrap();
        tx.release_savepoint("sp1").await.unwrap();
        client.verify();
    }

    #[tokio::test]
    async fn empty_savepoint_name_is_rejected_before_sending() {
        let client = TestClient::no_op();
        let tx = transaction(&client);

        let err = tx.create_savepoint("").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: name must not be empty");
        assert!(tx.release_savepoint("").await.is_err());
        assert!(tx.rollback_to_savepoint("").await.is_err());
        assert_eq!(client.exchanges(), 0);
    }

    #[tokio::test]
    async fn transaction_characteristics() {
        let client = TestClient::builder()
            .expect(
                msg::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE"),
                [msg::command_complete("SET")],
            )
            .expect(
                msg::query("SET TRANSACTION READ ONLY"),
                [msg::command_complete("SET")],
            )
            .build();

        let tx = transaction(&client);
        tx.set_isolation_level(IsolationLevel::Serializable)
            .await
            .unwrap();
        tx.set_mutability(Mutability::ReadOnly).await.unwrap();
        client.verify();
    }
}
