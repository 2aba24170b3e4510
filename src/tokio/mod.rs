//! Asynchronous PostgreSQL client using Tokio.

mod conn;
mod stream;

use std::sync::Arc;

pub use conn::Conn;
pub use stream::Io;

use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::session::Connection;

/// Connect and wrap the connection in a [`Connection`] session.
pub async fn connect<O: TryInto<Opts>>(opts: O) -> Result<Connection>
where
    Error: From<O::Error>,
{
    let conn = Conn::new(opts).await?;
    Ok(Connection::new(Arc::new(conn)))
}
