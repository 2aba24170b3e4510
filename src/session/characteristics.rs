//! Transaction characteristics and their SQL rendering.

use std::fmt;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    ReadCommitted,
    ReadUncommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// The SQL keywords for this level.
    pub fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Whether a transaction may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    ReadOnly,
    ReadWrite,
}

impl Mutability {
    /// The SQL keywords for this mode.
    pub fn as_sql(self) -> &'static str {
        match self {
            Mutability::ReadOnly => "READ ONLY",
            Mutability::ReadWrite => "READ WRITE",
        }
    }
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Where a `SET ... TRANSACTION` statement applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    /// Default for every later transaction of the session
    Session,
    /// The current transaction only
    Transaction,
}

impl Scope {
    fn prefix(self) -> &'static str {
        match self {
            Scope::Session => "SET SESSION CHARACTERISTICS AS TRANSACTION",
            Scope::Transaction => "SET TRANSACTION",
        }
    }
}

pub(crate) fn isolation_level_sql(scope: Scope, level: IsolationLevel) -> String {
    format!("{} ISOLATION LEVEL {}", scope.prefix(), level)
}

pub(crate) fn mutability_sql(scope: Scope, mutability: Mutability) -> String {
    format!("{} {}", scope.prefix(), mutability)
}
