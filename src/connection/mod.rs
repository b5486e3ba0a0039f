//! Driver boundary.
//!
//! The mapper never talks to a database directly. It hands finished SQL and
//! positional arguments to a [`DatabaseClient`], or to the
//! [`TransactionClient`] of an open transaction, and interprets what comes
//! back. [`MemoryClient`](crate::memory::MemoryClient) is the bundled
//! implementation.

pub mod config;

pub use config::MapperConfig;

use async_trait::async_trait;

use crate::core::{Result, Value};
use crate::result::{ExecResult, QueryResult};

/// A connection (or pool) able to run statements outside a transaction.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Runs a statement that returns no rows.
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult>;

    /// Runs a statement and materialises every row it returns.
    async fn query(&self, sql: &str, args: &[Value]) -> Result<QueryResult>;

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    /// Opens a transaction. Nothing is committed unless
    /// [`TransactionClient::commit`] is called.
    async fn begin(&self) -> Result<Box<dyn TransactionClient>>;
}

/// An open transaction on the driver side.
#[async_trait]
pub trait TransactionClient: Send + Sync {
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult>;

    async fn query(&self, sql: &str, args: &[Value]) -> Result<QueryResult>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
