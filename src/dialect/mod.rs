//! SQL syntax strategies.
//!
//! The planner never writes quoting or placeholder syntax itself; it asks the
//! active [`Dialect`]. Three dialects ship with the crate.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{DbError, Result, Value};
use crate::executor::SqlExecutor;
use crate::mapping::ColumnMapping;

#[async_trait]
pub trait Dialect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Quotes a table or column identifier.
    fn quote_identifier(&self, name: &str) -> String;

    /// Placeholder for the bind argument at zero-based `index`.
    fn bind_placeholder(&self, index: usize) -> String;

    /// Value written in place of an auto-increment column on insert.
    fn auto_increment_placeholder(&self) -> &'static str;

    /// Text appended to an insert whose table has an auto-increment column.
    fn auto_increment_insert_suffix(&self, column: &ColumnMapping) -> String;

    /// Runs an insert and returns the id the database generated for it.
    async fn insert_returning_id(
        &self,
        exec: &dyn SqlExecutor,
        sql: &str,
        args: &[Value],
    ) -> Result<i64>;
}

/// Dialects selectable by name, e.g. from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Sqlite,
    Postgres,
    MySql,
}

impl DialectKind {
    pub fn build(self) -> Arc<dyn Dialect> {
        match self {
            Self::Sqlite => Arc::new(SqliteDialect),
            Self::Postgres => Arc::new(PostgresDialect),
            Self::MySql => Arc::new(MySqlDialect),
        }
    }
}

impl FromStr for DialectKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            other => Err(DbError::Config(format!("unknown dialect '{}'", other))),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Postgres => write!(f, "postgres"),
            Self::MySql => write!(f, "mysql"),
        }
    }
}

/// Shared by the dialects whose drivers report the generated id on the
/// execution result.
async fn last_insert_id(exec: &dyn SqlExecutor, sql: &str, args: &[Value]) -> Result<i64> {
    let res = exec.exec(sql, args).await?;
    res.last_insert_id.ok_or_else(|| {
        DbError::Driver(format!("driver reported no generated id for: {}", sql))
    })
}
