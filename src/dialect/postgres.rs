use async_trait::async_trait;

use super::Dialect;
use crate::core::{DbError, Result, Value};
use crate::executor::SqlExecutor;
use crate::mapping::ColumnMapping;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

#[async_trait]
impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name)
    }

    fn bind_placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn auto_increment_placeholder(&self) -> &'static str {
        "default"
    }

    fn auto_increment_insert_suffix(&self, column: &ColumnMapping) -> String {
        format!(" returning {}", self.quote_identifier(column.column_name()))
    }

    async fn insert_returning_id(
        &self,
        exec: &dyn SqlExecutor,
        sql: &str,
        args: &[Value],
    ) -> Result<i64> {
        // the statement carries a RETURNING clause, so it has to go through query
        let result = exec.query(sql, args).await?;
        match result.scalar() {
            Some(value) => value.as_i64().ok_or_else(|| {
                DbError::TypeMismatch(format!(
                    "generated id '{}' is not an integer (query: {})",
                    value, sql
                ))
            }),
            None => Err(DbError::Driver(format!(
                "insert returned no generated id (query: {})",
                sql
            ))),
        }
    }
}
