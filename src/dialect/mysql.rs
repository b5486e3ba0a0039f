use async_trait::async_trait;

use super::{Dialect, last_insert_id};
use crate::core::{Result, Value};
use crate::executor::SqlExecutor;
use crate::mapping::ColumnMapping;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

#[async_trait]
impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name)
    }

    fn bind_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn auto_increment_placeholder(&self) -> &'static str {
        "null"
    }

    fn auto_increment_insert_suffix(&self, _column: &ColumnMapping) -> String {
        String::new()
    }

    async fn insert_returning_id(
        &self,
        exec: &dyn SqlExecutor,
        sql: &str,
        args: &[Value],
    ) -> Result<i64> {
        last_insert_id(exec, sql, args).await
    }
}
