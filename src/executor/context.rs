use crate::core::{DbError, Result, Row, Value};
use crate::dialect::Dialect;
use crate::mapping::{TableMapping, TableRegistry};
use crate::record::{HookSet, Record};

use super::SqlExecutor;

/// Everything one engine call needs: the mappings, the dialect, and the
/// executor statements (and hooks) run against.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub registry: &'a TableRegistry,
    pub dialect: &'a dyn Dialect,
    pub exec: &'a dyn SqlExecutor,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        registry: &'a TableRegistry,
        dialect: &'a dyn Dialect,
        exec: &'a dyn SqlExecutor,
    ) -> Self {
        Self {
            registry,
            dialect,
            exec,
        }
    }

    pub fn table_for(&self, record: &dyn Record, check_pk: bool) -> Result<&'a TableMapping> {
        self.registry
            .table_for(record.type_key(), record.record_type_name(), check_pk)
    }

    /// Runs `hook` on `record` if its type declared it.
    pub async fn run_hook(
        &self,
        declared: HookSet,
        hook: HookSet,
        record: &mut dyn Record,
    ) -> Result<()> {
        if !declared.contains(hook) {
            return Ok(());
        }

        match hook {
            HookSet::PRE_INSERT => record.pre_insert(self.exec).await,
            HookSet::POST_INSERT => record.post_insert(self.exec).await,
            HookSet::PRE_UPDATE => record.pre_update(self.exec).await,
            HookSet::POST_UPDATE => record.post_update(self.exec).await,
            HookSet::PRE_DELETE => record.pre_delete(self.exec).await,
            HookSet::POST_DELETE => record.post_delete(self.exec).await,
            HookSet::POST_GET => record.post_get(self.exec).await,
            other => Err(DbError::Hook(format!("not a single hook: {:?}", other))),
        }
    }

    /// Runs the table's get plan and returns the first row, if any.
    pub async fn fetch_by_keys(&self, table: &TableMapping, keys: &[Value]) -> Result<Option<Row>> {
        if keys.len() != table.key_count() {
            return Err(DbError::KeyCount {
                table: table.table_name().to_string(),
                expected: table.key_count(),
                actual: keys.len(),
            });
        }

        let plan = table.get_plan(self.dialect);
        let result = self.exec.query(plan.query(), keys).await?;
        Ok(result.into_rows().into_iter().next())
    }
}
