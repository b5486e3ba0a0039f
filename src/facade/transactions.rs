use std::fmt;

use async_trait::async_trait;

use crate::connection::TransactionClient;
use crate::core::{Result, Value};
use crate::executor::{self, SqlExecutor};
use crate::record::{Record, RecordShape};
use crate::result::{ExecResult, QueryResult};

use super::DbMap;

/// An open transaction, obtained from [`DbMap::begin`].
///
/// Runs the same operations as the [`DbMap`] it came from, against the
/// driver's transaction. Hooks invoked inside it receive the transaction as
/// their executor. Dropping it without [`commit`](Self::commit) leaves the
/// rollback to the driver.
pub struct Transaction<'a> {
    map: &'a DbMap,
    tx: Box<dyn TransactionClient>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(map: &'a DbMap, tx: Box<dyn TransactionClient>) -> Self {
        Self { map, tx }
    }

    pub fn dbmap(&self) -> &'a DbMap {
        self.map
    }

    pub async fn commit(self) -> Result<()> {
        self.map.trace_statement("commit;", &[]);
        self.tx.commit().await
    }

    pub async fn rollback(self) -> Result<()> {
        self.map.trace_statement("rollback;", &[]);
        self.tx.rollback().await
    }
}

#[async_trait]
impl SqlExecutor for Transaction<'_> {
    async fn get(&self, dest: &mut dyn Record, keys: &[Value]) -> Result<bool> {
        executor::get(&self.map.context(self), dest, keys).await
    }

    async fn insert(&self, records: &mut [&mut dyn Record]) -> Result<()> {
        executor::insert(&self.map.context(self), records).await
    }

    async fn update(&self, records: &mut [&mut dyn Record]) -> Result<u64> {
        executor::update(&self.map.context(self), records).await
    }

    async fn delete(&self, records: &mut [&mut dyn Record]) -> Result<u64> {
        executor::delete(&self.map.context(self), records).await
    }

    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        self.map.trace_statement(sql, args);
        self.tx.execute(sql, args).await
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<QueryResult> {
        self.map.trace_statement(sql, args);
        self.tx.query(sql, args).await
    }

    async fn select_records(
        &self,
        shape: &RecordShape,
        sql: &str,
        args: &[Value],
    ) -> Result<Vec<Box<dyn Record>>> {
        executor::select(&self.map.context(self), shape, sql, args).await
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction").field("map", self.map).finish()
    }
}
