//! An embedded, in-memory [`DatabaseClient`].
//!
//! Good enough to run everything the mapper generates: single-table
//! `INSERT ... VALUES [RETURNING]`, `UPDATE`, `DELETE` and `SELECT` with
//! `WHERE`, `ORDER BY` and `LIMIT`. Placeholders may be `?` or `$n`.
//! Tables are declared with [`TableDef`] instead of DDL.
//!
//! A transaction works on a private copy of every table. Commit publishes
//! the copy wholesale; rollback or drop discards it.

mod eval;
mod parser;
mod storage;

pub use storage::TableDef;

use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use crate::connection::{DatabaseClient, TransactionClient};
use crate::core::{DbError, Result, Value};
use crate::result::{ExecResult, QueryResult};

use storage::{Outcome, Store};

#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    store: Arc<RwLock<Store>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&self, def: TableDef) -> Result<()> {
        self.store.write()?.create_table(def)
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        self.store.write()?.drop_table(name)
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        self.store.read()?.row_count(table)
    }

    /// Every statement executed so far, in order, including the ones run
    /// inside transactions.
    pub fn statement_log(&self) -> Vec<String> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn record(&self, sql: &str) {
        record(&self.log, sql);
    }

    fn run(&self, sql: &str, args: &[Value]) -> Result<Outcome> {
        self.record(sql);
        let stmt = parser::parse(sql)?;
        if let parser::Statement::Select { .. } = stmt {
            return self.store.read()?.select(&stmt, args);
        }
        self.store.write()?.run(&stmt, args)
    }
}

fn record(log: &Mutex<Vec<String>>, sql: &str) {
    log.lock().unwrap_or_else(|e| e.into_inner()).push(sql.to_string());
}

#[async_trait]
impl DatabaseClient for MemoryClient {
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        Ok(self.run(sql, args)?.exec)
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<QueryResult> {
        Ok(self.run(sql, args)?.rows)
    }

    async fn ping(&self) -> Result<()> {
        self.store.read().map(|_| ()).map_err(DbError::from)
    }

    async fn begin(&self) -> Result<Box<dyn TransactionClient>> {
        self.record("begin;");
        let work = self.store.read()?.clone();
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.store),
            work: Mutex::new(work),
            log: Arc::clone(&self.log),
        }))
    }
}

/// Transaction over a working copy of a [`MemoryClient`]'s tables.
#[derive(Debug)]
pub struct MemoryTransaction {
    shared: Arc<RwLock<Store>>,
    work: Mutex<Store>,
    log: Arc<Mutex<Vec<String>>>,
}

impl MemoryTransaction {
    fn run(&self, sql: &str, args: &[Value]) -> Result<Outcome> {
        record(&self.log, sql);
        let stmt = parser::parse(sql)?;
        self.work.lock()?.run(&stmt, args)
    }
}

#[async_trait]
impl TransactionClient for MemoryTransaction {
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        Ok(self.run(sql, args)?.exec)
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<QueryResult> {
        Ok(self.run(sql, args)?.rows)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        record(&self.log, "commit;");
        let work = self.work.into_inner()?;
        *self.shared.write()? = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        record(&self.log, "rollback;");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MemoryClient {
        let client = MemoryClient::new();
        client
            .create_table(TableDef::new("people").auto_increment("id").column("name"))
            .unwrap();
        client
    }

    #[tokio::test]
    async fn test_execute_and_query() {
        let client = client();
        let res = client
            .execute("insert into people (id, name) values (null, ?)", &["Ada".into()])
            .await
            .unwrap();
        assert_eq!(res.rows_affected, 1);
        assert_eq!(res.last_insert_id, Some(1));

        let rows = client.query("select * from people", &[]).await.unwrap();
        assert_eq!(rows.columns(), &["id".to_string(), "name".to_string()]);
        assert_eq!(rows.row_count(), 1);
    }

    #[tokio::test]
    async fn test_commit_publishes_work() {
        let client = client();
        let tx = client.begin().await.unwrap();
        tx.execute("insert into people (name) values ('Ada')", &[]).await.unwrap();
        assert_eq!(client.row_count("people").unwrap(), 0);

        tx.commit().await.unwrap();
        assert_eq!(client.row_count("people").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rollback_and_drop_discard_work() {
        let client = client();

        let tx = client.begin().await.unwrap();
        tx.execute("insert into people (name) values ('Ada')", &[]).await.unwrap();
        tx.rollback().await.unwrap();

        let tx = client.begin().await.unwrap();
        tx.execute("insert into people (name) values ('Bob')", &[]).await.unwrap();
        drop(tx);

        assert_eq!(client.row_count("people").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_statement_log() {
        let client = client();
        client.query("select name from people", &[]).await.unwrap();
        assert!(client.execute("select nonsense from", &[]).await.is_err());

        let log = client.statement_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], "select name from people");

        client.clear_log();
        assert!(client.statement_log().is_empty());
    }

    #[tokio::test]
    async fn test_drop_table() {
        let client = client();
        client.drop_table("PEOPLE").unwrap();
        assert!(matches!(
            client.query("select * from people", &[]).await,
            Err(DbError::TableNotFound(_))
        ));
        assert!(client.drop_table("people").is_err());
    }

    #[tokio::test]
    async fn test_ping() {
        assert!(MemoryClient::new().ping().await.is_ok());
    }
}
