use async_trait::async_trait;

use crate::core::{Result, Value};
use crate::record::{Entity, Record, RecordShape, downcast_record};
use crate::result::{ExecResult, QueryResult};

/// Operations shared by [`DbMap`](crate::DbMap) and
/// [`Transaction`](crate::Transaction).
///
/// Hooks receive the executor that is running them as `&dyn SqlExecutor`,
/// so the same hook code works inside and outside a transaction.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Loads the row with the given primary-key values into `dest`.
    /// Returns `false`, leaving `dest` untouched, when there is no such row.
    async fn get(&self, dest: &mut dyn Record, keys: &[Value]) -> Result<bool>;

    /// Inserts each record in turn, stopping at the first error.
    async fn insert(&self, records: &mut [&mut dyn Record]) -> Result<()>;

    /// Updates each record by primary key and returns the total row count.
    async fn update(&self, records: &mut [&mut dyn Record]) -> Result<u64>;

    /// Deletes each record by primary key and returns the total row count.
    async fn delete(&self, records: &mut [&mut dyn Record]) -> Result<u64>;

    /// Runs raw SQL that returns no rows.
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult>;

    /// Runs raw SQL and returns its rows as values.
    async fn query(&self, sql: &str, args: &[Value]) -> Result<QueryResult>;

    /// Runs raw SQL and scans every row into a fresh record of `shape`.
    async fn select_records(
        &self,
        shape: &RecordShape,
        sql: &str,
        args: &[Value],
    ) -> Result<Vec<Box<dyn Record>>>;
}

/// Typed conveniences on top of [`SqlExecutor`].
#[async_trait]
pub trait SqlExecutorExt: SqlExecutor {
    async fn get_one<T: Entity>(&self, keys: &[Value]) -> Result<Option<T>> {
        let mut dest = T::default();
        if self.get(&mut dest, keys).await? {
            Ok(Some(dest))
        } else {
            Ok(None)
        }
    }

    /// Returns every row of `sql` as a `T`.
    async fn select<T: Entity>(&self, sql: &str, args: &[Value]) -> Result<Vec<T>> {
        let records = self.select_records(&T::shape(), sql, args).await?;
        records.into_iter().map(downcast_record::<T>).collect()
    }

    /// Appends every row of `sql` to `dest`. `dest` is left as it was when
    /// nothing matches.
    async fn select_into<T: Entity>(&self, dest: &mut Vec<T>, sql: &str, args: &[Value]) -> Result<()> {
        let rows = self.select::<T>(sql, args).await?;
        dest.extend(rows);
        Ok(())
    }
}

impl<E: SqlExecutor + ?Sized> SqlExecutorExt for E {}
