use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::connection::{DatabaseClient, MapperConfig};
use crate::core::{DbError, Result, Value};
use crate::dialect::Dialect;
use crate::executor::{self, ExecutionContext, SqlExecutor};
use crate::mapping::{TableMapping, TableRegistry};
use crate::record::{Entity, Record, RecordShape};
use crate::result::{ExecResult, QueryResult};

use super::Transaction;

/// Entry point of the mapper: a driver client, a dialect and the registered
/// table mappings.
///
/// Tables are registered through `&mut DbMap` up front; every operation
/// afterwards only needs `&DbMap`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rustmapper::{DbMap, DialectKind, Record, SqlExecutor};
/// use rustmapper::memory::{MemoryClient, TableDef};
///
/// #[derive(Debug, Default, Record)]
/// struct Person {
///     id: i64,
///     name: String,
///     version: i64,
/// }
///
/// # tokio_test::block_on(async {
/// let client = MemoryClient::new();
/// client.create_table(TableDef::new("people").auto_increment("id").columns(["name", "version"]))?;
///
/// let mut dbmap = DbMap::new(Arc::new(client), DialectKind::Sqlite);
/// dbmap.add_table_with_name::<Person>("people").set_keys(true, &["id"])?.set_version_col("version")?;
///
/// let mut person = Person { name: "Ada".into(), ..Default::default() };
/// dbmap.insert(&mut [&mut person]).await?;
/// assert_eq!((person.id, person.version), (1, 1));
/// # Ok::<(), rustmapper::DbError>(())
/// # }).unwrap();
/// ```
pub struct DbMap {
    client: Arc<dyn DatabaseClient>,
    dialect: Arc<dyn Dialect>,
    registry: TableRegistry,
    config: MapperConfig,
}

impl DbMap {
    pub fn new(client: Arc<dyn DatabaseClient>, dialect: crate::dialect::DialectKind) -> Self {
        Self::with_config(client, MapperConfig::new(dialect))
    }

    pub fn with_config(client: Arc<dyn DatabaseClient>, config: MapperConfig) -> Self {
        Self {
            client,
            dialect: config.dialect.build(),
            registry: TableRegistry::new(),
            config,
        }
    }

    /// Uses a dialect that is not one of the bundled ones.
    pub fn with_dialect(
        client: Arc<dyn DatabaseClient>,
        dialect: Arc<dyn Dialect>,
        config: MapperConfig,
    ) -> Self {
        Self {
            client,
            dialect,
            registry: TableRegistry::new(),
            config,
        }
    }

    /// Registers `T` under its type name.
    pub fn add_table<T: Entity>(&mut self) -> &mut TableMapping {
        self.registry.add::<T>(T::type_name())
    }

    pub fn add_table_with_name<T: Entity>(&mut self, table_name: &str) -> &mut TableMapping {
        self.registry.add::<T>(table_name)
    }

    pub fn table<T: Entity>(&self) -> Result<&TableMapping> {
        self.registry
            .table_for(TypeId::of::<T>(), T::type_name(), false)
    }

    pub fn table_mut<T: Entity>(&mut self) -> Result<&mut TableMapping> {
        self.registry
            .get_mut(TypeId::of::<T>())
            .ok_or_else(|| DbError::UnmappedType(T::type_name().to_string()))
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub fn dialect(&self) -> &dyn Dialect {
        &*self.dialect
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<dyn DatabaseClient> {
        &self.client
    }

    /// Logs every statement at debug level, prefixed with `prefix`.
    pub fn trace_on(&mut self, prefix: &str) {
        self.config.trace_statements = true;
        self.config.log_prefix = prefix.to_string();
    }

    pub fn trace_off(&mut self) {
        self.config.trace_statements = false;
    }

    /// Drops every cached statement plan.
    pub fn reset_sql(&mut self) {
        for table in self.registry.iter_mut() {
            table.reset_sql();
        }
    }

    /// Opens a transaction. It is rolled back unless committed.
    pub async fn begin(&self) -> Result<Transaction<'_>> {
        let tx = self.client.begin().await?;
        Ok(Transaction::new(self, tx))
    }

    pub(crate) fn context<'a>(&'a self, exec: &'a dyn SqlExecutor) -> ExecutionContext<'a> {
        ExecutionContext::new(&self.registry, &*self.dialect, exec)
    }

    pub(crate) fn trace_statement(&self, sql: &str, args: &[Value]) {
        if self.config.trace_statements {
            debug!(
                target: "rustmapper::sql",
                "{} {} {:?}",
                self.config.log_prefix,
                sql,
                args
            );
        }
    }
}

#[async_trait]
impl SqlExecutor for DbMap {
    async fn get(&self, dest: &mut dyn Record, keys: &[Value]) -> Result<bool> {
        executor::get(&self.context(self), dest, keys).await
    }

    async fn insert(&self, records: &mut [&mut dyn Record]) -> Result<()> {
        executor::insert(&self.context(self), records).await
    }

    async fn update(&self, records: &mut [&mut dyn Record]) -> Result<u64> {
        executor::update(&self.context(self), records).await
    }

    async fn delete(&self, records: &mut [&mut dyn Record]) -> Result<u64> {
        executor::delete(&self.context(self), records).await
    }

    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        self.trace_statement(sql, args);
        self.client.execute(sql, args).await
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<QueryResult> {
        self.trace_statement(sql, args);
        self.client.query(sql, args).await
    }

    async fn select_records(
        &self,
        shape: &RecordShape,
        sql: &str,
        args: &[Value],
    ) -> Result<Vec<Box<dyn Record>>> {
        executor::select(&self.context(self), shape, sql, args).await
    }
}

impl fmt::Debug for DbMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbMap")
            .field("dialect", &self.dialect.name())
            .field("tables", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}
